pub mod food;
pub mod meal;
pub mod solution;

pub use food::Food;
pub use meal::{
    CalorieTarget, ConstraintMode, Ingredient, Macro, MacroConstraint, MacroRatio, MacroTotals,
    Priority,
};
pub use solution::{
    Coverage, Infeasibility, IngredientResult, MicroResult, Solution, SolveStatus, TierValue,
};

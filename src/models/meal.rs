use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Food;
use crate::planner::constants::{KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};

/// Macronutrients that can be constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Macro {
    Carbs,
    Protein,
    Fat,
    Fiber,
}

impl Macro {
    pub const ALL: [Macro; 4] = [Macro::Carbs, Macro::Protein, Macro::Fat, Macro::Fiber];

    /// Macros that carry energy and take part in the calorie ratio.
    pub const ENERGY: [Macro; 3] = [Macro::Carbs, Macro::Protein, Macro::Fat];

    /// Atwater energy factor, `None` for fiber.
    pub fn kcal_per_gram(self) -> Option<f64> {
        match self {
            Macro::Carbs => Some(KCAL_PER_G_CARBS),
            Macro::Protein => Some(KCAL_PER_G_PROTEIN),
            Macro::Fat => Some(KCAL_PER_G_FAT),
            Macro::Fiber => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Macro::Carbs => "carbs",
            Macro::Protein => "protein",
            Macro::Fat => "fat",
            Macro::Fiber => "fiber",
        }
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A food with the portion range the solver may choose from.
#[derive(Debug, Clone)]
pub struct Ingredient {
    pub food: Food,
    pub min_grams: f64,
    pub max_grams: f64,
    pub enabled: bool,
}

impl Ingredient {
    pub fn new(food: Food, min_grams: f64, max_grams: f64) -> Self {
        Self {
            food,
            min_grams,
            max_grams,
            enabled: true,
        }
    }
}

/// Calorie target with a symmetric absolute tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalorieTarget {
    pub target: f64,
    pub tolerance: f64,
}

impl CalorieTarget {
    pub fn lower(&self) -> f64 {
        self.target - self.tolerance
    }

    pub fn upper(&self) -> f64 {
        self.target + self.tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMode {
    AtLeast,
    AtMost,
    Exactly,
    Unconstrained,
}

/// Per-macro gram constraint. Loose (`hard == false`) constraints only shape the objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroConstraint {
    pub nutrient: Macro,
    pub mode: ConstraintMode,
    pub grams: f64,
    #[serde(default)]
    pub hard: bool,
}

impl MacroConstraint {
    pub fn is_active(&self) -> bool {
        self.mode != ConstraintMode::Unconstrained
    }

    /// True for a hard `exactly`, which leaves the macro no freedom.
    pub fn locks_macro(&self) -> bool {
        self.hard && self.mode == ConstraintMode::Exactly
    }
}

/// Macro gram amounts, used both for pinned intake and for solved totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
}

impl MacroTotals {
    pub fn get(&self, m: Macro) -> f64 {
        match m {
            Macro::Carbs => self.carbs,
            Macro::Protein => self.protein,
            Macro::Fat => self.fat,
            Macro::Fiber => self.fiber,
        }
    }

    /// Contribution of `grams` of `food`.
    pub fn of_food(food: &Food, grams: f64) -> Self {
        let factor = grams / 100.0;
        Self {
            calories: food.calories * factor,
            protein: food.protein * factor,
            fat: food.fat * factor,
            carbs: food.carbs * factor,
            fiber: food.fiber * factor,
        }
    }
}

impl std::ops::AddAssign for MacroTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.fat += rhs.fat;
        self.carbs += rhs.carbs;
        self.fiber += rhs.fiber;
    }
}

/// Target share of calories per energy macro, in percent.
///
/// The three shares are expected to sum to 100 but this is not enforced;
/// a mismatch only makes the achievable deviation larger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroRatio {
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    /// Grams already eaten outside the optimized portion.
    #[serde(default)]
    pub pinned: MacroTotals,
}

impl MacroRatio {
    pub fn percent(&self, m: Macro) -> f64 {
        match m {
            Macro::Carbs => self.carbs,
            Macro::Protein => self.protein,
            Macro::Fat => self.fat,
            Macro::Fiber => 0.0,
        }
    }
}

/// Optimization tiers, most significant first when listed in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Micronutrients,
    MacroRatio,
    Diversity,
    TotalMass,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Micronutrients => "micronutrients",
            Priority::MacroRatio => "macro ratio",
            Priority::Diversity => "diversity",
            Priority::TotalMass => "total mass",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiber_has_no_energy_factor() {
        assert_eq!(Macro::Fiber.kcal_per_gram(), None);
        assert_eq!(Macro::Fat.kcal_per_gram(), Some(9.0));
        assert!(!Macro::ENERGY.contains(&Macro::Fiber));
    }

    #[test]
    fn test_unconstrained_is_inactive() {
        let c = MacroConstraint {
            nutrient: Macro::Protein,
            mode: ConstraintMode::Unconstrained,
            grams: 50.0,
            hard: true,
        };
        assert!(!c.is_active());
        assert!(!c.locks_macro());
    }

    #[test]
    fn test_priority_deserializes_snake_case() {
        let p: Vec<Priority> =
            serde_json::from_str(r#"["macro_ratio", "total_mass", "micronutrients"]"#).unwrap();
        assert_eq!(
            p,
            vec![Priority::MacroRatio, Priority::TotalMass, Priority::Micronutrients]
        );
    }
}

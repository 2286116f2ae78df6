//! Hard rows and the arithmetic pre-check that runs before any model is built.

use crate::models::{ConstraintMode, Food, Infeasibility, Ingredient, Macro};
use crate::planner::program::{Cmp, LinearExpr, Program, RowRole, VarId, VarKind};
use crate::planner::request::MealProblem;
use crate::planner::scaling::ScalingPolicy;

/// Float slack on top of the regime epsilon when comparing achievable ranges.
const RANGE_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct GramVar {
    /// Position in `MealProblem::ingredients`.
    pub ingredient: usize,
    pub var: VarId,
}

/// Decision variables of the enabled ingredients.
#[derive(Debug, Clone, Default)]
pub struct GramVars {
    vars: Vec<GramVar>,
}

impl GramVars {
    pub fn iter(&self) -> impl Iterator<Item = &GramVar> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `Σ per_gram(food)·grams` over the enabled ingredients.
    pub fn weighted<F>(&self, ingredients: &[Ingredient], per_gram: F) -> LinearExpr
    where
        F: Fn(&Food) -> f64,
    {
        self.vars.iter().fold(LinearExpr::new(), |expr, gv| {
            expr.with_term(gv.var, per_gram(&ingredients[gv.ingredient].food))
        })
    }

    pub fn calories(&self, ingredients: &[Ingredient]) -> LinearExpr {
        self.weighted(ingredients, Food::calories_per_gram)
    }

    pub fn macro_grams(&self, ingredients: &[Ingredient], m: Macro) -> LinearExpr {
        self.weighted(ingredients, |f| f.macro_per_gram(m))
    }

    pub fn micro_amount(&self, ingredients: &[Ingredient], key: &str) -> LinearExpr {
        self.weighted(ingredients, |f| f.micro_per_gram(key))
    }

    pub fn total_grams(&self) -> LinearExpr {
        self.vars
            .iter()
            .fold(LinearExpr::new(), |expr, gv| expr.with_term(gv.var, 1.0))
    }
}

/// Adds the gram variables and every row that must hold in a returned solution.
pub fn build_hard_constraints(program: &mut Program, problem: &MealProblem) -> GramVars {
    let vars = problem
        .enabled_ingredients()
        .map(|(idx, ing)| GramVar {
            ingredient: idx,
            var: program.add_var(
                format!("grams[{}]", ing.food.id),
                ing.min_grams,
                ing.max_grams,
                VarKind::Grams,
            ),
        })
        .collect();
    let grams = GramVars { vars };
    let ingredients = &problem.ingredients;

    let calories = grams.calories(ingredients);
    program.require(
        "calories >= target - tolerance",
        calories.clone(),
        Cmp::Ge,
        problem.calories.lower(),
        RowRole::Hard,
    );
    program.require(
        "calories <= target + tolerance",
        calories,
        Cmp::Le,
        problem.calories.upper(),
        RowRole::Hard,
    );

    for c in problem.macro_constraints.iter().filter(|c| c.hard) {
        let expr = grams.macro_grams(ingredients, c.nutrient);
        let cmps: &[Cmp] = match c.mode {
            ConstraintMode::AtLeast => &[Cmp::Ge],
            ConstraintMode::AtMost => &[Cmp::Le],
            ConstraintMode::Exactly => &[Cmp::Ge, Cmp::Le],
            ConstraintMode::Unconstrained => &[],
        };
        for &cmp in cmps {
            program.require(
                format!("{} {} {}", c.nutrient, cmp, c.grams),
                expr.clone(),
                cmp,
                c.grams,
                RowRole::Hard,
            );
        }
    }

    for (key, limit) in &problem.micro_limits {
        program.require(
            format!("{} <= {}", key, limit),
            grams.micro_amount(ingredients, key),
            Cmp::Le,
            *limit,
            RowRole::Hard,
        );
    }

    grams
}

/// Finds requests that cannot be satisfied from the ingredient bounds alone.
///
/// Each check looks at one constraint in isolation, so passing does not
/// guarantee joint feasibility; the solver settles that.
pub fn precheck(problem: &MealProblem, policy: &ScalingPolicy) -> Option<Infeasibility> {
    let enabled: Vec<&Ingredient> = problem.enabled_ingredients().map(|(_, i)| i).collect();
    if enabled.is_empty() {
        return Some(Infeasibility::NoIngredients);
    }

    let mut bounds = Vec::with_capacity(enabled.len());
    for ing in &enabled {
        let (lo, hi) = policy.grams_bounds(ing.min_grams, ing.max_grams);
        if lo > hi {
            return Some(Infeasibility::IngredientBounds {
                food: ing.food.id.clone(),
                min_grams: ing.min_grams,
                max_grams: ing.max_grams,
            });
        }
        bounds.push((&ing.food, lo, hi));
    }

    let achievable = |per_gram: &dyn Fn(&Food) -> f64| {
        bounds.iter().fold((0.0, 0.0), |(amin, amax), (food, lo, hi)| {
            let c = per_gram(*food);
            (amin + c * lo, amax + c * hi)
        })
    };
    let eps = policy.hard_epsilon() + RANGE_SLACK;

    let (cal_min, cal_max) = achievable(&Food::calories_per_gram);
    if cal_max < problem.calories.lower() - eps || cal_min > problem.calories.upper() + eps {
        return Some(Infeasibility::CalorieBudget {
            lower: problem.calories.lower(),
            upper: problem.calories.upper(),
            achievable_min: cal_min,
            achievable_max: cal_max,
        });
    }

    for c in problem.macro_constraints.iter().filter(|c| c.hard) {
        let (amin, amax) = achievable(&|f: &Food| f.macro_per_gram(c.nutrient));
        let too_low = amax < c.grams - eps;
        let too_high = amin > c.grams + eps;
        let unreachable = match c.mode {
            ConstraintMode::AtLeast => too_low,
            ConstraintMode::AtMost => too_high,
            ConstraintMode::Exactly => too_low || too_high,
            ConstraintMode::Unconstrained => false,
        };
        if unreachable {
            return Some(Infeasibility::MacroBudget {
                nutrient: c.nutrient,
                mode: c.mode,
                grams: c.grams,
                achievable_min: amin,
                achievable_max: amax,
            });
        }
    }

    for (key, limit) in &problem.micro_limits {
        let (amin, _) = achievable(&|f: &Food| f.micro_per_gram(key));
        if amin > limit + eps {
            return Some(Infeasibility::MicroLimit {
                key: key.clone(),
                limit: *limit,
                achievable_min: amin,
            });
        }
    }

    None
}

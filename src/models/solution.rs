use serde::{Deserialize, Serialize};

use crate::models::meal::{ConstraintMode, Macro, MacroTotals, Priority};
use crate::planner::config::Regime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal for the composed objective.
    Optimal,
    /// Best incumbent at the time budget; constraints hold, optimality unproven.
    Feasible,
    Infeasible,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Why a request could not be satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Infeasibility {
    NoIngredients,
    IngredientBounds {
        food: String,
        min_grams: f64,
        max_grams: f64,
    },
    CalorieBudget {
        lower: f64,
        upper: f64,
        achievable_min: f64,
        achievable_max: f64,
    },
    MacroBudget {
        nutrient: Macro,
        mode: ConstraintMode,
        grams: f64,
        achievable_min: f64,
        achievable_max: f64,
    },
    MicroLimit {
        key: String,
        limit: f64,
        achievable_min: f64,
    },
    /// The solver proved the hard constraints jointly unsatisfiable.
    Solver,
    TimedOut {
        budget_ms: u64,
    },
}

impl Infeasibility {
    /// One-line explanation for display.
    pub fn describe(&self) -> String {
        match self {
            Infeasibility::NoIngredients => "no enabled ingredients".to_string(),
            Infeasibility::IngredientBounds {
                food,
                min_grams,
                max_grams,
            } => format!("{}: min {:.0} g exceeds max {:.0} g", food, min_grams, max_grams),
            Infeasibility::CalorieBudget {
                lower,
                upper,
                achievable_min,
                achievable_max,
            } => format!(
                "calorie band {:.0}-{:.0} kcal unreachable (ingredients allow {:.0}-{:.0} kcal)",
                lower, upper, achievable_min, achievable_max
            ),
            Infeasibility::MacroBudget {
                nutrient,
                mode,
                grams,
                achievable_min,
                achievable_max,
            } => format!(
                "{} {:?} {:.1} g unreachable (ingredients allow {:.1}-{:.1} g)",
                nutrient, mode, grams, achievable_min, achievable_max
            ),
            Infeasibility::MicroLimit {
                key,
                limit,
                achievable_min,
            } => format!(
                "{} limit {:.2} is below the minimum achievable {:.2}",
                key, limit, achievable_min
            ),
            Infeasibility::Solver => "hard constraints are jointly unsatisfiable".to_string(),
            Infeasibility::TimedOut { budget_ms } => {
                format!("no solution found within {} ms", budget_ms)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientResult {
    pub food_id: String,
    pub name: String,
    pub grams: f64,
    pub macros: MacroTotals,
}

/// Severity band for a micronutrient, relative to its reference values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Below the estimated average requirement.
    Deficient,
    /// Below the reference target.
    Low,
    Met,
    /// Above the tolerable upper intake level.
    OverLimit,
    /// No reference target for this demographic.
    Untargeted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroResult {
    pub key: String,
    /// Amount contributed by the solved portions.
    pub total: f64,
    /// Amount consumed outside the optimized portion.
    pub pinned: f64,
    pub target: Option<f64>,
    pub remaining: Option<f64>,
    pub percent_of_target: Option<f64>,
    pub optimized: bool,
    pub coverage: Coverage,
}

/// Achieved value of one objective tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierValue {
    pub priority: Priority,
    pub value: f64,
    pub max_value: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolveStatus,
    pub regime: Regime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infeasibility: Option<Infeasibility>,
    pub ingredients: Vec<IngredientResult>,
    pub totals: MacroTotals,
    pub micros: Vec<MicroResult>,
    pub tiers: Vec<TierValue>,
    pub solve_millis: u64,
}

impl Solution {
    pub fn grams_of(&self, food_id: &str) -> Option<f64> {
        self.ingredients
            .iter()
            .find(|i| i.food_id.eq_ignore_ascii_case(food_id))
            .map(|i| i.grams)
    }

    pub fn micro(&self, key: &str) -> Option<&MicroResult> {
        self.micros.iter().find(|m| m.key == key)
    }

    pub fn tier(&self, priority: Priority) -> Option<&TierValue> {
        self.tiers.iter().find(|t| t.priority == priority)
    }

    pub fn max_ingredient_grams(&self) -> f64 {
        self.ingredients.iter().map(|i| i.grams).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasibility_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Infeasibility::TimedOut { budget_ms: 250 }).unwrap();
        assert_eq!(json, r#"{"kind":"timed_out","budget_ms":250}"#);
    }

    #[test]
    fn test_describe_calorie_budget() {
        let reason = Infeasibility::CalorieBudget {
            lower: 490.0,
            upper: 510.0,
            achievable_min: 34.0,
            achievable_max: 115.0,
        };
        assert_eq!(
            reason.describe(),
            "calorie band 490-510 kcal unreachable (ingredients allow 34-115 kcal)"
        );
    }
}

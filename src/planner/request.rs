//! Caller-facing request and the fully resolved problem the model is built from.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{closest_match, Demographic, FoodCatalog, NutrientReferences, ReferenceTables};
use crate::error::{PlannerError, Result};
use crate::models::{
    CalorieTarget, Ingredient, MacroConstraint, MacroRatio, MacroTotals, Priority,
};
use crate::planner::config::SolverConfig;
use crate::planner::constants::MIN_TARGET;

/// Everything the model builder needs, with foods and reference values resolved.
#[derive(Debug, Clone)]
pub struct MealProblem {
    pub ingredients: Vec<Ingredient>,
    pub calories: CalorieTarget,
    pub macro_constraints: Vec<MacroConstraint>,
    pub macro_ratio: Option<MacroRatio>,
    /// Remaining amount to aim for, net of pinned intake. Only these are optimized.
    pub micro_targets: BTreeMap<String, f64>,
    /// Remaining amount not to exceed, net of pinned intake. Hard caps.
    pub micro_limits: BTreeMap<String, f64>,
    pub priorities: Vec<Priority>,
    pub references: NutrientReferences,
    pub pinned_micros: BTreeMap<String, f64>,
    pub config: SolverConfig,
}

impl MealProblem {
    pub fn new(ingredients: Vec<Ingredient>, calories: CalorieTarget) -> Self {
        Self {
            ingredients,
            calories,
            macro_constraints: Vec::new(),
            macro_ratio: None,
            micro_targets: BTreeMap::new(),
            micro_limits: BTreeMap::new(),
            priorities: default_priorities(),
            references: NutrientReferences::default(),
            pinned_micros: BTreeMap::new(),
            config: SolverConfig::default(),
        }
    }

    pub fn with_macro_constraint(mut self, constraint: MacroConstraint) -> Self {
        self.macro_constraints.push(constraint);
        self
    }

    pub fn with_macro_ratio(mut self, ratio: MacroRatio) -> Self {
        self.macro_ratio = Some(ratio);
        self
    }

    pub fn with_micro_target(mut self, key: &str, amount: f64) -> Self {
        self.micro_targets.insert(key.to_string(), amount);
        self
    }

    pub fn with_micro_limit(mut self, key: &str, amount: f64) -> Self {
        self.micro_limits.insert(key.to_string(), amount);
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<Priority>) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn with_references(mut self, references: NutrientReferences) -> Self {
        self.references = references;
        self
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Ingredients the model sees, with their position in `ingredients`.
    pub fn enabled_ingredients(&self) -> impl Iterator<Item = (usize, &Ingredient)> {
        self.ingredients.iter().enumerate().filter(|(_, i)| i.enabled)
    }

    /// Nutrient keys reported in the solution.
    pub fn tracked_micros(&self) -> BTreeSet<String> {
        let mut keys = self.references.tracked_keys();
        keys.extend(self.micro_targets.keys().cloned());
        keys.extend(self.micro_limits.keys().cloned());
        keys
    }

    /// Rejects inputs no model should be built from.
    ///
    /// Unreachable-but-well-formed inputs are left to the pre-check, which
    /// reports them as infeasible instead of failing.
    pub fn validate(&self) -> Result<()> {
        if !(self.calories.target > 0.0) || !self.calories.target.is_finite() {
            return Err(PlannerError::InvalidInput(format!(
                "calorie target must be positive, got {}",
                self.calories.target
            )));
        }
        if !(self.calories.tolerance >= 0.0) {
            return Err(PlannerError::InvalidInput(format!(
                "calorie tolerance must be non-negative, got {}",
                self.calories.tolerance
            )));
        }

        for ingredient in &self.ingredients {
            let (min, max) = (ingredient.min_grams, ingredient.max_grams);
            if !(min >= 0.0) || !(max >= 0.0) || !max.is_finite() {
                return Err(PlannerError::InvalidInput(format!(
                    "{}: gram bounds must be finite and non-negative ({}..{})",
                    ingredient.food.id, min, max
                )));
            }
        }

        for constraint in self.macro_constraints.iter().filter(|c| c.is_active()) {
            if !(constraint.grams >= 0.0) {
                return Err(PlannerError::InvalidInput(format!(
                    "{} constraint must be non-negative, got {}",
                    constraint.nutrient, constraint.grams
                )));
            }
        }

        if let Some(ratio) = &self.macro_ratio {
            if [ratio.carbs, ratio.protein, ratio.fat]
                .iter()
                .any(|p| !(*p >= 0.0))
            {
                return Err(PlannerError::InvalidInput(
                    "macro ratio percentages must be non-negative".to_string(),
                ));
            }
        }

        let mut known = self.references.tracked_keys();
        for ingredient in &self.ingredients {
            known.extend(ingredient.food.micros.keys().cloned());
        }
        for key in self.micro_targets.keys().chain(self.micro_limits.keys()) {
            if !known.contains(key) {
                return Err(PlannerError::UnknownNutrient {
                    key: key.clone(),
                    suggestion: closest_match(key, &known),
                });
            }
        }
        for (key, amount) in self.micro_targets.iter().chain(self.micro_limits.iter()) {
            if !(*amount >= 0.0) {
                return Err(PlannerError::InvalidInput(format!(
                    "{} amount must be non-negative, got {}",
                    key, amount
                )));
            }
        }

        Ok(())
    }
}

pub fn default_priorities() -> Vec<Priority> {
    vec![
        Priority::Micronutrients,
        Priority::MacroRatio,
        Priority::Diversity,
        Priority::TotalMass,
    ]
}

fn default_enabled() -> bool {
    true
}

/// An ingredient referenced by food id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRequest {
    pub food: String,
    #[serde(default)]
    pub min_grams: f64,
    pub max_grams: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Calorie shares in percent; pinned grams come from [`PinnedIntake`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRequest {
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

/// Intake already consumed outside the meal being solved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PinnedIntake {
    #[serde(default)]
    pub macros: MacroTotals,
    #[serde(default)]
    pub micros: BTreeMap<String, f64>,
}

/// Serializable meal request as accepted by the CLI and the interactive loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRequest {
    pub demographic: Demographic,
    pub ingredients: Vec<IngredientRequest>,
    pub calories: CalorieTarget,
    #[serde(default)]
    pub macro_constraints: Vec<MacroConstraint>,
    #[serde(default)]
    pub macro_ratio: Option<RatioRequest>,
    #[serde(default)]
    pub pinned: PinnedIntake,
    /// Nutrient keys whose shortfall is minimized.
    #[serde(default)]
    pub optimize_micros: Vec<String>,
    /// Treat every UL of the demographic as a hard cap.
    #[serde(default)]
    pub hard_upper_limits: bool,
    /// Per-nutrient daily caps; these replace the reference UL for their key.
    #[serde(default)]
    pub upper_limits: BTreeMap<String, f64>,
    #[serde(default = "default_priorities")]
    pub priorities: Vec<Priority>,
    #[serde(default)]
    pub config: SolverConfig,
}

impl MealRequest {
    /// Look up foods and reference values and compute net targets and limits.
    pub fn resolve(&self, catalog: &FoodCatalog, tables: &ReferenceTables) -> Result<MealProblem> {
        let references = tables.lookup(&self.demographic)?.clone();
        let known = references.tracked_keys();

        let ingredients = self
            .ingredients
            .iter()
            .map(|req| -> Result<Ingredient> {
                let food = catalog.lookup(&req.food)?.clone();
                Ok(Ingredient {
                    food,
                    min_grams: req.min_grams,
                    max_grams: req.max_grams,
                    enabled: req.enabled,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let unknown = |key: &str| PlannerError::UnknownNutrient {
            key: key.to_string(),
            suggestion: closest_match(key, &known),
        };

        let pinned_micros = self
            .pinned
            .micros
            .iter()
            .map(|(key, amount)| -> Result<(String, f64)> {
                let key = key.to_lowercase();
                if !references.knows(&key) {
                    return Err(unknown(&key));
                }
                Ok((key, *amount))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        let pinned = |key: &str| pinned_micros.get(key).copied().unwrap_or(0.0);

        let mut micro_targets = BTreeMap::new();
        for key in &self.optimize_micros {
            let key = key.to_lowercase();
            let target = references.target(&key).ok_or_else(|| unknown(&key))?;
            let net = target - pinned(&key);
            if net > MIN_TARGET {
                micro_targets.insert(key, net);
            } else {
                debug!(nutrient = %key, "already covered by pinned intake");
            }
        }

        let mut micro_limits: BTreeMap<String, f64> = if self.hard_upper_limits {
            references
                .upper_limits
                .iter()
                .map(|(key, ul)| (key.clone(), (ul - pinned(key)).max(0.0)))
                .collect()
        } else {
            BTreeMap::new()
        };
        for (key, &limit) in &self.upper_limits {
            let key = key.to_lowercase();
            if !references.knows(&key) {
                return Err(unknown(&key));
            }
            if !(limit >= 0.0) {
                return Err(PlannerError::InvalidInput(format!(
                    "{} upper limit must be non-negative, got {}",
                    key, limit
                )));
            }
            let net = (limit - pinned(&key)).max(0.0);
            micro_limits.insert(key, net);
        }

        let macro_ratio = self.macro_ratio.map(|r| MacroRatio {
            carbs: r.carbs,
            protein: r.protein,
            fat: r.fat,
            pinned: self.pinned.macros,
        });

        let problem = MealProblem {
            ingredients,
            calories: self.calories,
            macro_constraints: self.macro_constraints.clone(),
            macro_ratio,
            micro_targets,
            micro_limits,
            priorities: self.priorities.clone(),
            references,
            pinned_micros,
            config: self.config.clone(),
        };
        problem.validate()?;
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Sex;
    use crate::models::{ConstraintMode, Food, Macro};

    fn catalog() -> FoodCatalog {
        FoodCatalog::new(vec![
            Food {
                id: "lentils".to_string(),
                name: "Lentils".to_string(),
                calories: 116.0,
                protein: 9.0,
                fat: 0.4,
                carbs: 20.0,
                fiber: 7.9,
                micros: BTreeMap::from([("iron".to_string(), 3.3)]),
            },
            Food {
                id: "pepper".to_string(),
                name: "Red pepper".to_string(),
                calories: 31.0,
                protein: 1.0,
                fat: 0.3,
                carbs: 6.0,
                fiber: 2.1,
                micros: BTreeMap::from([("vitamin_c".to_string(), 128.0)]),
            },
        ])
    }

    fn tables() -> ReferenceTables {
        let csv = "\
sex,age_band,nutrient,target,ear,ul
female,19-30,iron,18,8.1,45
female,19-30,vitamin_c,75,60,2000
";
        ReferenceTables::from_reader(csv.as_bytes()).unwrap()
    }

    fn request() -> MealRequest {
        serde_json::from_str(
            r#"{
                "demographic": {"sex": "female", "age_band": "19-30"},
                "ingredients": [
                    {"food": "Lentils", "max_grams": 300},
                    {"food": "pepper", "min_grams": 50, "max_grams": 200}
                ],
                "calories": {"target": 450, "tolerance": 30},
                "pinned": {"micros": {"iron": 10, "vitamin_c": 80}},
                "optimize_micros": ["iron", "vitamin_c"],
                "hard_upper_limits": true
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_computes_net_targets_and_limits() {
        let problem = request().resolve(&catalog(), &tables()).unwrap();

        assert_eq!(problem.ingredients.len(), 2);
        assert_eq!(problem.ingredients[0].food.id, "lentils");
        assert_eq!(problem.micro_targets.get("iron"), Some(&8.0));
        // vitamin C already covered by pinned intake
        assert!(!problem.micro_targets.contains_key("vitamin_c"));
        assert_eq!(problem.micro_limits.get("vitamin_c"), Some(&1920.0));
        assert_eq!(problem.priorities, default_priorities());
        assert_eq!(problem.tracked_micros().len(), 2);
    }

    #[test]
    fn test_explicit_upper_limit_overrides_reference() {
        let mut req = request();
        req.hard_upper_limits = false;
        req.upper_limits = BTreeMap::from([("Iron".to_string(), 25.0)]);
        let problem = req.resolve(&catalog(), &tables()).unwrap();
        // 25 mg cap less 10 mg pinned; vitamin C gets no cap
        assert_eq!(problem.micro_limits.get("iron"), Some(&15.0));
        assert_eq!(problem.micro_limits.len(), 1);

        let mut req = request();
        req.upper_limits = BTreeMap::from([("iron".to_string(), 5.0)]);
        let problem = req.resolve(&catalog(), &tables()).unwrap();
        assert_eq!(problem.micro_limits.get("iron"), Some(&0.0));
        assert_eq!(problem.micro_limits.get("vitamin_c"), Some(&1920.0));
    }

    #[test]
    fn test_upper_limit_rejects_unknown_or_negative() {
        let mut req = request();
        req.upper_limits = BTreeMap::from([("irn".to_string(), 25.0)]);
        assert!(matches!(
            req.resolve(&catalog(), &tables()),
            Err(PlannerError::UnknownNutrient { .. })
        ));

        let mut req = request();
        req.upper_limits = BTreeMap::from([("iron".to_string(), -1.0)]);
        assert!(matches!(
            req.resolve(&catalog(), &tables()),
            Err(PlannerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_unknown_food_suggests() {
        let mut req = request();
        req.ingredients[0].food = "lentls".to_string();
        match req.resolve(&catalog(), &tables()) {
            Err(PlannerError::FoodNotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("lentils"));
            }
            other => panic!("expected FoodNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unknown_nutrient_suggests() {
        let mut req = request();
        req.optimize_micros = vec!["vitamn_c".to_string()];
        match req.resolve(&catalog(), &tables()) {
            Err(PlannerError::UnknownNutrient { key, suggestion }) => {
                assert_eq!(key, "vitamn_c");
                assert_eq!(suggestion.as_deref(), Some("vitamin_c"));
            }
            other => panic!("expected UnknownNutrient, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unknown_demographic() {
        let mut req = request();
        req.demographic = Demographic {
            sex: Sex::Male,
            age_band: "19-30".to_string(),
        };
        assert!(matches!(
            req.resolve(&catalog(), &tables()),
            Err(PlannerError::UnknownDemographic(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut problem = request().resolve(&catalog(), &tables()).unwrap();
        problem.calories.target = 0.0;
        assert!(matches!(problem.validate(), Err(PlannerError::InvalidInput(_))));

        let mut problem = request().resolve(&catalog(), &tables()).unwrap();
        problem.ingredients[1].min_grams = -1.0;
        assert!(matches!(problem.validate(), Err(PlannerError::InvalidInput(_))));

        let problem = request()
            .resolve(&catalog(), &tables())
            .unwrap()
            .with_macro_constraint(MacroConstraint {
                nutrient: Macro::Protein,
                mode: ConstraintMode::AtLeast,
                grams: -5.0,
                hard: true,
            });
        assert!(matches!(problem.validate(), Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn test_min_above_max_is_not_a_validation_error() {
        let mut problem = request().resolve(&catalog(), &tables()).unwrap();
        problem.ingredients[1].min_grams = 500.0;
        assert!(problem.validate().is_ok());
    }
}

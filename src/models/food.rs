use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::meal::Macro;

/// A food's nutrient profile, expressed per 100 g.
///
/// Micronutrient keys are free-form lowercase identifiers (e.g. `vitamin_c`,
/// `iron`) and must match the keys used by the reference-intake tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: String,

    pub name: String,

    pub calories: f64,

    pub protein: f64,

    pub fat: f64,

    pub carbs: f64,

    #[serde(default)]
    pub fiber: f64,

    #[serde(default)]
    pub micros: BTreeMap<String, f64>,
}

impl Food {
    /// Calories contributed by one gram.
    #[inline]
    pub fn calories_per_gram(&self) -> f64 {
        self.calories / 100.0
    }

    /// Grams of a macro contributed by one gram of food.
    #[inline]
    pub fn macro_per_gram(&self, m: Macro) -> f64 {
        let per_100 = match m {
            Macro::Carbs => self.carbs,
            Macro::Protein => self.protein,
            Macro::Fat => self.fat,
            Macro::Fiber => self.fiber,
        };
        per_100 / 100.0
    }

    /// Amount of a micronutrient contributed by one gram (0 when absent).
    #[inline]
    pub fn micro_per_gram(&self, key: &str) -> f64 {
        self.micros.get(key).copied().unwrap_or(0.0) / 100.0
    }

    /// Basic validation: non-negative values throughout.
    pub fn is_valid(&self) -> bool {
        self.calories >= 0.0
            && self.protein >= 0.0
            && self.fat >= 0.0
            && self.carbs >= 0.0
            && self.fiber >= 0.0
            && self.micros.values().all(|v| *v >= 0.0)
    }

    /// Debug string for logging.
    pub fn debug_string(&self) -> String {
        format!(
            "{}: {} kcal, P:{} F:{} C:{} Fib:{} ({} micros)",
            self.name,
            self.calories,
            self.protein,
            self.fat,
            self.carbs,
            self.fiber,
            self.micros.len()
        )
    }

    /// Canonical key for lookups (lowercase id).
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }
}

impl PartialEq for Food {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Food {}

impl std::hash::Hash for Food {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_food() -> Food {
        Food {
            id: "Lentils".to_string(),
            name: "Lentils, boiled".to_string(),
            calories: 116.0,
            protein: 9.0,
            fat: 0.4,
            carbs: 20.0,
            fiber: 7.9,
            micros: BTreeMap::from([("iron".to_string(), 3.3), ("folate".to_string(), 181.0)]),
        }
    }

    #[test]
    fn test_per_gram_conversions() {
        let food = sample_food();
        assert!((food.calories_per_gram() - 1.16).abs() < 1e-9);
        assert!((food.macro_per_gram(Macro::Protein) - 0.09).abs() < 1e-9);
        assert!((food.macro_per_gram(Macro::Fiber) - 0.079).abs() < 1e-9);
        assert!((food.micro_per_gram("iron") - 0.033).abs() < 1e-9);
        assert_eq!(food.micro_per_gram("vitamin_d"), 0.0);
    }

    #[test]
    fn test_is_valid() {
        let food = sample_food();
        assert!(food.is_valid());

        let mut invalid = sample_food();
        invalid.micros.insert("zinc".to_string(), -1.0);
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_equality_case_insensitive() {
        let food1 = sample_food();
        let mut food2 = sample_food();
        food2.id = "LENTILS".to_string();
        assert_eq!(food1, food2);
    }
}

use std::collections::{BTreeSet, HashMap};

use crate::catalog::closest_match;
use crate::error::{PlannerError, Result};
use crate::models::Food;

/// Read-only food lookup keyed by lowercase id.
#[derive(Debug, Clone, Default)]
pub struct FoodCatalog {
    foods: HashMap<String, Food>,
}

impl FoodCatalog {
    /// Build a catalog; later duplicates of an id replace earlier ones.
    pub fn new(foods: Vec<Food>) -> Self {
        let mut map = HashMap::new();
        for food in foods {
            map.insert(food.key(), food);
        }
        Self { foods: map }
    }

    /// Get a food by id (case-insensitive).
    pub fn get(&self, id: &str) -> Option<&Food> {
        self.foods.get(&id.to_lowercase())
    }

    /// Like [`get`](Self::get) but fails with the closest known id as a hint.
    pub fn lookup(&self, id: &str) -> Result<&Food> {
        self.get(id).ok_or_else(|| PlannerError::FoodNotFound {
            id: id.to_string(),
            suggestion: closest_match(&id.to_lowercase(), self.foods.keys()),
        })
    }

    /// All foods sorted by name.
    pub fn all_foods(&self) -> Vec<&Food> {
        let mut foods: Vec<&Food> = self.foods.values().collect();
        foods.sort_by(|a, b| a.name.cmp(&b.name));
        foods
    }

    /// Every micronutrient key any food reports.
    pub fn micro_keys(&self) -> BTreeSet<String> {
        self.foods
            .values()
            .flat_map(|f| f.micros.keys().cloned())
            .collect()
    }

    /// Convert to a list of foods for JSON serialization.
    pub fn to_foods(&self) -> Vec<Food> {
        self.foods.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample_foods() -> Vec<Food> {
        vec![
            Food {
                id: "oats".to_string(),
                name: "Rolled oats".to_string(),
                calories: 379.0,
                protein: 13.2,
                fat: 6.5,
                carbs: 67.7,
                fiber: 10.1,
                micros: BTreeMap::from([("iron".to_string(), 4.3)]),
            },
            Food {
                id: "Spinach".to_string(),
                name: "Spinach, raw".to_string(),
                calories: 23.0,
                protein: 2.9,
                fat: 0.4,
                carbs: 3.6,
                fiber: 2.2,
                micros: BTreeMap::from([
                    ("iron".to_string(), 2.7),
                    ("vitamin_c".to_string(), 28.1),
                ]),
            },
        ]
    }

    #[test]
    fn test_get_case_insensitive() {
        let catalog = FoodCatalog::new(sample_foods());
        assert!(catalog.get("spinach").is_some());
        assert!(catalog.get("SPINACH").is_some());
        assert!(catalog.get("kale").is_none());
    }

    #[test]
    fn test_lookup_suggests_closest_id() {
        let catalog = FoodCatalog::new(sample_foods());
        match catalog.lookup("spinch") {
            Err(PlannerError::FoodNotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("spinach"));
            }
            other => panic!("expected FoodNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_micro_keys_union() {
        let catalog = FoodCatalog::new(sample_foods());
        let keys: Vec<String> = catalog.micro_keys().into_iter().collect();
        assert_eq!(keys, vec!["iron".to_string(), "vitamin_c".to_string()]);
    }

    #[test]
    fn test_all_foods_sorted_by_name() {
        let catalog = FoodCatalog::new(sample_foods());
        let names: Vec<&str> = catalog.all_foods().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Rolled oats", "Spinach, raw"]);
    }
}

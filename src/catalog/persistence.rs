use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::models::Food;

/// One entry per lowercase id, the last occurrence winning, ordered by key.
fn unique_by_key<F: Borrow<Food>>(foods: impl IntoIterator<Item = F>) -> Vec<F> {
    let mut by_key: BTreeMap<String, F> = BTreeMap::new();
    for food in foods {
        by_key.insert(food.borrow().key(), food);
    }
    by_key.into_values().collect()
}

/// Load a food catalog from a JSON array.
///
/// Foods with negative nutrient values are dropped with a warning; duplicate
/// ids keep their last occurrence.
pub fn load_foods<P: AsRef<Path>>(path: P) -> Result<Vec<Food>> {
    let path = path.as_ref();
    let parsed: Vec<Food> = serde_json::from_str(&fs::read_to_string(path)?)?;

    let valid = parsed.into_iter().filter(|food| {
        if food.is_valid() {
            trace!(food = %food.debug_string(), "loaded");
            true
        } else {
            warn!(food = %food.id, "skipping food with negative nutrient values");
            false
        }
    });
    let foods = unique_by_key(valid);

    debug!(path = %path.display(), count = foods.len(), "loaded food catalog");
    Ok(foods)
}

/// Write foods as pretty JSON, de-duplicated and ordered by id.
pub fn save_foods<P: AsRef<Path>>(path: P, foods: &[Food]) -> Result<()> {
    let json = serde_json::to_string_pretty(&unique_by_key(foods))?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_and_save_roundtrip() {
        let json = r#"[
            {"id": "egg", "name": "Egg, boiled", "calories": 155, "protein": 12.6, "fat": 10.6, "carbs": 1.1,
             "micros": {"vitamin_b12": 1.1, "selenium": 30.8}}
        ]"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let foods = load_foods(file.path()).unwrap();
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].name, "Egg, boiled");
        assert_eq!(foods[0].fiber, 0.0);

        let out_file = NamedTempFile::new().unwrap();
        save_foods(out_file.path(), &foods).unwrap();

        let reloaded = load_foods(out_file.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].micros.get("selenium"), Some(&30.8));
    }

    #[test]
    fn test_deduplication() {
        let json = r#"[
            {"id": "Egg", "name": "Egg v1", "calories": 150, "protein": 12, "fat": 10, "carbs": 1},
            {"id": "egg", "name": "Egg v2", "calories": 155, "protein": 12.6, "fat": 10.6, "carbs": 1.1}
        ]"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let foods = load_foods(file.path()).unwrap();
        assert_eq!(foods.len(), 1);
        // Last occurrence wins
        assert_eq!(foods[0].name, "Egg v2");
    }

    #[test]
    fn test_invalid_food_skipped() {
        let json = r#"[
            {"id": "bad", "name": "Bad", "calories": -5, "protein": 0, "fat": 0, "carbs": 0},
            {"id": "ok", "name": "Ok", "calories": 5, "protein": 0, "fat": 0, "carbs": 1}
        ]"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let foods = load_foods(file.path()).unwrap();
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].id, "ok");
    }
}

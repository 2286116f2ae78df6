use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Food not found: {id}{}", suggestion_suffix(.suggestion))]
    FoodNotFound {
        id: String,
        suggestion: Option<String>,
    },

    #[error("Unknown nutrient: {key}{}", suggestion_suffix(.suggestion))]
    UnknownNutrient {
        key: String,
        suggestion: Option<String>,
    },

    #[error("No reference intakes for {0}")]
    UnknownDemographic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Solver error: {0}")]
    Solver(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_nutrient_message_includes_suggestion() {
        let err = PlannerError::UnknownNutrient {
            key: "vitamn_c".to_string(),
            suggestion: Some("vitamin_c".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Unknown nutrient: vitamn_c (did you mean 'vitamin_c'?)"
        );
    }

    #[test]
    fn test_food_not_found_without_suggestion() {
        let err = PlannerError::FoodNotFound {
            id: "unobtainium".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Food not found: unobtainium");
    }
}

mod foods;
mod persistence;
mod reference;

pub use foods::FoodCatalog;
pub use persistence::{load_foods, save_foods};
pub use reference::{Demographic, NutrientReferences, ReferenceTables, Sex};

use strsim::jaro_winkler;

/// Similarity a candidate needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Closest candidate to `input` by Jaro-Winkler similarity, if any is close enough.
pub fn closest_match<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let input = input.to_lowercase();
    candidates
        .into_iter()
        .map(|c| (c, jaro_winkler(&c.to_lowercase(), &input)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(c, _)| c.clone())
}

use crate::models::Priority;
use crate::planner::deviation::Measure;
use crate::planner::program::{LinearExpr, Program};

#[derive(Debug, Clone)]
pub struct Tier {
    pub priority: Priority,
    pub measure: Measure,
}

#[derive(Debug, Clone)]
pub struct WeightedTier {
    pub priority: Priority,
    pub measure: Measure,
    pub weight: f64,
}

/// Lexicographic weights for tiers ordered most significant first.
///
/// Folds from the least significant tier: it gets weight 1 and every tier above
/// gets `w_below · (max_below / resolution + 1)`. A change of `resolution` in any
/// tier then outweighs every tier below it at their maximum values combined.
pub fn tier_weights(max_values: &[f64], resolution: f64) -> Vec<f64> {
    let resolution = if resolution > 0.0 { resolution } else { 1.0 };
    let mut weights = max_values
        .iter()
        .rev()
        .fold(Vec::with_capacity(max_values.len()), |mut acc: Vec<(f64, f64)>, &max| {
            let weight = acc
                .last()
                .map_or(1.0, |&(below_weight, below_max)| below_weight * (below_max / resolution + 1.0));
            acc.push((weight, max.max(0.0)));
            acc
        })
        .into_iter()
        .map(|(weight, _)| weight)
        .collect::<Vec<_>>();
    weights.reverse();
    weights
}

/// Drops empty tiers, assigns weights and installs `Σ weight · value` as the objective.
pub fn compose(program: &mut Program, tiers: Vec<Tier>, resolution: f64) -> Vec<WeightedTier> {
    let tiers: Vec<Tier> = tiers.into_iter().filter(|t| !t.measure.value.is_empty()).collect();
    let maxes: Vec<f64> = tiers.iter().map(|t| t.measure.max_value).collect();
    let weights = tier_weights(&maxes, resolution);

    let weighted: Vec<WeightedTier> = tiers
        .into_iter()
        .zip(weights)
        .map(|(tier, weight)| WeightedTier {
            priority: tier.priority,
            measure: tier.measure,
            weight,
        })
        .collect();

    let objective = weighted.iter().fold(LinearExpr::new(), |mut acc, t| {
        acc.add_expr(&t.measure.value, t.weight);
        acc
    });
    program.set_objective(objective);
    weighted
}

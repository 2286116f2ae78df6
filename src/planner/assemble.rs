use std::time::Duration;

use crate::models::{
    Coverage, Infeasibility, IngredientResult, MacroTotals, MicroResult, Solution, SolveStatus,
    TierValue,
};
use crate::planner::config::Regime;
use crate::planner::constants::READBACK_SNAP;
use crate::planner::constraints::GramVars;
use crate::planner::objective::WeightedTier;
use crate::planner::program::Program;
use crate::planner::request::MealProblem;

/// Relative slack before an intake counts as below its target.
const TARGET_MET_SLACK: f64 = 1e-6;

/// Severity band for a total intake against its reference values.
pub fn coverage(intake: f64, target: Option<f64>, ear: Option<f64>, upper_limit: Option<f64>) -> Coverage {
    if upper_limit.is_some_and(|ul| intake > ul * (1.0 + TARGET_MET_SLACK)) {
        return Coverage::OverLimit;
    }
    let Some(target) = target else {
        return Coverage::Untargeted;
    };
    if ear.is_some_and(|e| intake < e * (1.0 - TARGET_MET_SLACK)) {
        Coverage::Deficient
    } else if intake < target * (1.0 - TARGET_MET_SLACK) {
        Coverage::Low
    } else {
        Coverage::Met
    }
}

/// Solver value of a gram variable mapped back into its bounds.
fn read_grams(value: f64, lower: f64, upper: f64, regime: Regime) -> f64 {
    let (lower, upper) = match regime {
        Regime::Integer => (lower.ceil(), upper.floor()),
        Regime::Continuous => (lower, upper),
    };
    let v = match regime {
        Regime::Integer => value.round(),
        Regime::Continuous if (value - lower).abs() < READBACK_SNAP => lower,
        Regime::Continuous if (value - upper).abs() < READBACK_SNAP => upper,
        Regime::Continuous => value,
    };
    v.clamp(lower, upper.max(lower))
}

/// Per-ingredient, aggregate and micronutrient figures for a gram assignment
/// indexed like `problem.ingredients`.
fn describe_meal(
    problem: &MealProblem,
    grams: &[f64],
) -> (Vec<IngredientResult>, MacroTotals, Vec<MicroResult>) {
    let ingredients: Vec<IngredientResult> = problem
        .ingredients
        .iter()
        .zip(grams)
        .map(|(ing, &g)| IngredientResult {
            food_id: ing.food.id.clone(),
            name: ing.food.name.clone(),
            grams: g,
            macros: MacroTotals::of_food(&ing.food, g),
        })
        .collect();

    let mut totals = MacroTotals::default();
    for result in &ingredients {
        totals += result.macros;
    }

    let refs = &problem.references;
    let micros = problem
        .tracked_micros()
        .into_iter()
        .map(|key| {
            let total: f64 = problem
                .ingredients
                .iter()
                .zip(grams)
                .map(|(ing, &g)| ing.food.micro_per_gram(&key) * g)
                .sum();
            let pinned = problem.pinned_micros.get(&key).copied().unwrap_or(0.0);
            let target = refs.target(&key);
            let intake = total + pinned;
            MicroResult {
                total,
                pinned,
                target,
                remaining: target.map(|t| (t - pinned - total).max(0.0)),
                percent_of_target: target.filter(|t| *t > 0.0).map(|t| intake / t * 100.0),
                optimized: problem.micro_targets.contains_key(&key),
                coverage: coverage(intake, target, refs.ear(&key), refs.upper_limit(&key)),
                key,
            }
        })
        .collect();

    (ingredients, totals, micros)
}

/// Reads a solved assignment back into domain terms.
pub fn assemble_solution(
    problem: &MealProblem,
    program: &Program,
    gram_vars: &GramVars,
    tiers: &[WeightedTier],
    values: &[f64],
    status: SolveStatus,
    elapsed: Duration,
) -> Solution {
    let regime = problem.config.regime;
    let mut grams = vec![0.0; problem.ingredients.len()];
    for gv in gram_vars.iter() {
        let spec = program.var(gv.var);
        grams[gv.ingredient] = read_grams(values[gv.var.index()], spec.lower, spec.upper, regime);
    }

    let (ingredients, totals, micros) = describe_meal(problem, &grams);
    let tiers = tiers
        .iter()
        .map(|t| TierValue {
            priority: t.priority,
            value: t.measure.value.evaluate(values),
            max_value: t.measure.max_value,
            weight: t.weight,
        })
        .collect();

    Solution {
        status,
        regime,
        infeasibility: None,
        ingredients,
        totals,
        micros,
        tiers,
        solve_millis: elapsed.as_millis() as u64,
    }
}

/// Solution for a request with no acceptable assignment. Every portion is 0 g.
pub fn infeasible_solution(problem: &MealProblem, reason: Infeasibility, elapsed: Duration) -> Solution {
    let (ingredients, totals, micros) =
        describe_meal(problem, &vec![0.0; problem.ingredients.len()]);
    Solution {
        status: SolveStatus::Infeasible,
        regime: problem.config.regime,
        infeasibility: Some(reason),
        ingredients,
        totals,
        micros,
        tiers: Vec::new(),
        solve_millis: elapsed.as_millis() as u64,
    }
}

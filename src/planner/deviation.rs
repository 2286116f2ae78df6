//! Soft requirements expressed with linear rows over auxiliary variables.
//!
//! Every auxiliary variable gets its bounds from the interval range of the
//! expression that defines it, so nothing in the lowered program is unbounded.
//! Normalized rows are multiplied through by their denominator instead of
//! dividing coefficients, which keeps them well-scaled under integer rounding.

use crate::models::{ConstraintMode, Macro};
use crate::planner::constants::{MIN_TARGET, PERCENT_SCALE, PROXIMITY_WEIGHT};
use crate::planner::constraints::GramVars;
use crate::planner::program::{Cmp, LinearExpr, Program, RowRole, VarId, VarKind};
use crate::planner::request::MealProblem;

/// A tier candidate: the expression to minimize and the largest value it can take.
#[derive(Debug, Clone)]
pub struct Measure {
    pub value: LinearExpr,
    pub max_value: f64,
}

impl Measure {
    fn of_var(program: &Program, var: VarId) -> Self {
        Self {
            value: LinearExpr::var(var),
            max_value: program.var(var).upper,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reformulation helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `d ≥ max(deficit / unit, 0)`, encoded as `unit·d − deficit ≥ 0` with `d ≥ 0`.
pub fn one_sided(program: &mut Program, label: &str, deficit: LinearExpr, unit: f64) -> VarId {
    let (_, hi) = program.range(&deficit);
    let d = program.add_var(label, 0.0, (hi / unit).max(0.0), VarKind::Auxiliary);
    program.require(
        format!("{} >= deficit", label),
        LinearExpr::var(d).scaled(unit).minus(&deficit),
        Cmp::Ge,
        0.0,
        RowRole::Definition,
    );
    d
}

/// `pos − neg = expr` with both parts non-negative; returns `pos + neg`.
pub fn abs_split(program: &mut Program, label: &str, expr: LinearExpr) -> LinearExpr {
    let (lo, hi) = program.range(&expr);
    let pos = program.add_var(format!("{}+", label), 0.0, hi.max(0.0), VarKind::Auxiliary);
    let neg = program.add_var(format!("{}-", label), 0.0, (-lo).max(0.0), VarKind::Auxiliary);
    program.require(
        format!("{} split", label),
        LinearExpr::var(pos).with_term(neg, -1.0).minus(&expr),
        Cmp::Eq,
        0.0,
        RowRole::Definition,
    );
    LinearExpr::var(pos).with_term(neg, 1.0)
}

/// `d ≥ |expr| / unit` as two one-sided rows.
pub fn abs_bound(program: &mut Program, label: &str, expr: LinearExpr, unit: f64) -> VarId {
    let (lo, hi) = program.range(&expr);
    let d = program.add_var(label, 0.0, lo.abs().max(hi.abs()) / unit, VarKind::Auxiliary);
    let scaled = LinearExpr::var(d).scaled(unit);
    program.require(
        format!("{} >= +dev", label),
        scaled.clone().minus(&expr),
        Cmp::Ge,
        0.0,
        RowRole::Definition,
    );
    program.require(
        format!("{} >= -dev", label),
        scaled.plus(&expr),
        Cmp::Ge,
        0.0,
        RowRole::Definition,
    );
    d
}

/// Minimax bound: `w ≥ v` for every value. `None` when there is nothing to bound.
pub fn bound_above(program: &mut Program, label: &str, values: &[LinearExpr]) -> Option<VarId> {
    if values.is_empty() {
        return None;
    }
    let (lo, hi) = values
        .iter()
        .map(|v| program.range(v))
        .fold((f64::MIN, f64::MIN), |(l, h), (vl, vh)| (l.max(vl), h.max(vh)));
    let w = program.add_var(label, lo.max(0.0), hi.max(0.0), VarKind::Auxiliary);
    for (i, v) in values.iter().enumerate() {
        program.require(
            format!("{} >= [{}]", label, i),
            LinearExpr::var(w).minus(v),
            Cmp::Ge,
            0.0,
            RowRole::Definition,
        );
    }
    Some(w)
}

// ─────────────────────────────────────────────────────────────────────────────
// Macronutrients
// ─────────────────────────────────────────────────────────────────────────────

/// Percent deviation of each loose macro constraint, bounded by `worst-loose`.
pub fn encode_loose_macros(program: &mut Program, problem: &MealProblem, grams: &GramVars) -> Option<VarId> {
    let mut deviations = Vec::new();
    for c in problem
        .macro_constraints
        .iter()
        .filter(|c| !c.hard && c.is_active())
    {
        let actual = grams.macro_grams(&problem.ingredients, c.nutrient);
        let target = LinearExpr::constant(c.grams);
        let unit = c.grams.max(1.0) / PERCENT_SCALE;
        let label = format!("loose[{}]", c.nutrient);

        let d = match c.mode {
            ConstraintMode::AtLeast => one_sided(program, &label, target.minus(&actual), unit),
            ConstraintMode::AtMost => one_sided(program, &label, actual.minus(&target), unit),
            ConstraintMode::Exactly => {
                let split = abs_split(program, &label, actual.minus(&target));
                one_sided(program, &label, split, unit)
            }
            ConstraintMode::Unconstrained => continue,
        };
        deviations.push(LinearExpr::var(d));
    }
    bound_above(program, "worst_loose", &deviations)
}

/// Percentage-point deviation of each energy macro from its calorie share.
///
/// The share is measured against the meal plus pinned intake and normalized by
/// the calorie target plus pinned energy, a constant, so each side of the
/// absolute value stays linear.
pub fn encode_macro_ratio(program: &mut Program, problem: &MealProblem, grams: &GramVars) -> Option<VarId> {
    let ratio = problem.macro_ratio.as_ref()?;
    let locked: Vec<Macro> = problem
        .macro_constraints
        .iter()
        .filter(|c| c.locks_macro())
        .map(|c| c.nutrient)
        .collect();

    let kcal = |m: Macro| {
        let factor = m.kcal_per_gram().unwrap_or(0.0);
        grams
            .macro_grams(&problem.ingredients, m)
            .plus(&LinearExpr::constant(ratio.pinned.get(m)))
            .scaled(factor)
    };
    let total = Macro::ENERGY
        .iter()
        .fold(LinearExpr::new(), |acc, &m| acc.plus(&kcal(m)));

    let pinned_kcal: f64 = Macro::ENERGY
        .iter()
        .map(|&m| m.kcal_per_gram().unwrap_or(0.0) * ratio.pinned.get(m))
        .sum();
    let reference = problem.calories.target + pinned_kcal;
    if reference <= MIN_TARGET {
        return None;
    }
    let unit = reference / PERCENT_SCALE;

    let deviations: Vec<LinearExpr> = Macro::ENERGY
        .iter()
        .filter(|m| !locked.contains(*m))
        .map(|&m| {
            let share = ratio.percent(m) / PERCENT_SCALE;
            let gap = kcal(m).minus(&total.clone().scaled(share));
            LinearExpr::var(abs_bound(program, &format!("ratio[{}]", m), gap, unit))
        })
        .collect();
    bound_above(program, "macro_worst", &deviations)
}

/// Macro tier representative: a shared bound over the ratio and loose minimaxes.
pub fn combine_macro_tier(
    program: &mut Program,
    ratio_worst: Option<VarId>,
    loose_worst: Option<VarId>,
) -> Option<Measure> {
    match (ratio_worst, loose_worst) {
        (Some(r), Some(l)) => {
            let shared = bound_above(
                program,
                "macro_tier",
                &[LinearExpr::var(r), LinearExpr::var(l)],
            )?;
            Some(Measure::of_var(program, shared))
        }
        (Some(v), None) | (None, Some(v)) => Some(Measure::of_var(program, v)),
        (None, None) => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Micronutrients
// ─────────────────────────────────────────────────────────────────────────────

/// Minimax of percent shortfalls: `shortfall ≥ 100·(target − actual)/target`.
pub fn encode_micro_shortfall(program: &mut Program, problem: &MealProblem, grams: &GramVars) -> Option<VarId> {
    let shortfalls: Vec<LinearExpr> = problem
        .micro_targets
        .iter()
        .filter(|(_, t)| **t > MIN_TARGET)
        .map(|(key, &target)| {
            let actual = grams.micro_amount(&problem.ingredients, key);
            let deficit = LinearExpr::constant(target).minus(&actual);
            let s = one_sided(program, &format!("shortfall[{}]", key), deficit, target / PERCENT_SCALE);
            LinearExpr::var(s)
        })
        .collect();
    bound_above(program, "worst", &shortfalls)
}

/// Remaining headroom below the upper limit for an optimized nutrient, if any.
fn headroom_limit(problem: &MealProblem, key: &str) -> Option<f64> {
    problem.micro_limits.get(key).copied().or_else(|| {
        let pinned = problem.pinned_micros.get(key).copied().unwrap_or(0.0);
        problem.references.upper_limit(key).map(|ul| ul - pinned)
    })
}

/// Minimax of `100·(actual − target)/(limit − target)` over optimized nutrients with a limit.
pub fn encode_upper_proximity(program: &mut Program, problem: &MealProblem, grams: &GramVars) -> Option<VarId> {
    let excesses: Vec<LinearExpr> = problem
        .micro_targets
        .iter()
        .filter_map(|(key, &target)| {
            let headroom = headroom_limit(problem, key)? - target;
            (headroom > MIN_TARGET).then_some((key, target, headroom))
        })
        .map(|(key, target, headroom)| {
            let over = grams
                .micro_amount(&problem.ingredients, key)
                .minus(&LinearExpr::constant(target));
            let e = one_sided(program, &format!("excess[{}]", key), over, headroom / PERCENT_SCALE);
            LinearExpr::var(e)
        })
        .collect();
    bound_above(program, "worst_proximity", &excesses)
}

/// Micronutrient tier: `worst + PROXIMITY_WEIGHT · worst_proximity`.
pub fn encode_micronutrient_tier(
    program: &mut Program,
    problem: &MealProblem,
    grams: &GramVars,
) -> Option<Measure> {
    let worst = encode_micro_shortfall(program, problem, grams)?;
    let mut measure = Measure::of_var(program, worst);
    if let Some(prox) = encode_upper_proximity(program, problem, grams) {
        measure.value.add_term(prox, PROXIMITY_WEIGHT);
        measure.max_value += PROXIMITY_WEIGHT * program.var(prox).upper;
    }
    Some(measure)
}

// ─────────────────────────────────────────────────────────────────────────────
// Mass shaping
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized sum of squared portions: `100·Σ x² / Σ max²`.
pub fn encode_diversity(program: &mut Program, grams: &GramVars) -> Option<Measure> {
    let mut sum = LinearExpr::new();
    let mut max_sum = 0.0;
    for gv in grams.iter() {
        let (lower, upper) = {
            let spec = program.var(gv.var);
            (spec.lower, spec.upper)
        };
        let name = format!("{}^2", program.var(gv.var).name);
        let sq = program.add_var(name.clone(), lower * lower, upper * upper, VarKind::Auxiliary);
        program.add_square(name, sq, gv.var);
        sum.add_term(sq, 1.0);
        max_sum += upper * upper;
    }
    if max_sum <= 0.0 {
        return None;
    }
    Some(Measure {
        value: sum.scaled(PERCENT_SCALE / max_sum),
        max_value: PERCENT_SCALE,
    })
}

/// Total grams as a percent of the summed upper bounds: `100·Σ x / Σ max`.
pub fn encode_total_mass(program: &Program, grams: &GramVars) -> Option<Measure> {
    if grams.is_empty() {
        return None;
    }
    let total = grams.total_grams();
    let (_, max_total) = program.range(&total);
    if max_total <= 0.0 {
        return None;
    }
    Some(Measure {
        value: total.scaled(PERCENT_SCALE / max_total),
        max_value: PERCENT_SCALE,
    })
}

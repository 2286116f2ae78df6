pub mod assemble;
pub mod config;
pub mod constants;
pub mod constraints;
pub mod deviation;
pub mod dispatch;
pub mod objective;
pub mod program;
pub mod request;
pub mod scaling;
pub mod solver;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::error::Result;
use crate::models::{Priority, Solution, SolveStatus};

pub use assemble::{assemble_solution, coverage, infeasible_solution};
pub use config::{Regime, SolverConfig};
pub use constraints::{build_hard_constraints, precheck, GramVars};
pub use dispatch::SolveDispatcher;
pub use objective::{compose, tier_weights, Tier, WeightedTier};
pub use program::{LinearExpr, Program};
pub use request::{MealProblem, MealRequest};
pub use scaling::{LoweredProgram, ScalingPolicy};
pub use solver::{solve_with_budget, Backend, BackendResult, MicroLpBackend, SolveOutcome};

/// A fully built program plus the handles needed to read its solution back.
#[derive(Debug, Clone)]
pub struct MealModel {
    pub program: Program,
    pub grams: GramVars,
    pub tiers: Vec<WeightedTier>,
}

/// Builds hard rows, one tier per listed priority, and the weighted objective.
///
/// Loose macro constraints still shape the objective when the macro-ratio
/// priority is not listed: they get a tier of their own below all others.
pub fn build_model(problem: &MealProblem) -> MealModel {
    let mut program = Program::new();
    let grams = build_hard_constraints(&mut program, problem);

    let mut listed: Vec<Priority> = Vec::with_capacity(problem.priorities.len());
    for &p in &problem.priorities {
        if !listed.contains(&p) {
            listed.push(p);
        }
    }

    let mut tiers = Vec::with_capacity(listed.len() + 1);
    for &priority in &listed {
        let measure = match priority {
            Priority::Micronutrients => {
                deviation::encode_micronutrient_tier(&mut program, problem, &grams)
            }
            Priority::MacroRatio => {
                let ratio = deviation::encode_macro_ratio(&mut program, problem, &grams);
                let loose = deviation::encode_loose_macros(&mut program, problem, &grams);
                deviation::combine_macro_tier(&mut program, ratio, loose)
            }
            Priority::Diversity => deviation::encode_diversity(&mut program, &grams),
            Priority::TotalMass => deviation::encode_total_mass(&program, &grams),
        };
        if let Some(measure) = measure {
            tiers.push(Tier { priority, measure });
        }
    }

    if !listed.contains(&Priority::MacroRatio) {
        let loose = deviation::encode_loose_macros(&mut program, problem, &grams);
        if let Some(measure) = deviation::combine_macro_tier(&mut program, None, loose) {
            tiers.push(Tier {
                priority: Priority::MacroRatio,
                measure,
            });
        }
    }

    let resolution = ScalingPolicy::from_config(&problem.config).tier_resolution();
    let tiers = compose(&mut program, tiers, resolution);
    MealModel {
        program,
        grams,
        tiers,
    }
}

/// Solve a meal with the default microlp backend.
pub fn solve_meal(problem: &MealProblem) -> Result<Solution> {
    solve_meal_with(problem, Arc::new(MicroLpBackend))
}

/// Validate, pre-check, build, lower, solve and read back.
///
/// Infeasibility is reported through the returned solution's status; errors
/// are reserved for invalid input and backend failures.
pub fn solve_meal_with(problem: &MealProblem, backend: Arc<dyn Backend>) -> Result<Solution> {
    let started = Instant::now();
    let span = info_span!(
        "solve_meal",
        regime = %problem.config.regime,
        ingredients = problem.ingredients.len()
    );
    let _enter = span.enter();

    problem.validate()?;
    let policy = ScalingPolicy::from_config(&problem.config);

    if let Some(reason) = precheck(problem, &policy) {
        info!(reason = %reason.describe(), "infeasible before solving");
        return Ok(infeasible_solution(problem, reason, started.elapsed()));
    }

    let model = build_model(problem);
    let lowered = policy.lower(&model.program, problem.config.square_segments);
    debug!(
        vars = lowered.vars.len(),
        rows = lowered.rows.len(),
        tiers = model.tiers.len(),
        "model lowered"
    );

    let assemble = |values: &[f64], status: SolveStatus| {
        assemble_solution(
            problem,
            &model.program,
            &model.grams,
            &model.tiers,
            values,
            status,
            started.elapsed(),
        )
    };
    let solution = match solve_with_budget(backend, lowered, problem.config.time_budget())? {
        SolveOutcome::Optimal(values) => assemble(&values, SolveStatus::Optimal),
        SolveOutcome::Feasible(values) => assemble(&values, SolveStatus::Feasible),
        SolveOutcome::Infeasible(reason) => {
            info!(reason = %reason.describe(), "solver found no assignment");
            infeasible_solution(problem, reason, started.elapsed())
        }
    };

    info!(status = ?solution.status, millis = solution.solve_millis, "solve finished");
    Ok(solution)
}

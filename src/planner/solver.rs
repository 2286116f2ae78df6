//! Solver adapter. The only module that knows the concrete LP/MIP API.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};
use crate::models::Infeasibility;
use crate::planner::program::Cmp;
use crate::planner::scaling::LoweredProgram;

/// What a backend reports for one lowered program.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResult {
    Optimal(Vec<f64>),
    /// Best solution found before the deadline; optimality not proven.
    Incumbent(Vec<f64>),
    Infeasible,
    Unbounded,
    Failed(String),
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve `program`. Backends that can stop early should return their
    /// incumbent once `deadline` passes.
    fn solve(&self, program: &LoweredProgram, deadline: Instant) -> BackendResult;
}

/// Pure-Rust simplex / branch-and-bound through `good_lp`.
///
/// microlp cannot be interrupted, so the deadline is enforced by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpBackend;

impl Backend for MicroLpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, program: &LoweredProgram, _deadline: Instant) -> BackendResult {
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = program
            .vars
            .iter()
            .map(|v| {
                let def = variable().min(v.lower).max(v.upper);
                vars.add(if v.integer { def.integer() } else { def })
            })
            .collect();

        let mut objective = Expression::default();
        for &(idx, coef) in &program.objective {
            objective.add_mul(coef, handles[idx]);
        }

        let mut model = vars.minimise(objective).using(microlp);
        for row in &program.rows {
            let mut lhs = Expression::default();
            for &(idx, coef) in &row.coeffs {
                lhs.add_mul(coef, handles[idx]);
            }
            model = model.with(match row.cmp {
                Cmp::Ge => constraint::geq(lhs, row.rhs),
                Cmp::Le => constraint::leq(lhs, row.rhs),
                Cmp::Eq => constraint::eq(lhs, row.rhs),
            });
        }

        match model.solve() {
            Ok(solution) => {
                BackendResult::Optimal(handles.iter().map(|v| solution.value(*v)).collect())
            }
            Err(ResolutionError::Infeasible) => BackendResult::Infeasible,
            Err(ResolutionError::Unbounded) => BackendResult::Unbounded,
            Err(e) => BackendResult::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePhase {
    Unsolved,
    Solving,
    Optimal,
    Feasible,
    Infeasible,
    Error,
}

impl SolvePhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SolvePhase::Unsolved | SolvePhase::Solving)
    }
}

/// Lifecycle of one solve: `Unsolved → Solving → {Optimal, Feasible, Infeasible, Error}`.
#[derive(Debug)]
pub struct SolveRun {
    phase: SolvePhase,
    started: Option<Instant>,
}

impl Default for SolveRun {
    fn default() -> Self {
        Self::new()
    }
}

impl SolveRun {
    pub fn new() -> Self {
        Self {
            phase: SolvePhase::Unsolved,
            started: None,
        }
    }

    pub fn phase(&self) -> SolvePhase {
        self.phase
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(SolvePhase::Solving)?;
        self.started = Some(Instant::now());
        Ok(())
    }

    /// Move to a terminal phase; returns the time spent solving.
    pub fn finish(&mut self, phase: SolvePhase) -> Result<Duration> {
        if !phase.is_terminal() {
            return Err(PlannerError::Solver(format!("{:?} is not a terminal phase", phase)));
        }
        self.transition(phase)?;
        Ok(self.started.map(|s| s.elapsed()).unwrap_or_default())
    }

    fn transition(&mut self, to: SolvePhase) -> Result<()> {
        let allowed = match self.phase {
            SolvePhase::Unsolved => to == SolvePhase::Solving,
            SolvePhase::Solving => to.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(PlannerError::Solver(format!(
                "invalid solve transition {:?} -> {:?}",
                self.phase, to
            )));
        }
        self.phase = to;
        Ok(())
    }
}

/// Classified outcome handed to the result assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Vec<f64>),
    Feasible(Vec<f64>),
    Infeasible(Infeasibility),
}

/// Solves on a helper thread and waits at most `budget`.
///
/// A backend still running at the deadline is left detached; its result is dropped.
/// The detached thread keeps its CPU until the backend returns, since microlp
/// cannot be interrupted, so repeated timeouts stack up running solves.
pub fn solve_with_budget(
    backend: Arc<dyn Backend>,
    program: LoweredProgram,
    budget: Duration,
) -> Result<SolveOutcome> {
    let mut run = SolveRun::new();
    run.start()?;

    let expected = program.vars.len();
    let deadline = Instant::now() + budget;
    let (tx, rx) = mpsc::channel();
    let backend_name = backend.name();
    thread::Builder::new()
        .name(format!("{}-solve", backend_name))
        .spawn(move || {
            let result = backend.solve(&program, deadline);
            // The receiver is gone once the budget expired.
            let _ = tx.send(result);
        })?;

    let result = match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            run.finish(SolvePhase::Infeasible)?;
            warn!(backend = backend_name, budget_ms = budget.as_millis() as u64, "solve timed out");
            return Ok(SolveOutcome::Infeasible(Infeasibility::TimedOut {
                budget_ms: budget.as_millis() as u64,
            }));
        }
        Err(RecvTimeoutError::Disconnected) => {
            run.finish(SolvePhase::Error)?;
            return Err(PlannerError::Solver(format!(
                "{} terminated without a result",
                backend_name
            )));
        }
    };

    let check_len = |values: &[f64]| {
        if values.len() == expected {
            Ok(())
        } else {
            Err(PlannerError::Solver(format!(
                "{} returned {} values for {} variables",
                backend_name,
                values.len(),
                expected
            )))
        }
    };

    let outcome = match result {
        BackendResult::Optimal(values) => {
            check_len(&values)?;
            let elapsed = run.finish(SolvePhase::Optimal)?;
            debug!(backend = backend_name, elapsed_ms = elapsed.as_millis() as u64, "optimal");
            SolveOutcome::Optimal(values)
        }
        BackendResult::Incumbent(values) => {
            check_len(&values)?;
            run.finish(SolvePhase::Feasible)?;
            debug!(backend = backend_name, "incumbent at deadline");
            SolveOutcome::Feasible(values)
        }
        BackendResult::Infeasible => {
            run.finish(SolvePhase::Infeasible)?;
            SolveOutcome::Infeasible(Infeasibility::Solver)
        }
        BackendResult::Unbounded => {
            run.finish(SolvePhase::Error)?;
            return Err(PlannerError::Solver("program is unbounded".to_string()));
        }
        BackendResult::Failed(message) => {
            run.finish(SolvePhase::Error)?;
            return Err(PlannerError::Solver(message));
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::planner::config::Regime;
    use crate::planner::scaling::{LoweredRow, LoweredVar};

    fn lp(integer: bool) -> LoweredProgram {
        // min x + y  s.t.  x + 2y >= 3,  x, y in [0, 10]
        LoweredProgram {
            regime: if integer { Regime::Integer } else { Regime::Continuous },
            vars: vec![
                LoweredVar {
                    lower: 0.0,
                    upper: 10.0,
                    integer,
                };
                2
            ],
            rows: vec![LoweredRow {
                coeffs: vec![(0, 1.0), (1, 2.0)],
                cmp: Cmp::Ge,
                rhs: 3.0,
            }],
            objective: vec![(0, 1.0), (1, 1.0)],
        }
    }

    struct Fixed(BackendResult);

    impl Backend for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, _: &LoweredProgram, _: Instant) -> BackendResult {
            self.0.clone()
        }
    }

    struct Sleepy(Duration);

    impl Backend for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        fn solve(&self, program: &LoweredProgram, _: Instant) -> BackendResult {
            thread::sleep(self.0);
            BackendResult::Optimal(vec![0.0; program.vars.len()])
        }
    }

    #[test]
    fn test_microlp_continuous() {
        let result = MicroLpBackend.solve(&lp(false), Instant::now());
        match result {
            BackendResult::Optimal(values) => {
                assert!((values[0] + values[1] - 1.5).abs() < 1e-6);
                assert!(values[1] > 1.49);
            }
            other => panic!("expected optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_microlp_integer() {
        match MicroLpBackend.solve(&lp(true), Instant::now()) {
            BackendResult::Optimal(values) => {
                // (0, 2) and (1, 1) both reach the integer optimum of 2
                assert!((values[0] + values[1] - 2.0).abs() < 1e-6);
                assert!(values.iter().all(|v| (v - v.round()).abs() < 1e-6));
            }
            other => panic!("expected optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_microlp_reports_infeasible() {
        let mut program = lp(false);
        program.rows.push(LoweredRow {
            coeffs: vec![(0, 1.0), (1, 1.0)],
            cmp: Cmp::Le,
            rhs: 1.0,
        });
        assert_eq!(
            MicroLpBackend.solve(&program, Instant::now()),
            BackendResult::Infeasible
        );
    }

    #[test]
    fn test_incumbent_classified_feasible() {
        let backend = Arc::new(Fixed(BackendResult::Incumbent(vec![1.0, 1.0])));
        let outcome = solve_with_budget(backend, lp(false), Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, SolveOutcome::Feasible(vec![1.0, 1.0]));
    }

    #[test]
    fn test_timeout_without_incumbent_is_infeasible() {
        let backend = Arc::new(Sleepy(Duration::from_millis(500)));
        let outcome = solve_with_budget(backend, lp(false), Duration::from_millis(20)).unwrap();
        assert_eq!(
            outcome,
            SolveOutcome::Infeasible(Infeasibility::TimedOut { budget_ms: 20 })
        );
    }

    struct Flagged {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    impl Backend for Flagged {
        fn name(&self) -> &'static str {
            "flagged"
        }

        fn solve(&self, program: &LoweredProgram, _: Instant) -> BackendResult {
            thread::sleep(self.delay);
            self.finished.store(true, Ordering::SeqCst);
            BackendResult::Optimal(vec![0.0; program.vars.len()])
        }
    }

    #[test]
    fn test_timed_out_backend_runs_to_completion() {
        let finished = Arc::new(AtomicBool::new(false));
        let backend = Arc::new(Flagged {
            delay: Duration::from_millis(200),
            finished: Arc::clone(&finished),
        });
        let outcome = solve_with_budget(backend, lp(false), Duration::from_millis(10)).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible(Infeasibility::TimedOut { .. })));
        assert!(!finished.load(Ordering::SeqCst));

        // The detached thread is not cancelled
        let waited = Instant::now();
        while !finished.load(Ordering::SeqCst) && waited.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_backend_failure_is_error() {
        let backend = Arc::new(Fixed(BackendResult::Failed("boom".to_string())));
        let result = solve_with_budget(backend, lp(false), Duration::from_secs(5));
        assert!(matches!(result, Err(PlannerError::Solver(m)) if m == "boom"));

        let backend = Arc::new(Fixed(BackendResult::Optimal(vec![1.0])));
        assert!(solve_with_budget(backend, lp(false), Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_solve_run_transitions() {
        let mut run = SolveRun::new();
        assert!(run.finish(SolvePhase::Optimal).is_err());
        run.start().unwrap();
        assert!(run.start().is_err());
        assert!(run.finish(SolvePhase::Solving).is_err());
        run.finish(SolvePhase::Feasible).unwrap();
        assert_eq!(run.phase(), SolvePhase::Feasible);
        assert!(run.finish(SolvePhase::Optimal).is_err());
    }
}

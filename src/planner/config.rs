use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::planner::constants::{DEFAULT_SCALE, DEFAULT_SQUARE_SEGMENTS, DEFAULT_TIME_BUDGET_MS};

/// Numeric domain the program is lowered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Rows scaled and rounded to integer coefficients, integer gram variables.
    Integer,
    /// Natural units, continuous variables.
    #[default]
    Continuous,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Integer => f.write_str("integer"),
            Regime::Continuous => f.write_str("continuous"),
        }
    }
}

/// Configurable knobs for a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub regime: Regime,
    pub scale: u32,
    pub time_budget_ms: u64,
    pub square_segments: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            regime: Regime::default(),
            scale: DEFAULT_SCALE,
            time_budget_ms: DEFAULT_TIME_BUDGET_MS,
            square_segments: DEFAULT_SQUARE_SEGMENTS,
        }
    }
}

impl SolverConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn with_regime(mut self, regime: Regime) -> Self {
        self.regime = regime;
        self
    }
}

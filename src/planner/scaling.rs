//! Lowering of a [`Program`] into the numeric form handed to a backend.
//!
//! The integer regime multiplies every row by the scale factor and rounds the
//! coefficients, while gram variables stay in natural units and become integer.
//! Square links are expanded into tangent cuts in both regimes.

use crate::planner::config::{Regime, SolverConfig};
use crate::planner::constants::{HARD_ROW_EPSILON, INTEGER_TIER_RESOLUTION};
use crate::planner::program::{Cmp, LinearConstraint, Program, RowRole, VarKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoweredVar {
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredRow {
    pub coeffs: Vec<(usize, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// Concrete program: variables indexed like the source [`Program`].
#[derive(Debug, Clone)]
pub struct LoweredProgram {
    pub regime: Regime,
    pub vars: Vec<LoweredVar>,
    pub rows: Vec<LoweredRow>,
    pub objective: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingPolicy {
    Integer { scale: f64 },
    Continuous,
}

impl ScalingPolicy {
    pub fn from_config(config: &SolverConfig) -> Self {
        match config.regime {
            Regime::Integer => ScalingPolicy::Integer {
                scale: f64::from(config.scale.max(1)),
            },
            Regime::Continuous => ScalingPolicy::Continuous,
        }
    }

    pub fn regime(&self) -> Regime {
        match self {
            ScalingPolicy::Integer { .. } => Regime::Integer,
            ScalingPolicy::Continuous => Regime::Continuous,
        }
    }

    /// Slack granted to hard rows, in natural units.
    pub fn hard_epsilon(&self) -> f64 {
        match self {
            ScalingPolicy::Integer { .. } => HARD_ROW_EPSILON,
            ScalingPolicy::Continuous => 0.0,
        }
    }

    /// Tier change that must dominate all lower tiers, see [`crate::planner::tier_weights`].
    pub fn tier_resolution(&self) -> f64 {
        match self {
            ScalingPolicy::Integer { .. } => INTEGER_TIER_RESOLUTION,
            ScalingPolicy::Continuous => 1.0,
        }
    }

    /// Grams bounds as the lowered program will see them.
    pub fn grams_bounds(&self, lower: f64, upper: f64) -> (f64, f64) {
        match self {
            ScalingPolicy::Integer { .. } => (lower.ceil(), upper.floor()),
            ScalingPolicy::Continuous => (lower, upper),
        }
    }

    pub fn lower(&self, program: &Program, square_segments: usize) -> LoweredProgram {
        let vars = program
            .vars()
            .iter()
            .map(|spec| match spec.kind {
                VarKind::Grams => {
                    let (lower, upper) = self.grams_bounds(spec.lower, spec.upper);
                    LoweredVar {
                        lower,
                        upper,
                        integer: self.regime() == Regime::Integer,
                    }
                }
                VarKind::Auxiliary => LoweredVar {
                    lower: spec.lower,
                    upper: spec.upper,
                    integer: false,
                },
            })
            .collect();

        let mut rows: Vec<LoweredRow> = program
            .constraints()
            .iter()
            .flat_map(|c| self.lower_row(c))
            .collect();

        for square in program.squares() {
            let of = program.var(square.of);
            let points = match self {
                ScalingPolicy::Integer { .. } => {
                    let (lower, upper) = self.grams_bounds(of.lower, of.upper);
                    integer_breakpoints(lower, upper, square_segments)
                }
                ScalingPolicy::Continuous => breakpoints(of.lower, of.upper, square_segments),
            };
            for a in points {
                // sq >= 2a·x - a², tangent of x² at a. Integral points already
                // give integer coefficients, so the cut is not scaled.
                rows.push(LoweredRow {
                    coeffs: vec![(square.square.index(), 1.0), (square.of.index(), -2.0 * a)],
                    cmp: Cmp::Ge,
                    rhs: -a * a,
                });
            }
        }

        let objective = program
            .objective()
            .terms()
            .map(|(v, c)| (v.index(), c))
            .collect();

        LoweredProgram {
            regime: self.regime(),
            vars,
            rows,
            objective,
        }
    }

    fn lower_row(&self, row: &LinearConstraint) -> Vec<LoweredRow> {
        let rhs = row.rhs - row.expr.constant_term();
        let eps = match row.role {
            RowRole::Hard => self.hard_epsilon(),
            RowRole::Definition => 0.0,
        };

        let sides = match (row.cmp, row.role) {
            (Cmp::Eq, RowRole::Hard) if eps > 0.0 => {
                vec![(Cmp::Ge, rhs - eps), (Cmp::Le, rhs + eps)]
            }
            (Cmp::Ge, _) => vec![(Cmp::Ge, rhs - eps)],
            (Cmp::Le, _) => vec![(Cmp::Le, rhs + eps)],
            (Cmp::Eq, _) => vec![(Cmp::Eq, rhs)],
        };

        sides
            .into_iter()
            .map(|(cmp, rhs)| match self {
                ScalingPolicy::Continuous => LoweredRow {
                    coeffs: row.expr.terms().map(|(v, c)| (v.index(), c)).collect(),
                    cmp,
                    rhs,
                },
                ScalingPolicy::Integer { scale } => {
                    let scaled = rhs * scale;
                    LoweredRow {
                        coeffs: row
                            .expr
                            .terms()
                            .map(|(v, c)| (v.index(), (c * scale).round()))
                            .filter(|(_, c)| *c != 0.0)
                            .collect(),
                        cmp,
                        rhs: match cmp {
                            Cmp::Ge => scaled.floor(),
                            Cmp::Le => scaled.ceil(),
                            Cmp::Eq => scaled.round(),
                        },
                    }
                }
            })
            .collect()
    }
}

/// `segments + 1` evenly spaced points across `[lower, upper]`.
fn breakpoints(lower: f64, upper: f64, segments: usize) -> Vec<f64> {
    if upper <= lower || segments == 0 {
        return vec![lower];
    }
    let step = (upper - lower) / segments as f64;
    (0..=segments).map(|i| lower + step * i as f64).collect()
}

/// [`breakpoints`] rounded to whole grams, duplicates dropped.
fn integer_breakpoints(lower: f64, upper: f64, segments: usize) -> Vec<f64> {
    let mut points: Vec<f64> = breakpoints(lower, upper, segments)
        .into_iter()
        .map(f64::round)
        .collect();
    points.dedup();
    points
}

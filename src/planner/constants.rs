/// Atwater energy factors (kcal per gram).
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

// ─────────────────────────────────────────────────────────────────────────────
// Integer-scaled regime
// ─────────────────────────────────────────────────────────────────────────────

/// Default row multiplier before coefficients are rounded to integers.
///
/// Each per-gram coefficient is off by at most `0.5 / scale` after rounding,
/// i.e. 0.5 units per kilogram of food at 1000.
pub const DEFAULT_SCALE: u32 = 1000;

/// Slack granted to hard rows in the integer regime, in natural units (g, kcal, mg).
///
/// Integer grams cannot always land on an exact macro target, so
/// `protein >= 10` lowers as `protein >= 9.5`. The continuous regime uses 0.
pub const HARD_ROW_EPSILON: f64 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Objective shaping
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound of every normalized deviation (percent or percentage points).
pub const PERCENT_SCALE: f64 = 100.0;

/// Weight of the upper-limit proximity minimax relative to the shortfall minimax
/// inside the micronutrient tier.
pub const PROXIMITY_WEIGHT: f64 = 0.1;

/// Smallest tier change, in percentage points, that must outweigh every tier
/// below it in the integer regime. The continuous regime uses 1.
///
/// Each chain step multiplies by `100 / resolution + 1`, so four tiers stay
/// near 7e4 instead of 1e6.
pub const INTEGER_TIER_RESOLUTION: f64 = 2.5;

/// Tangent cuts per ingredient used to lower a square constraint.
pub const DEFAULT_SQUARE_SEGMENTS: usize = 24;

/// Targets at or below this are considered already met.
pub const MIN_TARGET: f64 = 1e-9;

// ─────────────────────────────────────────────────────────────────────────────
// Solver adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Default wall-clock budget for a single solve.
pub const DEFAULT_TIME_BUDGET_MS: u64 = 2_000;

/// Values within this distance of a bound are snapped onto it when read back.
pub const READBACK_SNAP: f64 = 1e-6;

// ─────────────────────────────────────────────────────────────────────────────
// Display thresholds
// ─────────────────────────────────────────────────────────────────────────────

/// Ingredients below this many grams are shown as omitted.
pub const GRAMS_DISPLAY_THRESHOLD: f64 = 0.5;

/// Coverage percentages below this are flagged with `!` in the micronutrient table.
pub const LOW_COVERAGE_PERCENT: f64 = 50.0;

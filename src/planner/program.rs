//! Unit-agnostic linear program description.
//!
//! Everything upstream of the solver adapter builds one of these: named
//! bounded variables, linear expressions as coefficient maps, comparison rows
//! and square links. The scaling policy lowers it into a concrete numeric form.

use std::collections::BTreeMap;
use std::fmt;

/// Handle to a variable inside a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Ingredient portion in grams; integer in the integer regime.
    Grams,
    /// Deviation, minimax or square helper; always continuous.
    Auxiliary,
}

#[derive(Debug, Clone)]
pub struct VarSpec {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// Affine expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn var(var: VarId) -> Self {
        Self::new().with_term(var, 1.0)
    }

    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef == 0.0 {
            return;
        }
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coef;
        if *entry == 0.0 {
            self.terms.remove(&var);
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn add_expr(&mut self, other: &LinearExpr, factor: f64) {
        for (&var, &coef) in &other.terms {
            self.add_term(var, coef * factor);
        }
        self.constant += other.constant * factor;
    }

    pub fn plus(mut self, other: &LinearExpr) -> Self {
        self.add_expr(other, 1.0);
        self
    }

    pub fn minus(mut self, other: &LinearExpr) -> Self {
        self.add_expr(other, -1.0);
        self
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for coef in self.terms.values_mut() {
            *coef *= factor;
        }
        self.constant *= factor;
        self.terms.retain(|_, c| *c != 0.0);
        self
    }

    pub fn negated(self) -> Self {
        self.scaled(-1.0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value under a full assignment indexed by `VarId::index`.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    /// Interval `(min, max)` the expression can take within the variable bounds.
    pub fn range(&self, vars: &[VarSpec]) -> (f64, f64) {
        self.terms.iter().fold(
            (self.constant, self.constant),
            |(lo, hi), (var, &coef)| {
                let spec = &vars[var.index()];
                let (a, b) = (coef * spec.lower, coef * spec.upper);
                (lo + a.min(b), hi + a.max(b))
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Ge,
    Le,
    Eq,
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cmp::Ge => ">=",
            Cmp::Le => "<=",
            Cmp::Eq => "==",
        })
    }
}

/// Whether a row is a user-facing requirement or defines an auxiliary variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    /// Must hold in any returned solution; the integer regime grants it an epsilon.
    Hard,
    /// Ties an auxiliary variable to the decision variables.
    Definition,
}

/// `expr cmp rhs`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub label: String,
    pub expr: LinearExpr,
    pub cmp: Cmp,
    pub rhs: f64,
    pub role: RowRole,
}

impl LinearConstraint {
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.cmp {
            Cmp::Ge => lhs >= self.rhs - tolerance,
            Cmp::Le => lhs <= self.rhs + tolerance,
            Cmp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// `square == of²`, one multiplication link per ingredient.
#[derive(Debug, Clone)]
pub struct SquareConstraint {
    pub label: String,
    pub square: VarId,
    pub of: VarId,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    vars: Vec<VarSpec>,
    constraints: Vec<LinearConstraint>,
    squares: Vec<SquareConstraint>,
    objective: LinearExpr,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, lower: f64, upper: f64, kind: VarKind) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarSpec {
            name: name.into(),
            lower,
            upper: upper.max(lower),
            kind,
        });
        id
    }

    pub fn require(
        &mut self,
        label: impl Into<String>,
        expr: LinearExpr,
        cmp: Cmp,
        rhs: f64,
        role: RowRole,
    ) {
        self.constraints.push(LinearConstraint {
            label: label.into(),
            expr,
            cmp,
            rhs,
            role,
        });
    }

    pub fn add_square(&mut self, label: impl Into<String>, square: VarId, of: VarId) {
        self.squares.push(SquareConstraint {
            label: label.into(),
            square,
            of,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn var(&self, id: VarId) -> &VarSpec {
        &self.vars[id.index()]
    }

    pub fn vars(&self) -> &[VarSpec] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn squares(&self) -> &[SquareConstraint] {
        &self.squares
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn range(&self, expr: &LinearExpr) -> (f64, f64) {
        expr.range(&self.vars)
    }

    /// Rows violated by an assignment, for diagnostics and tests.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied_by(values, tolerance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_arithmetic_merges_terms() {
        let mut p = Program::new();
        let x = p.add_var("x", 0.0, 10.0, VarKind::Grams);
        let y = p.add_var("y", 0.0, 5.0, VarKind::Grams);

        let a = LinearExpr::var(x).with_term(y, 2.0);
        let b = LinearExpr::var(x).with_term(y, 2.0);
        let diff = a.minus(&b);
        assert!(diff.is_empty());

        let mut c = LinearExpr::constant(3.0).with_term(x, 1.5);
        c.add_term(x, -1.5);
        assert!(c.is_empty());
        assert_eq!(c.constant_term(), 3.0);
    }

    #[test]
    fn test_range_respects_coefficient_sign() {
        let mut p = Program::new();
        let x = p.add_var("x", 1.0, 4.0, VarKind::Grams);
        let y = p.add_var("y", 0.0, 2.0, VarKind::Grams);

        // 2x - 3y + 1 over x in [1,4], y in [0,2]
        let e = LinearExpr::constant(1.0).with_term(x, 2.0).with_term(y, -3.0);
        assert_eq!(p.range(&e), (-3.0, 9.0));
    }

    #[test]
    fn test_evaluate_and_satisfaction() {
        let mut p = Program::new();
        let x = p.add_var("x", 0.0, 10.0, VarKind::Grams);
        p.require("x floor", LinearExpr::var(x), Cmp::Ge, 4.0, RowRole::Hard);

        assert!(p.violations(&[4.0], 1e-9).is_empty());
        assert_eq!(p.violations(&[3.9], 1e-9).len(), 1);
        assert!(p.violations(&[3.9], 0.2).is_empty());
    }

    #[test]
    fn test_add_var_never_inverts_bounds() {
        let mut p = Program::new();
        let x = p.add_var("x", 5.0, 2.0, VarKind::Auxiliary);
        assert_eq!(p.var(x).upper, 5.0);
    }
}

//! Solver-independent linear program representation.
//!
//! Model builders describe their LP with [`LpModel`]: named variables with
//! bounds, named linear constraints with an operator and a scalar right-hand
//! side, and one linear objective. An [`LpBackend`](super::LpBackend) turns
//! the model into a concrete solver call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle to a variable declared in an [`LpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpVariable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

/// Σ coefficient·variable + constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add_term`](Self::add_term).
    pub fn term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.0])
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub cmp: Comparison,
    pub rhs: f64,
}

impl LpConstraint {
    /// Amount by which `values` violate this constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.cmp {
            Comparison::Le => (lhs - self.rhs).max(0.0),
            Comparison::Ge => (self.rhs - lhs).max(0.0),
            Comparison::Eq => (lhs - self.rhs).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

/// How a two-sided balance `expr = rhs` reaches the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqualityEncoding {
    /// A `>=` and a `<=` row on the same expression.
    #[default]
    OpposedInequalities,
    /// A single `==` row.
    Native,
}

impl EqualityEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            EqualityEncoding::OpposedInequalities => "opposed-inequalities",
            EqualityEncoding::Native => "native",
        }
    }
}

impl FromStr for EqualityEncoding {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "opposed-inequalities" | "opposed" | "inequalities" => {
                Ok(EqualityEncoding::OpposedInequalities)
            }
            "native" | "equality" => Ok(EqualityEncoding::Native),
            other => Err(anyhow::anyhow!(
                "unknown equality encoding '{}'; supported values: opposed-inequalities, native",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LpModel {
    name: String,
    variables: Vec<LpVariable>,
    constraints: Vec<LpConstraint>,
    objective: LinearExpr,
    sense: Sense,
}

impl LpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a variable; use `f64::INFINITY` for an open upper bound.
    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(LpVariable {
            name: name.into(),
            lower,
            upper,
        });
        id
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        cmp: Comparison,
        rhs: f64,
    ) {
        self.constraints.push(LpConstraint {
            name: name.into(),
            expr,
            cmp,
            rhs,
        });
    }

    /// Add `expr = rhs` using the requested encoding. Opposed inequalities are
    /// named `<name>_ge` and `<name>_le`.
    pub fn add_balance(
        &mut self,
        name: &str,
        expr: LinearExpr,
        rhs: f64,
        encoding: EqualityEncoding,
    ) {
        match encoding {
            EqualityEncoding::OpposedInequalities => {
                self.add_constraint(format!("{name}_ge"), expr.clone(), Comparison::Ge, rhs);
                self.add_constraint(format!("{name}_le"), expr, Comparison::Le, rhs);
            }
            EqualityEncoding::Native => self.add_constraint(name, expr, Comparison::Eq, rhs),
        }
    }

    pub fn set_objective(&mut self, sense: Sense, expr: LinearExpr) {
        self.sense = sense;
        self.objective = expr;
    }

    pub fn variables(&self) -> &[LpVariable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &LpVariable {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[LpConstraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&LpConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Largest constraint or bound violation of a candidate point.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let rows = self
            .constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0, f64::max);
        let bounds = self
            .variables
            .iter()
            .zip(values)
            .map(|(v, x)| (v.lower - x).max(x - v.upper).max(0.0))
            .fold(0.0, f64::max);
        rows.max(bounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// Proven optimal.
    Optimal,
    /// Feasible point returned without an optimality certificate.
    Feasible,
}

impl LpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LpStatus::Optimal => "OPTIMAL",
            LpStatus::Feasible => "FEASIBLE",
        }
    }
}

/// Successful solve. Failures are reported as `AgroError` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub status: LpStatus,
    pub values: Vec<f64>,
    pub objective_value: f64,
}

impl LpSolution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }
}

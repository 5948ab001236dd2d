//! LP backends built on `good_lp`.
//!
//! The microlp simplex is always compiled and is the default: it returns a
//! vertex optimum even when the optimal face is unbounded in zero-cost
//! directions. Clarabel and HiGHS are opt-in through crate features.

use super::model::{Comparison, LinearExpr, LpModel, LpSolution, LpStatus, Sense};
use agro_core::{AgroError, AgroResult};
use anyhow::anyhow;
#[cfg(feature = "solver-clarabel")]
use good_lp::solvers::clarabel::clarabel as clarabel_solver;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as highs_solver;
use good_lp::solvers::microlp::microlp as microlp_solver;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// Anything that can solve an [`LpModel`].
pub trait LpBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve the model. Infeasible and unbounded problems come back as
    /// [`AgroError::Infeasible`] / [`AgroError::Unbounded`].
    fn solve(&self, model: &LpModel) -> AgroResult<LpSolution>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LpSolverKind {
    #[default]
    Microlp,
    #[cfg(feature = "solver-clarabel")]
    Clarabel,
    #[cfg(feature = "solver-highs")]
    Highs,
}

impl LpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_LP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LpSolverKind::Microlp => "microlp",
            #[cfg(feature = "solver-clarabel")]
            LpSolverKind::Clarabel => "clarabel",
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => "highs",
        }
    }
}

const AVAILABLE_LP_SOLVERS: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-clarabel")]
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

fn unknown_solver_error(label: &str) -> anyhow::Error {
    anyhow!(
        "unknown lp solver '{}'; supported values: {}",
        label,
        LpSolverKind::available().join(", ")
    )
}

impl FromStr for LpSolverKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" | "simplex" | "default" => Ok(LpSolverKind::Microlp),
            "clarabel" => {
                #[cfg(feature = "solver-clarabel")]
                {
                    Ok(LpSolverKind::Clarabel)
                }
                #[cfg(not(feature = "solver-clarabel"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(LpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

impl LpBackend for LpSolverKind {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn solve(&self, model: &LpModel) -> AgroResult<LpSolution> {
        let start = Instant::now();

        let mut vars = variables!();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|v| {
                let mut definition = variable().name(v.name.clone());
                if v.lower.is_finite() {
                    definition = definition.min(v.lower);
                }
                if v.upper.is_finite() {
                    definition = definition.max(v.upper);
                }
                vars.add(definition)
            })
            .collect();

        let objective = to_expression(model.objective(), &handles);
        let unsolved = match model.sense() {
            Sense::Minimize => vars.minimise(objective),
            Sense::Maximize => vars.maximise(objective),
        };

        let values = match self {
            LpSolverKind::Microlp => solve_with(unsolved.using(microlp_solver), model, &handles),
            #[cfg(feature = "solver-clarabel")]
            LpSolverKind::Clarabel => {
                solve_with(unsolved.using(clarabel_solver), model, &handles)
            }
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => solve_with(unsolved.using(highs_solver), model, &handles),
        }?;

        let objective_value = model.objective().evaluate(&values);
        debug!(
            model = model.name(),
            backend = self.as_str(),
            variables = model.num_variables(),
            constraints = model.constraints().len(),
            objective = objective_value,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "LP solved"
        );
        Ok(LpSolution {
            status: LpStatus::Optimal,
            values,
            objective_value,
        })
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant());
    for (var, coefficient) in expr.terms() {
        out += *coefficient * handles[var.index()];
    }
    out
}

fn solve_with<M>(mut problem: M, model: &LpModel, handles: &[Variable]) -> AgroResult<Vec<f64>>
where
    M: SolverModel<Error = ResolutionError>,
{
    for row in model.constraints() {
        let lhs = to_expression(&row.expr, handles);
        let rhs = row.rhs;
        problem = match row.cmp {
            Comparison::Le => problem.with(constraint!(lhs <= rhs)),
            Comparison::Ge => problem.with(constraint!(lhs >= rhs)),
            Comparison::Eq => problem.with(constraint!(lhs == rhs)),
        };
    }
    let solution = problem
        .solve()
        .map_err(|err| resolution_error(err, model.name()))?;
    Ok(handles.iter().map(|var| solution.value(*var)).collect())
}

fn resolution_error(err: ResolutionError, model: &str) -> AgroError {
    match err {
        ResolutionError::Infeasible => {
            AgroError::Infeasible(format!("LP '{model}' has no feasible solution"))
        }
        ResolutionError::Unbounded => {
            AgroError::Unbounded(format!("LP '{model}' objective is unbounded"))
        }
        other => AgroError::Solver(format!("LP '{model}' failed: {other}")),
    }
}

//! Nonlinear programming: problem contract and solver backends.
//!
//! The only backend shipped is [`PenaltyLbfgs`], an exterior-penalty method
//! with an L-BFGS inner solve. Anything implementing [`NlpBackend`] can stand
//! in for it.

pub mod penalty;
pub mod problem;

pub use penalty::PenaltyLbfgs;
pub use problem::{
    ConstraintKind, ConstraintSpec, GradientMode, NlpOutcome, NlpProblem, NlpStatus,
};

use agro_core::AgroResult;
use serde::{Deserialize, Serialize};

/// A constrained NLP solver.
///
/// Non-convergence is not an error at this level: the outcome carries a
/// [`NlpStatus`] and callers decide what to do with an unconverged point.
pub trait NlpBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &dyn NlpProblem) -> AgroResult<NlpOutcome>;
}

/// Penalty/L-BFGS settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpSolverConfig {
    /// L-BFGS iterations, split evenly across penalty rounds
    pub max_iterations: usize,
    /// Feasibility tolerance; a point is accepted within 10× this value
    pub tolerance: f64,
    pub gradient: GradientMode,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub penalty_rounds: usize,
}

impl Default for NlpSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            gradient: GradientMode::Numerical,
            initial_penalty: 1000.0,
            penalty_growth: 10.0,
            penalty_rounds: 5,
        }
    }
}

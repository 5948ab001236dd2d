//! Unified error type for the agroplan workspace
//!
//! Model builders and solver backends report every failure through
//! [`AgroError`]. Infeasibility and non-convergence are distinct variants so
//! callers (the sweep runner, the CLI) can record them per scenario instead of
//! treating them as generic solver failures.
//!
//! # Example
//!
//! ```ignore
//! use agro_core::{AgroError, AgroResult};
//!
//! fn run_scenario(params: &BmpParameters) -> AgroResult<ProductionRecord> {
//!     let model = AllocationModel::build(params, scenario, &options)?;
//!     model.solve(&backend)
//! }
//! ```

use thiserror::Error;

/// Unified error type for all agroplan operations.
#[derive(Error, Debug)]
pub enum AgroError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input tables are inconsistent (missing keys, mismatched shapes)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The declared constraint set admits no feasible point
    #[error("Model infeasible: {0}")]
    Infeasible(String),

    /// The objective is unbounded over the feasible set
    #[error("Model unbounded: {0}")]
    Unbounded(String),

    /// Iterative solver stopped without meeting its convergence test
    #[error("Solver failed to converge after {iterations} iterations (max violation: {max_violation:.2e})")]
    NotConverged { iterations: usize, max_violation: f64 },

    /// Any other solver failure (numerical trouble, unsupported backend)
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl AgroError {
    /// Short tag used in run manifests and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AgroError::Io(_) => "io",
            AgroError::Parse(_) => "parse",
            AgroError::Validation(_) => "validation",
            AgroError::Infeasible(_) => "infeasible",
            AgroError::Unbounded(_) => "unbounded",
            AgroError::NotConverged { .. } => "not-converged",
            AgroError::Solver(_) => "solver",
            AgroError::Config(_) => "config",
            AgroError::Other(_) => "other",
        }
    }
}

/// Convenience type alias for Results using AgroError.
pub type AgroResult<T> = Result<T, AgroError>;

impl From<anyhow::Error> for AgroError {
    fn from(err: anyhow::Error) -> Self {
        AgroError::Other(err.to_string())
    }
}

impl From<String> for AgroError {
    fn from(s: String) -> Self {
        AgroError::Other(s)
    }
}

impl From<&str> for AgroError {
    fn from(s: &str) -> Self {
        AgroError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for AgroError {
    fn from(err: serde_json::Error) -> Self {
        AgroError::Parse(err.to_string())
    }
}

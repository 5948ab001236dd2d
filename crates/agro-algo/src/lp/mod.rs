//! Linear programming: model IR and solver backends.

pub mod backend;
pub mod model;

pub use backend::{LpBackend, LpSolverKind};
pub use model::{
    Comparison, EqualityEncoding, LinearExpr, LpConstraint, LpModel, LpSolution, LpStatus,
    LpVariable, Sense, VarId,
};

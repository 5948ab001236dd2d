//! # agro-algo: optimisation models for farm planning and nutrient reduction
//!
//! | Model | Entry point | Problem class |
//! |-------|-------------|---------------|
//! | Farm goal programming | [`solve_goal_program`] | Linear |
//! | BMP land allocation | [`solve_allocation`] | Linear |
//! | Price-responsive BMP allocation | [`solve_price_responsive`] | Nonlinear |
//!
//! ## Architecture
//!
//! - **[`lp::LpModel`]**: solver-agnostic linear model (what to solve)
//! - **[`lp::LpBackend`]** / **[`nlp::NlpBackend`]**: solver algorithms (how to solve it)
//! - **[`SolverDispatcher`]**: picks a backend per problem class
//!
//! ## Example
//!
//! ```ignore
//! use agro_algo::{solve_goal_program, GoalProgrammingOptions, SolverDispatcher};
//! use agro_core::GoalParameters;
//!
//! let backend = SolverDispatcher::new().lp_backend();
//! let solution = solve_goal_program(
//!     &GoalParameters::ireland(),
//!     backend.as_ref(),
//!     GoalProgrammingOptions::default(),
//! )?;
//! println!("{}", solution.report());
//! ```

pub mod allocation;
pub mod dispatch;
pub mod goal_programming;
pub mod lp;
pub mod nlp;
pub mod price_responsive;

pub use allocation::{solve_allocation, AllocationModel, AllocationOptions, AllocationSolution};
pub use dispatch::{DispatchConfig, ProblemClass, SolverBackend, SolverDispatcher};
pub use goal_programming::{
    solve_goal_program, Deviation, GoalModel, GoalProgrammingOptions, GoalSolution, ACTIVITIES,
};
pub use lp::{EqualityEncoding, LpBackend, LpModel, LpSolution, LpSolverKind, LpStatus};
pub use nlp::{GradientMode, NlpBackend, NlpOutcome, NlpProblem, NlpSolverConfig, PenaltyLbfgs};
pub use price_responsive::{
    format_processing_time, solve_price_responsive, DecisionVector, PriceResponsiveOptions,
    PriceResponsiveProblem, PriceResponsiveResult, VariableLayout,
};

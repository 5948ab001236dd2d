//! # agro-core: data model for agricultural land-use optimization
//!
//! Shared types used by the model builders in `agro-algo`, the sweep runner
//! in `agro-batch` and the table readers/writers in `agro-io`:
//!
//! - [`BmpParameters`]: validated, immutable crop coefficients and baseline
//!   allocation for the best-management-practice models
//! - [`GoalParameters`]: coefficients, targets and weights of the farm
//!   goal-programming model
//! - [`Scenario`]: one (capP, capN) policy point
//! - [`AllocationMatrix`]: fixed-shape subdivision × crop container
//! - [`ResultRecord`] / [`ProductionRecord`]: solved outputs
//! - [`AgroError`]: the workspace error type

pub mod error;
pub mod goal;
pub mod matrix;
pub mod params;
pub mod record;
pub mod scenario;

pub use error::{AgroError, AgroResult};
pub use goal::{ActivityCoefficients, GoalCoefficients, GoalParameters, GoalTargets, GoalWeights};
pub use matrix::AllocationMatrix;
pub use params::{BaselineLoads, BaselineTable, BmpParameters, CropCoefficients, UnitScaling};
pub use record::{ProductionRecord, ResultEntry, ResultRecord};
pub use scenario::{AllowedLoads, Scenario};

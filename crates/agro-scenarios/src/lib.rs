pub mod grid;
pub mod spec;

pub use grid::{axis_values, resolve_grid};
pub use spec::{load_spec_from_path, validate, CapRange, SweepSpec, MIN_STEP};

//! # agro-io: input tables and result files
//!
//! - [`tables`]: crop coefficient and baseline area CSV readers
//! - [`export`]: production, price, allocation and goal result writers
//! - [`goal`]: goal-programming parameter files

pub mod export;
pub mod goal;
pub mod tables;

pub use export::{
    price_responsive_paths, write_allocation_table, write_crop_series,
    write_price_responsive_tables, write_result_record_csv, write_result_record_json,
    ProductionTable, BASE_COLUMN, PRODUCTION_TABLE_FILE,
};
pub use goal::{load_goal_parameters, load_goal_weights};
pub use tables::{load_bmp_parameters, read_baseline_table, read_crop_table, GEOGRAPHY_COLUMN};

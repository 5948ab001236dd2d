pub mod job;
pub mod manifest;
pub mod runner;

pub use job::{jobs_from_scenarios, jobs_from_spec, SweepJob, SweepJobRecord, TaskKind};
pub use manifest::{load_sweep_manifest, write_sweep_manifest, SweepManifest, MANIFEST_FILE};
pub use runner::{run_sweep, SweepRunnerConfig, SweepSummary};

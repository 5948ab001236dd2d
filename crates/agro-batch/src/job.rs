use agro_core::Scenario;
use agro_scenarios::{resolve_grid, SweepSpec};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Which BMP model a sweep solves per scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Linear allocation LP
    BmpLinear,
    /// Price-responsive allocation NLP
    BmpPrice,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::BmpLinear => "bmp-linear",
            TaskKind::BmpPrice => "bmp-price",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepJob {
    pub job_id: String,
    pub scenario: Scenario,
}

/// Outcome of one job as stored in the run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepJobRecord {
    pub job_id: String,
    pub scenario_id: String,
    pub cap_p: f64,
    pub cap_n: f64,
    /// `ok` or `error`
    pub status: String,
    /// Error tag such as `infeasible` or `not-converged`
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub objective: Option<f64>,
    pub elapsed_ms: u64,
}

impl SweepJobRecord {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

pub fn jobs_from_scenarios(scenarios: &[Scenario], task: TaskKind) -> Vec<SweepJob> {
    scenarios
        .iter()
        .map(|scenario| SweepJob {
            job_id: format!("{}:{}", task.as_str(), scenario.name()),
            scenario: *scenario,
        })
        .collect()
}

pub fn jobs_from_spec(spec: &SweepSpec, task: TaskKind) -> Result<Vec<SweepJob>> {
    Ok(jobs_from_scenarios(&resolve_grid(spec)?, task))
}

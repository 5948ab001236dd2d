//! Policy scenarios: one (phosphorus, nitrogen) reduction pair per point of a
//! sweep.

use crate::params::BaselineLoads;
use crate::{AgroError, AgroResult};
use serde::{Deserialize, Serialize};

/// Reduction fractions applied to baseline P and N export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Fraction of baseline P export to cut, in [0, 1]
    pub cap_p: f64,
    /// Fraction of baseline N export to cut, in [0, 1]
    pub cap_n: f64,
}

impl Scenario {
    pub fn new(cap_p: f64, cap_n: f64) -> AgroResult<Self> {
        for (label, cap) in [("capP", cap_p), ("capN", cap_n)] {
            if !cap.is_finite() || !(0.0..=1.0).contains(&cap) {
                return Err(AgroError::Validation(format!(
                    "{label} must be a fraction in [0, 1], got {cap}"
                )));
            }
        }
        Ok(Self { cap_p, cap_n })
    }

    /// No reduction at all.
    pub fn baseline() -> Self {
        Self {
            cap_p: 0.0,
            cap_n: 0.0,
        }
    }

    /// Scenario label with both percentages zero-padded to two digits,
    /// e.g. `P10N04`.
    pub fn name(&self) -> String {
        format!(
            "P{:02}N{:02}",
            percent(self.cap_p),
            percent(self.cap_n)
        )
    }

    /// Caps derived from the baseline loads.
    pub fn allowed(&self, baseline: &BaselineLoads) -> AllowedLoads {
        AllowedLoads {
            phosphorus: (1.0 - self.cap_p) * baseline.phosphorus,
            nitrogen: (1.0 - self.cap_n) * baseline.nitrogen,
            water: baseline.water,
        }
    }
}

fn percent(cap: f64) -> u32 {
    (cap * 100.0).round() as u32
}

/// Right-hand sides of the runoff and water constraints for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllowedLoads {
    pub phosphorus: f64,
    pub nitrogen: f64,
    pub water: f64,
}

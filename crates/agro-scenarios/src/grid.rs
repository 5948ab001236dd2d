//! Scenario grid resolution.
//!
//! Values are generated from integer step counts and rounded to three
//! decimals, so 0.02·k lands on the intended grid point. Scenarios are ordered
//! with capN as the outer loop and capP as the inner loop.

use crate::spec::{validate, CapRange, SweepSpec};
use agro_core::Scenario;
use anyhow::{anyhow, Result};
use std::collections::HashSet;

/// Tolerance when counting how many steps fit between start and stop.
const STEP_SLACK: f64 = 1e-9;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Points of one axis, start and stop included. Call on a validated range;
/// [`resolve_grid`] validates before expanding.
pub fn axis_values(range: &CapRange) -> Vec<f64> {
    let steps = ((range.stop - range.start) / range.step + STEP_SLACK).floor() as usize;
    (0..=steps)
        .map(|i| round3(range.start + i as f64 * range.step))
        .collect()
}

/// Every (capP, capN) pair of the sweep. Steps finer than one percent are
/// rejected before any axis is expanded.
pub fn resolve_grid(spec: &SweepSpec) -> Result<Vec<Scenario>> {
    validate(spec)?;
    let p_values = axis_values(&spec.cap_p);
    let n_values = axis_values(&spec.cap_n);

    let mut scenarios = Vec::with_capacity(p_values.len() * n_values.len());
    let mut names = HashSet::new();
    for &cap_n in &n_values {
        for &cap_p in &p_values {
            let scenario = Scenario::new(cap_p, cap_n)?;
            if !names.insert(scenario.name()) {
                return Err(anyhow!(
                    "scenario label '{}' repeats; grid steps must be at least 0.01",
                    scenario.name()
                ));
            }
            scenarios.push(scenario);
        }
    }
    Ok(scenarios)
}

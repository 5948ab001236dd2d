//! Goal-programming parameter files (YAML, JSON or TOML by extension).

use agro_core::{GoalParameters, GoalWeights};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

fn load_structured<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {} '{}'", what, path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).with_context(|| format!("parsing {what} yaml"))
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).with_context(|| format!("parsing {what} json"))
        }
        Some(ext) if ext.eq_ignore_ascii_case("toml") => {
            toml::from_str(&data).with_context(|| format!("parsing {what} toml"))
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .with_context(|| format!("parsing {what}")),
    }
}

/// Full farm model input: coefficients, targets and (optionally) weights.
pub fn load_goal_parameters(path: &Path) -> Result<GoalParameters> {
    load_structured(path, "goal parameters")
}

/// Weight set keyed by `Deficit_*` / `Exceed_*` labels.
pub fn load_goal_weights(path: &Path) -> Result<GoalWeights> {
    load_structured(path, "goal weights")
}

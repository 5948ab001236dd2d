use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::Path;

use crate::job::SweepJobRecord;

/// File name of the run manifest inside the output directory.
pub const MANIFEST_FILE: &str = "sweep_manifest.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepManifest {
    pub created_at: DateTime<Utc>,
    pub task: String,
    pub backend: String,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub jobs: Vec<SweepJobRecord>,
    /// Tables written by the run, relative to the output directory
    #[serde(default)]
    pub outputs: Vec<String>,
}

pub fn write_sweep_manifest(path: &Path, manifest: &SweepManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(manifest).context("serializing sweep manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing sweep manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_sweep_manifest(path: &Path) -> Result<SweepManifest> {
    let file = File::open(path)
        .with_context(|| format!("opening sweep manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing sweep manifest '{}'", path.display()))
}

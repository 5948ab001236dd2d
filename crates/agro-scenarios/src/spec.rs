use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Finest grid step: scenario labels carry whole percentages.
pub const MIN_STEP: f64 = 0.01;

/// Inclusive range of reduction fractions, `start, start + step, …, stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapRange {
    #[serde(default)]
    pub start: f64,
    #[serde(default = "default_stop")]
    pub stop: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_stop() -> f64 {
    0.5
}

fn default_step() -> f64 {
    0.02
}

impl Default for CapRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: default_stop(),
            step: default_step(),
        }
    }
}

impl CapRange {
    /// A single value.
    pub fn fixed(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: default_step(),
        }
    }

    pub fn with_step(self, step: f64) -> Self {
        Self { step, ..self }
    }
}

/// capP × capN sweep. Both axes default to 0.00..=0.50 in steps of 0.02.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub description: Option<String>,
    #[serde(default)]
    pub cap_p: CapRange,
    #[serde(default)]
    pub cap_n: CapRange,
}

pub fn load_spec_from_path(path: &Path) -> Result<SweepSpec> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading sweep spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing sweep spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing sweep spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing sweep spec"),
    }
}

pub fn validate(spec: &SweepSpec) -> Result<()> {
    for (axis, range) in [("cap_p", &spec.cap_p), ("cap_n", &spec.cap_n)] {
        let CapRange { start, stop, step } = *range;
        if ![start, stop, step].iter().all(|v| v.is_finite()) {
            return Err(anyhow!("{axis}: range values must be finite"));
        }
        if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&stop) {
            return Err(anyhow!(
                "{axis}: reductions must lie in [0, 1], got {start}..={stop}"
            ));
        }
        if start > stop {
            return Err(anyhow!("{axis}: start {start} is above stop {stop}"));
        }
        if step <= 0.0 {
            return Err(anyhow!("{axis}: step must be positive, got {step}"));
        }
        if step < MIN_STEP - 1e-12 {
            return Err(anyhow!(
                "{axis}: step {step} is finer than {MIN_STEP}; scenario labels would repeat"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn missing_axes_take_the_default_grid() {
        let spec: SweepSpec = serde_yaml::from_str("cap_p: { stop: 0.2 }").unwrap();
        assert_eq!(spec.cap_n, CapRange::default());
        assert_eq!(spec.cap_p.start, 0.0);
        assert_eq!(spec.cap_p.stop, 0.2);
        assert_eq!(spec.cap_p.step, 0.02);
    }

    #[test]
    fn json_spec_loads_by_extension() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"description": "P only", "cap_p": {{"start": 0.1, "stop": 0.3, "step": 0.1}}, "cap_n": {{"start": 0.0, "stop": 0.0, "step": 0.1}}}}"#
        )
        .unwrap();
        let spec = load_spec_from_path(file.path()).unwrap();
        assert_eq!(spec.description.as_deref(), Some("P only"));
        assert_eq!(spec.cap_n, CapRange::fixed(0.0).with_step(0.1));
    }

    #[test]
    fn inverted_or_out_of_range_axes_are_rejected() {
        let mut spec = SweepSpec::default();
        spec.cap_p.start = 0.4;
        spec.cap_p.stop = 0.2;
        assert!(validate(&spec).is_err());

        let mut spec = SweepSpec::default();
        spec.cap_n.stop = 1.5;
        assert!(validate(&spec).is_err());

        let mut spec = SweepSpec::default();
        spec.cap_n.step = 0.0;
        assert!(validate(&spec).is_err());

        assert!(validate(&SweepSpec::default()).is_ok());
    }

    #[test]
    fn sub_percent_step_fails_validation() {
        let mut spec = SweepSpec::default();
        spec.cap_p.step = 1e-12;
        let err = validate(&spec).unwrap_err();
        assert!(err.to_string().contains("finer than 0.01"), "{err}");

        spec.cap_p.step = MIN_STEP;
        assert!(validate(&spec).is_ok());
    }
}

//! `agroplan.toml`: solver, model and logging defaults for every command.
//! Command-line flags override what is set here.

use agro_algo::{
    AllocationOptions, EqualityEncoding, GradientMode, LpSolverKind, NlpSolverConfig,
    PriceResponsiveOptions,
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE: &str = "agroplan.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AgroConfig {
    #[serde(default)]
    pub solvers: SolverConfig,
    #[serde(default)]
    pub bmp: BmpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// Backend for LP models: microlp, clarabel, highs
    #[serde(default = "default_lp_solver")]
    pub lp: String,
    /// L-BFGS iterations for the price-responsive model
    #[serde(default = "default_max_iterations")]
    pub nlp_max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub nlp_tolerance: f64,
    #[serde(default)]
    pub gradient: GradientMode,
    #[serde(default)]
    pub encoding: EqualityEncoding,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lp: default_lp_solver(),
            nlp_max_iterations: default_max_iterations(),
            nlp_tolerance: default_tolerance(),
            gradient: GradientMode::default(),
            encoding: EqualityEncoding::default(),
        }
    }
}

fn default_lp_solver() -> String {
    "microlp".to_string()
}

fn default_max_iterations() -> usize {
    1000
}

fn default_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BmpConfig {
    #[serde(default = "default_min_ratio")]
    pub min_production_ratio: f64,
    #[serde(default = "default_max_ratio")]
    pub max_production_ratio: f64,
    #[serde(default = "default_elasticity")]
    pub elasticity: f64,
    #[serde(default)]
    pub water_available: bool,
    #[serde(default)]
    pub water_cost: f64,
}

impl Default for BmpConfig {
    fn default() -> Self {
        Self {
            min_production_ratio: default_min_ratio(),
            max_production_ratio: default_max_ratio(),
            elasticity: default_elasticity(),
            water_available: false,
            water_cost: 0.0,
        }
    }
}

fn default_min_ratio() -> f64 {
    0.5
}

fn default_max_ratio() -> f64 {
    1.5
}

fn default_elasticity() -> f64 {
    -0.2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Directory for result tables and run manifests
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

/// Read `path`, or `agroplan.toml` from the working directory when `path` is
/// `None`. A missing default file yields the built-in defaults; a missing
/// explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<AgroConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            if !default.exists() {
                return Ok(AgroConfig::default());
            }
            default
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file '{}'", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file '{}'", path.display()))
}

impl AgroConfig {
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}' in config", self.logging.level))
    }

    /// `flag` when given, otherwise `[solvers] lp`.
    pub fn lp_solver(&self, flag: Option<&str>) -> Result<LpSolverKind> {
        flag.unwrap_or(&self.solvers.lp).parse()
    }

    pub fn encoding(&self, flag: Option<&str>) -> Result<EqualityEncoding> {
        match flag {
            Some(value) => value.parse(),
            None => Ok(self.solvers.encoding),
        }
    }

    pub fn allocation_options(&self) -> AllocationOptions {
        AllocationOptions {
            min_production_ratio: self.bmp.min_production_ratio,
            max_production_ratio: self.bmp.max_production_ratio,
            water_available: self.bmp.water_available,
            water_cost: self.bmp.water_cost,
            encoding: self.solvers.encoding,
            keep_allocation: false,
        }
    }

    pub fn price_options(&self) -> PriceResponsiveOptions {
        PriceResponsiveOptions {
            min_production_ratio: self.bmp.min_production_ratio,
            max_production_ratio: self.bmp.max_production_ratio,
            elasticity: self.bmp.elasticity,
        }
    }

    pub fn nlp_config(&self, gradient: Option<&str>, max_iter: Option<usize>) -> Result<NlpSolverConfig> {
        let gradient = match gradient {
            Some(value) => value.parse()?,
            None => self.solvers.gradient,
        };
        Ok(NlpSolverConfig {
            max_iterations: max_iter.unwrap_or(self.solvers.nlp_max_iterations),
            tolerance: self.solvers.nlp_tolerance,
            gradient,
            ..NlpSolverConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AgroConfig = toml::from_str("").unwrap();
        assert_eq!(config, AgroConfig::default());
        assert_eq!(config.allocation_options(), AllocationOptions::default());
        assert_eq!(config.price_options(), PriceResponsiveOptions::default());
        assert_eq!(config.nlp_config(None, None).unwrap(), NlpSolverConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config: AgroConfig = toml::from_str(
            r#"
[solvers]
gradient = "analytic"
encoding = "native"
nlp_max_iterations = 250

[bmp]
water_available = true
water_cost = -0.3

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.solvers.lp, "microlp");
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);

        let allocation = config.allocation_options();
        assert!(allocation.water_available);
        assert_eq!(allocation.water_cost, -0.3);
        assert_eq!(allocation.encoding, EqualityEncoding::Native);
        assert_eq!(allocation.min_production_ratio, 0.5);

        let nlp = config.nlp_config(None, None).unwrap();
        assert_eq!(nlp.gradient, GradientMode::Analytic);
        assert_eq!(nlp.max_iterations, 250);
        assert_eq!(config.nlp_config(Some("numerical"), Some(10)).unwrap().max_iterations, 10);
    }

    #[test]
    fn flags_take_precedence() {
        let config = AgroConfig::default();
        assert_eq!(config.lp_solver(None).unwrap(), LpSolverKind::Microlp);
        assert_eq!(
            config.encoding(Some("native")).unwrap(),
            EqualityEncoding::Native
        );
        assert!(config.lp_solver(Some("cplex")).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[output]\ndir = \"results\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("results"));
    }
}

//! Nonlinear program contract.
//!
//! A problem exposes a flat decision vector, box bounds, a scalar objective to
//! minimise, an optional analytic gradient and a list of tagged constraint
//! blocks. Inequality blocks are satisfied when every component is `>= 0`,
//! equality blocks when every component is `0`.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Equality,
    /// `g(x) >= 0`
    Inequality,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec {
    pub name: String,
    pub kind: ConstraintKind,
}

impl ConstraintSpec {
    pub fn equality(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Equality,
        }
    }

    pub fn inequality(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Inequality,
        }
    }
}

pub trait NlpProblem: Sync {
    fn dimension(&self) -> usize;

    fn initial_point(&self) -> Vec<f64>;

    /// Per-component `(lower, upper)`; infinite entries are open.
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Objective to minimise.
    fn objective(&self, x: &[f64]) -> f64;

    /// Analytic objective gradient, if the problem has one.
    fn gradient(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }

    fn constraints(&self) -> &[ConstraintSpec];

    /// Values of the constraint block at `index` in [`constraints`](Self::constraints).
    fn evaluate_constraint(&self, index: usize, x: &[f64]) -> Vec<f64>;

    /// Largest violation over every constraint block and the bounds.
    fn max_violation(&self, x: &[f64]) -> f64 {
        let mut worst: f64 = 0.0;
        for (index, spec) in self.constraints().iter().enumerate() {
            for value in self.evaluate_constraint(index, x) {
                let violation = match spec.kind {
                    ConstraintKind::Equality => value.abs(),
                    ConstraintKind::Inequality => (-value).max(0.0),
                };
                worst = worst.max(violation);
            }
        }
        let (lb, ub) = self.bounds();
        for i in 0..x.len() {
            worst = worst.max(lb[i] - x[i]).max(x[i] - ub[i]);
        }
        worst
    }
}

/// Where the solver gets objective derivatives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientMode {
    /// Central finite differences.
    #[default]
    Numerical,
    /// [`NlpProblem::gradient`]; falls back to finite differences when the
    /// problem returns `None`.
    Analytic,
}

impl GradientMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradientMode::Numerical => "numerical",
            GradientMode::Analytic => "analytic",
        }
    }
}

impl FromStr for GradientMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "numerical" | "numeric" | "fd" => Ok(GradientMode::Numerical),
            "analytic" | "analytical" => Ok(GradientMode::Analytic),
            other => Err(anyhow!(
                "unknown gradient mode '{}'; supported values: numerical, analytic",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NlpStatus {
    Converged,
    NotConverged,
}

#[derive(Debug, Clone)]
pub struct NlpOutcome {
    pub status: NlpStatus,
    pub x: Vec<f64>,
    pub objective_value: f64,
    pub iterations: usize,
    pub max_violation: f64,
    pub elapsed: Duration,
}

impl NlpOutcome {
    pub fn converged(&self) -> bool {
        self.status == NlpStatus::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Circle {
        specs: Vec<ConstraintSpec>,
    }

    impl NlpProblem for Circle {
        fn dimension(&self) -> usize {
            2
        }
        fn initial_point(&self) -> Vec<f64> {
            vec![0.0, 0.0]
        }
        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![0.0, 0.0], vec![f64::INFINITY, 1.0])
        }
        fn objective(&self, x: &[f64]) -> f64 {
            x[0] + x[1]
        }
        fn constraints(&self) -> &[ConstraintSpec] {
            &self.specs
        }
        fn evaluate_constraint(&self, index: usize, x: &[f64]) -> Vec<f64> {
            match index {
                0 => vec![x[0] * x[0] + x[1] * x[1] - 1.0],
                _ => vec![x[0] - 0.5],
            }
        }
    }

    #[test]
    fn max_violation_combines_blocks_and_bounds() {
        let problem = Circle {
            specs: vec![ConstraintSpec::equality("circle"), ConstraintSpec::inequality("x")],
        };
        assert!(problem.max_violation(&[1.0, 0.0]) < 1e-12);
        // x below 0.5 violates the inequality by 0.4, circle by 0.99
        assert!((problem.max_violation(&[0.1, 0.0]) - 0.99).abs() < 1e-12);
        // y above its bound
        assert!((problem.max_violation(&[0.0, 1.0]) - 0.5).abs() < 1e-12);
        assert!((problem.max_violation(&[0.0, 3.0]) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_mode_defaults_to_numerical() {
        assert_eq!(GradientMode::default(), GradientMode::Numerical);
        assert_eq!(
            "Analytic".parse::<GradientMode>().unwrap(),
            GradientMode::Analytic
        );
        assert!("exact".parse::<GradientMode>().is_err());
    }
}

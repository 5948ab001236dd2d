//! # Exterior penalty method with L-BFGS
//!
//! The constrained problem
//!
//! ```text
//! minimise    f(x)
//! subject to  h_i(x) = 0,  g_j(x) >= 0,  lb <= x <= ub
//! ```
//!
//! is replaced by a sequence of unconstrained problems
//!
//! ```text
//! P_μ(x) = f(x) + μ·Σ h_i(x)² + μ·Σ min(0, g_j(x))² + μ·Σ bound_violation(x)²
//! ```
//!
//! solved with L-BFGS and a More-Thuente line search. μ starts at 1000 and
//! grows ×10 per round until an inner solve meets L-BFGS's own stopping test
//! (gradient norm or cost change) at a point feasible within tolerance, or the
//! rounds run out. The final point is projected onto the bounds and accepted
//! as converged only when its worst violation is below 10× the tolerance and
//! the inner solve that produced it stopped on that test. A point left behind
//! by an exhausted iteration budget is never reported as converged.
//!
//! ## References
//!
//! - Nocedal & Wright (2006), *Numerical Optimization*, 2nd ed., ch. 17.
//!   doi:[10.1007/978-0-387-40065-5](https://doi.org/10.1007/978-0-387-40065-5)
//! - Liu & Nocedal (1989), On the limited memory BFGS method for large scale
//!   optimization. doi:[10.1007/BF01589116](https://doi.org/10.1007/BF01589116)

use super::problem::{ConstraintKind, GradientMode, NlpOutcome, NlpProblem, NlpStatus};
use super::{NlpBackend, NlpSolverConfig};
use agro_core::{AgroError, AgroResult};
use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use std::time::Instant;
use tracing::{debug, warn};

/// Relative finite-difference step.
const FD_STEP: f64 = 1e-6;

/// L-BFGS history length.
const LBFGS_MEMORY: usize = 7;

struct PenaltyProblem<'a> {
    problem: &'a dyn NlpProblem,
    penalty: f64,
    lb: &'a [f64],
    ub: &'a [f64],
    gradient: GradientMode,
}

impl PenaltyProblem<'_> {
    fn penalty_terms(&self, x: &[f64]) -> f64 {
        let mut total = 0.0;
        for (index, spec) in self.problem.constraints().iter().enumerate() {
            for value in self.problem.evaluate_constraint(index, x) {
                let violation = match spec.kind {
                    ConstraintKind::Equality => value,
                    ConstraintKind::Inequality => value.min(0.0),
                };
                total += violation * violation;
            }
        }
        for i in 0..x.len() {
            if x[i] < self.lb[i] {
                let violation = self.lb[i] - x[i];
                total += violation * violation;
            }
            if x[i] > self.ub[i] {
                let violation = x[i] - self.ub[i];
                total += violation * violation;
            }
        }
        self.penalty * total
    }

    fn penalised(&self, x: &[f64]) -> f64 {
        self.problem.objective(x) + self.penalty_terms(x)
    }
}

impl CostFunction for PenaltyProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(self.penalised(x))
    }
}

impl Gradient for PenaltyProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let analytic = match self.gradient {
            GradientMode::Analytic => self.problem.gradient(x),
            GradientMode::Numerical => None,
        };
        match analytic {
            Some(mut grad) => {
                let penalty_grad = central_difference(x, |p| self.penalty_terms(p));
                for (g, dp) in grad.iter_mut().zip(penalty_grad) {
                    *g += dp;
                }
                Ok(grad)
            }
            None => Ok(central_difference(x, |p| self.penalised(p))),
        }
    }
}

/// Central differences: exact on the quadratic penalty terms up to round-off.
fn central_difference(x: &[f64], f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut point = x.to_vec();
    let mut grad = vec![0.0; x.len()];
    for i in 0..x.len() {
        let original = point[i];
        let step = FD_STEP * original.abs().max(1.0);
        point[i] = original + step;
        let f_plus = f(&point);
        point[i] = original - step;
        let f_minus = f(&point);
        point[i] = original;
        grad[i] = (f_plus - f_minus) / (2.0 * step);
    }
    grad
}

fn project_onto_bounds(x: &mut [f64], lb: &[f64], ub: &[f64]) {
    for i in 0..x.len() {
        x[i] = x[i].max(lb[i]).min(ub[i]);
    }
}

/// Penalty method with an L-BFGS inner solve.
#[derive(Debug, Clone, Default)]
pub struct PenaltyLbfgs {
    config: NlpSolverConfig,
}

impl PenaltyLbfgs {
    pub fn new(config: NlpSolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NlpSolverConfig {
        &self.config
    }

    fn validate(&self, problem: &dyn NlpProblem, x0: &[f64], lb: &[f64], ub: &[f64]) -> AgroResult<()> {
        let n = problem.dimension();
        if x0.len() != n || lb.len() != n || ub.len() != n {
            return Err(AgroError::Validation(format!(
                "NLP dimension {} but initial point has {}, bounds have {}/{} entries",
                n,
                x0.len(),
                lb.len(),
                ub.len()
            )));
        }
        if let Some(i) = (0..n).find(|&i| lb[i] > ub[i]) {
            return Err(AgroError::Validation(format!(
                "lower bound {} exceeds upper bound {} for component {}",
                lb[i], ub[i], i
            )));
        }
        if self.config.gradient == GradientMode::Analytic {
            if let Some(grad) = problem.gradient(x0) {
                if grad.len() != n {
                    return Err(AgroError::Validation(format!(
                        "analytic gradient has {} entries, expected {}",
                        grad.len(),
                        n
                    )));
                }
            }
        }
        if !problem.objective(x0).is_finite() {
            return Err(AgroError::Validation(
                "objective is not finite at the initial point".into(),
            ));
        }
        Ok(())
    }
}

impl NlpBackend for PenaltyLbfgs {
    fn name(&self) -> &'static str {
        "penalty-lbfgs"
    }

    fn solve(&self, problem: &dyn NlpProblem) -> AgroResult<NlpOutcome> {
        let start = Instant::now();
        let config = &self.config;

        let mut x = problem.initial_point();
        let (lb, ub) = problem.bounds();
        self.validate(problem, &x, &lb, &ub)?;

        let rounds = config.penalty_rounds.max(1);
        let inner_max_iter = (config.max_iterations / rounds).max(1) as u64;
        let mut penalty = config.initial_penalty;
        let mut total_iterations = 0;
        // whether the inner solve that produced `x` met its stopping test
        let mut stationary = false;

        for round in 0..rounds {
            let penalty_problem = PenaltyProblem {
                problem,
                penalty,
                lb: &lb,
                ub: &ub,
                gradient: config.gradient,
            };
            let linesearch = MoreThuenteLineSearch::new();
            let solver = LBFGS::new(linesearch, LBFGS_MEMORY);

            let result = Executor::new(penalty_problem, solver)
                .configure(|state| state.param(x.clone()).max_iters(inner_max_iter))
                .run();

            match result {
                Ok(res) => {
                    let state = res.state();
                    total_iterations += state.get_iter() as usize;
                    let reason = state.get_termination_reason();
                    stationary = matches!(
                        reason,
                        Some(TerminationReason::SolverConverged)
                            | Some(TerminationReason::TargetCostReached)
                    );
                    if matches!(reason, Some(TerminationReason::MaxItersReached)) {
                        debug!(round, penalty, inner_max_iter, "inner iteration budget exhausted");
                    }
                    if let Some(best) = state.get_best_param() {
                        x = best.clone();
                    }
                }
                // keep the previous point; a larger penalty may still make progress
                Err(err) => warn!(round, penalty, error = %err, "L-BFGS inner solve stopped"),
            }

            let violation = problem.max_violation(&x);
            debug!(round, penalty, violation, stationary, "penalty round finished");
            if violation < config.tolerance && stationary {
                break;
            }
            penalty *= config.penalty_growth;
        }

        project_onto_bounds(&mut x, &lb, &ub);
        let max_violation = problem.max_violation(&x);
        let status = if stationary && max_violation < config.tolerance * 10.0 {
            NlpStatus::Converged
        } else {
            NlpStatus::NotConverged
        };
        let objective_value = problem.objective(&x);
        debug!(
            backend = self.name(),
            iterations = total_iterations,
            max_violation,
            objective = objective_value,
            converged = status == NlpStatus::Converged,
            "NLP solve finished"
        );

        Ok(NlpOutcome {
            status,
            x,
            objective_value,
            iterations: total_iterations,
            max_violation,
            elapsed: start.elapsed(),
        })
    }
}

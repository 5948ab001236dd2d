//! Solver selection.
//!
//! | Model | Problem class | Backends |
//! |-------|---------------|----------|
//! | Goal programming | LinearProgram | microlp, Clarabel, HiGHS |
//! | BMP allocation | LinearProgram | microlp, Clarabel, HiGHS |
//! | Price-responsive BMP | NonlinearProgram | penalty L-BFGS |

use crate::lp::{LpBackend, LpSolverKind};
use crate::nlp::{NlpBackend, NlpSolverConfig, PenaltyLbfgs};
use agro_core::{AgroError, AgroResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverBackend {
    /// Dense primal simplex (pure Rust, always compiled).
    Microlp,
    /// Interior-point conic solver (pure Rust).
    #[cfg(feature = "solver-clarabel")]
    Clarabel,
    /// Dual revised simplex / IPM, native library.
    #[cfg(feature = "solver-highs")]
    Highs,
    /// Exterior penalty with L-BFGS inner solves (pure Rust).
    PenaltyLbfgs,
}

impl SolverBackend {
    pub fn is_native(&self) -> bool {
        match self {
            #[cfg(feature = "solver-highs")]
            SolverBackend::Highs => true,
            _ => false,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SolverBackend::Microlp => "microlp",
            #[cfg(feature = "solver-clarabel")]
            SolverBackend::Clarabel => "Clarabel",
            #[cfg(feature = "solver-highs")]
            SolverBackend::Highs => "HiGHS",
            SolverBackend::PenaltyLbfgs => "penalty L-BFGS",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SolverBackend::Microlp => "Simplex LP solver (pure Rust)",
            #[cfg(feature = "solver-clarabel")]
            SolverBackend::Clarabel => "Interior-point conic solver (pure Rust)",
            #[cfg(feature = "solver-highs")]
            SolverBackend::Highs => "High-performance LP/MIP solver",
            SolverBackend::PenaltyLbfgs => "Quasi-Newton NLP with penalty method (pure Rust)",
        }
    }

    pub fn problem_class(&self) -> ProblemClass {
        match self {
            SolverBackend::PenaltyLbfgs => ProblemClass::NonlinearProgram,
            _ => ProblemClass::LinearProgram,
        }
    }

    fn lp_kind(&self) -> Option<LpSolverKind> {
        match self {
            SolverBackend::Microlp => Some(LpSolverKind::Microlp),
            #[cfg(feature = "solver-clarabel")]
            SolverBackend::Clarabel => Some(LpSolverKind::Clarabel),
            #[cfg(feature = "solver-highs")]
            SolverBackend::Highs => Some(LpSolverKind::Highs),
            SolverBackend::PenaltyLbfgs => None,
        }
    }
}

impl From<LpSolverKind> for SolverBackend {
    fn from(kind: LpSolverKind) -> Self {
        match kind {
            LpSolverKind::Microlp => SolverBackend::Microlp,
            #[cfg(feature = "solver-clarabel")]
            LpSolverKind::Clarabel => SolverBackend::Clarabel,
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => SolverBackend::Highs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemClass {
    /// Goal programming and the linear BMP allocation.
    LinearProgram,
    /// BMP allocation with price as a variable.
    NonlinearProgram,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    pub preferred_lp: Option<LpSolverKind>,
    pub nlp: NlpSolverConfig,
}

/// Hands out solver backends for each problem class.
#[derive(Debug, Clone, Default)]
pub struct SolverDispatcher {
    config: DispatchConfig,
}

impl SolverDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, problem_class: ProblemClass) -> SolverBackend {
        match problem_class {
            ProblemClass::LinearProgram => self
                .config
                .preferred_lp
                .map(SolverBackend::from)
                .unwrap_or(SolverBackend::Microlp),
            ProblemClass::NonlinearProgram => SolverBackend::PenaltyLbfgs,
        }
    }

    pub fn lp_backend(&self) -> Box<dyn LpBackend> {
        Box::new(self.config.preferred_lp.unwrap_or_default())
    }

    pub fn nlp_backend(&self) -> Box<dyn NlpBackend> {
        Box::new(PenaltyLbfgs::new(self.config.nlp.clone()))
    }

    /// Backend for an explicitly named solver, checked against the class.
    pub fn lp_backend_for(&self, backend: SolverBackend) -> AgroResult<Box<dyn LpBackend>> {
        backend
            .lp_kind()
            .map(|kind| Box::new(kind) as Box<dyn LpBackend>)
            .ok_or_else(|| {
                AgroError::Config(format!(
                    "{} cannot solve linear programs",
                    backend.display_name()
                ))
            })
    }

    pub fn list_available(&self) -> Vec<SolverBackend> {
        #[allow(unused_mut)]
        let mut solvers = vec![SolverBackend::Microlp];
        #[cfg(feature = "solver-clarabel")]
        solvers.push(SolverBackend::Clarabel);
        #[cfg(feature = "solver-highs")]
        solvers.push(SolverBackend::Highs);
        solvers.push(SolverBackend::PenaltyLbfgs);
        solvers
    }
}

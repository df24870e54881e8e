use thiserror::Error;

use crate::problem::MipProblem;
use crate::solution::Solution;

/// Failures of the solver environment itself.
///
/// An infeasible model is *not* an error: it comes back as a [`Solution`]
/// with [`crate::SolutionStatus::Infeasible`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Solver unavailable: {0}")]
    Unavailable(String),
    #[error("Solver crashed: {0}")]
    Crashed(String),
    #[error("Model not supported by solver: {0}")]
    UnsupportedModel(String),
    #[error("Internal solver error: {0}")]
    Internal(String),
}

/// A mixed-integer solver that can be handed a complete model.
///
/// `solve` is a single blocking call with no partial results. Backends hold no
/// per-model state, so one instance may serve independent problems from
/// several threads.
pub trait SolverBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError> {
        (**self).solve(problem)
    }
}

impl<B: SolverBackend + ?Sized> SolverBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError> {
        (**self).solve(problem)
    }
}

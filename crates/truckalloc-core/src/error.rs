use thiserror::Error;
use truckalloc_solver::{SolutionStatus, SolverError};

/// Malformed demand input, rejected before a model is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Demand vector is empty; at least one node is required")]
    Empty,
    #[error("Demand for node {node} is negative: {value}")]
    Negative { node: usize, value: i64 },
    #[error("Demand for node {node} is not an integer: '{token}'")]
    NotAnInteger { node: usize, token: String },
}

/// Fleet configuration that cannot produce a sound model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Fleet catalog has no truck types")]
    EmptyCatalog,
    #[error("Duplicate truck type: {0}")]
    DuplicateTruckType(String),
    #[error("Truck type {0} has zero capacity")]
    ZeroCapacity(String),
    #[error("Truck type {0}: capacity times fleet size or outsourcing ceiling exceeds the solver's integer range")]
    CapacityOverflow(String),
    #[error("Unknown truck type: {0}")]
    UnknownTruckType(String),
    #[error("Outsourcing penalty {penalty} must exceed the total in-house capacity {in_house_capacity}")]
    PenaltyTooSmall { penalty: f64, in_house_capacity: u64 },
    #[error("Big-M must be positive and finite, got {0}")]
    InvalidBigM(f64),
    #[error("Integrality tolerance must lie in (0, 0.5), got {0}")]
    InvalidTolerance(f64),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("No feasible allocation exists for the given demand")]
    Infeasible,
    #[error("Solver finished without an optimal allocation (status: {status})")]
    NotOptimal { status: SolutionStatus },
    #[error(transparent)]
    SolverUnavailable(#[from] SolverError),
    #[error("Solved allocation violates a model invariant: {0}")]
    InvariantViolation(String),
}

impl AllocationError {
    /// True for the non-fatal outcomes where the solver ran but found nothing to report
    pub fn is_no_allocation(&self) -> bool {
        matches!(self, AllocationError::Infeasible | AllocationError::NotOptimal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_errors_keep_their_own_message() {
        let err = AllocationError::from(SolverError::Crashed("index out of bounds".to_string()));
        assert_eq!(err.to_string(), "Solver crashed: index out of bounds");

        let err = AllocationError::from(SolverError::UnsupportedModel("bound too large".to_string()));
        assert_eq!(err.to_string(), "Model not supported by solver: bound too large");

        let err = AllocationError::from(SolverError::Unavailable("no license".to_string()));
        assert_eq!(err.to_string(), "Solver unavailable: no license");
        assert!(!err.is_no_allocation());
    }

    #[test]
    fn test_no_allocation_outcomes() {
        assert!(AllocationError::Infeasible.is_no_allocation());
        assert!(
            AllocationError::NotOptimal {
                status: SolutionStatus::Unbounded
            }
            .is_no_allocation()
        );
        assert!(!AllocationError::InvariantViolation("x".to_string()).is_no_allocation());
    }
}

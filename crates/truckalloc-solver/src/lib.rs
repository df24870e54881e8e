mod backend;
mod engine;
mod problem;
mod solution;

pub use backend::{SolverBackend, SolverError};
pub use engine::Solver;
pub use problem::{Constraint, ConstraintOp, MipProblem, Objective, Term, VarId, VarKind, Variable};
pub use solution::{ConstraintViolation, Solution, SolutionStatus};

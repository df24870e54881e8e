use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, trace};
use microlp::{ComparisonOp, OptimizationDirection};

use crate::backend::{SolverBackend, SolverError};
use crate::problem::{ConstraintOp, MipProblem, VarKind};
use crate::solution::Solution;

/// Branch-and-bound MILP solver backed by `microlp`.
///
/// Each call to [`Solver::solve`] builds its own backend problem from the
/// model value and drops it before returning, whatever the outcome.
///
/// Solve time grows steeply with the number of integer variables: a
/// five-node allocation on the standard fleet can take several seconds even
/// in release builds. Callers with many nodes or tight latency budgets should
/// plug in a faster [`SolverBackend`].
#[derive(Debug, Clone)]
pub struct Solver {
    /// Distance from an integer within which integral variables are snapped
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the MIP problem
    pub fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError> {
        info!(
            "Solving '{}': {} variables ({} integral), {} constraints",
            problem.name,
            problem.num_variables(),
            problem.num_integer_variables(),
            problem.num_constraints()
        );

        let Some((lp, lp_vars)) = self.translate(problem)? else {
            return Ok(Solution::infeasible());
        };

        let outcome = guarded(|| {
            lp.solve().map(|solved| {
                let raw: Vec<f64> = lp_vars.iter().map(|var| solved[*var]).collect();
                (raw, solved.objective())
            })
        })?;

        let (raw, reported_objective) = match outcome {
            Ok(solved) => solved,
            Err(microlp::Error::Infeasible) => {
                debug!("'{}' is infeasible", problem.name);
                return Ok(Solution::infeasible());
            }
            Err(microlp::Error::Unbounded) => {
                debug!("'{}' is unbounded", problem.name);
                return Ok(Solution::unbounded());
            }
            Err(err) => return Err(SolverError::Internal(err.to_string())),
        };

        let values: Vec<f64> = raw
            .into_iter()
            .zip(&problem.variables)
            .map(|(value, variable)| self.snap(value, variable.kind))
            .collect();
        let objective_value = problem.objective_value(&values);
        debug!(
            "'{}' optimal: objective {:.4} (backend reported {:.4})",
            problem.name, objective_value, reported_objective
        );

        Ok(Solution::optimal(values, objective_value))
    }

    fn snap(&self, value: f64, kind: VarKind) -> f64 {
        let rounded = value.round();
        if kind.is_integral() && (value - rounded).abs() <= self.tolerance {
            // avoid handing out -0.0
            rounded + 0.0
        } else {
            value
        }
    }

    /// Build the backend problem and its variables, numbered like [`crate::VarId`].
    /// `Ok(None)` means a row with no variables already contradicts its right-hand side.
    fn translate(&self, problem: &MipProblem) -> Result<Option<(microlp::Problem, Vec<microlp::Variable>)>, SolverError> {
        let direction = if problem.objective.minimize {
            OptimizationDirection::Minimize
        } else {
            OptimizationDirection::Maximize
        };
        let mut lp = microlp::Problem::new(direction);

        let mut costs = vec![0.0; problem.num_variables()];
        for (var, coeff) in &problem.objective.terms {
            let slot = costs.get_mut(var.index()).ok_or_else(|| {
                SolverError::UnsupportedModel(format!("objective references unknown variable #{}", var.index()))
            })?;
            *slot += coeff;
        }

        let mut lp_vars = Vec::with_capacity(problem.num_variables());
        for (variable, cost) in problem.variables.iter().zip(costs) {
            let lp_var = match variable.kind {
                VarKind::Continuous => lp.add_var(cost, (variable.lower, variable.upper)),
                VarKind::Binary if variable.lower == 0.0 && variable.upper == 1.0 => lp.add_binary_var(cost),
                VarKind::Binary | VarKind::Integer => {
                    let lower = integer_bound(variable.lower.ceil(), &variable.name)?;
                    let upper = integer_bound(variable.upper.floor(), &variable.name)?;
                    lp.add_integer_var(cost, (lower, upper))
                }
            };
            lp_vars.push(lp_var);
        }

        for constraint in &problem.constraints {
            let mut row: BTreeMap<usize, f64> = BTreeMap::new();
            for (var, coeff) in &constraint.terms {
                if var.index() >= problem.num_variables() {
                    return Err(SolverError::UnsupportedModel(format!(
                        "constraint '{}' references unknown variable #{}",
                        constraint.name,
                        var.index()
                    )));
                }
                *row.entry(var.index()).or_insert(0.0) += coeff;
            }
            row.retain(|_, coeff| *coeff != 0.0);

            if row.is_empty() {
                let holds = match constraint.op {
                    ConstraintOp::Le => 0.0 <= constraint.rhs,
                    ConstraintOp::Ge => 0.0 >= constraint.rhs,
                    ConstraintOp::Eq => constraint.rhs == 0.0,
                };
                if !holds {
                    debug!("constant row '{}' cannot hold", constraint.name);
                    return Ok(None);
                }
                continue;
            }

            trace!("{} ({} terms)", constraint.name, row.len());
            let op = match constraint.op {
                ConstraintOp::Le => ComparisonOp::Le,
                ConstraintOp::Ge => ComparisonOp::Ge,
                ConstraintOp::Eq => ComparisonOp::Eq,
            };
            let terms: Vec<(microlp::Variable, f64)> = row
                .into_iter()
                .map(|(index, coeff)| (lp_vars[index], coeff))
                .collect();
            lp.add_constraint(terms.as_slice(), op, constraint.rhs);
        }

        Ok(Some((lp, lp_vars)))
    }
}

impl SolverBackend for Solver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, problem: &MipProblem) -> Result<Solution, SolverError> {
        Solver::solve(self, problem)
    }
}

fn integer_bound(bound: f64, name: &str) -> Result<i32, SolverError> {
    if bound == f64::INFINITY {
        Ok(i32::MAX)
    } else if bound == f64::NEG_INFINITY {
        Ok(i32::MIN)
    } else if bound >= i32::MIN as f64 && bound <= i32::MAX as f64 {
        Ok(bound as i32)
    } else {
        Err(SolverError::UnsupportedModel(format!(
            "bound {bound} of integer variable '{name}' is outside the 32-bit range"
        )))
    }
}

/// Run backend code, turning a panic into [`SolverError::Crashed`]
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, SolverError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| SolverError::Crashed(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "backend panicked".to_string()
    }
}

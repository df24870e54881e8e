use crate::solution::ConstraintViolation;

/// Index of a variable inside a [`MipProblem`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in insertion order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a decision variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Integer,
    /// Integer restricted to {0, 1}
    Binary,
}

impl VarKind {
    pub fn is_integral(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

/// A linear term `coefficient * variable`
pub type Term = (VarId, f64);

/// Represents a mixed-integer linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct MipProblem {
    /// Model name (for diagnostics)
    pub name: String,
    /// Decision variables in insertion order
    pub variables: Vec<Variable>,
    /// Objective function
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Sparse coefficients; a variable may appear more than once
    pub terms: Vec<Term>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Left-hand side terms
    pub terms: Vec<Term>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
        }
    }
}

impl MipProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            objective: Objective {
                terms: Vec::new(),
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, kind: VarKind, lower: f64, upper: f64) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    /// Tighten the upper bound of an existing variable
    pub fn fix_upper(&mut self, var: VarId, upper: f64) {
        let variable = &mut self.variables[var.0];
        variable.upper = variable.upper.min(upper);
    }

    pub fn set_objective(&mut self, terms: Vec<Term>, minimize: bool) {
        self.objective = Objective { terms, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, terms: Vec<Term>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.kind.is_integral()).count()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Value of a linear expression under the given assignment
    pub fn evaluate(terms: &[Term], values: &[f64]) -> f64 {
        terms
            .iter()
            .map(|(var, coeff)| coeff * values.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        Self::evaluate(&self.objective.terms, values)
    }

    /// Check a candidate assignment against every bound, integrality requirement and row
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        if values.len() != self.variables.len() {
            violations.push(ConstraintViolation {
                constraint: self.name.clone(),
                required: self.variables.len() as f64,
                actual: values.len() as f64,
                violation_amount: (self.variables.len() as f64 - values.len() as f64).abs(),
                description: format!(
                    "expected {} variable values, got {}",
                    self.variables.len(),
                    values.len()
                ),
            });
            return violations;
        }

        for (variable, &value) in self.variables.iter().zip(values) {
            if value < variable.lower - tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}.lower", variable.name),
                    required: variable.lower,
                    actual: value,
                    violation_amount: variable.lower - value,
                    description: format!("{} is below its lower bound", variable.name),
                });
            }
            if value > variable.upper + tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}.upper", variable.name),
                    required: variable.upper,
                    actual: value,
                    violation_amount: value - variable.upper,
                    description: format!("{} is above its upper bound", variable.name),
                });
            }
            if variable.kind.is_integral() && (value - value.round()).abs() > tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}.integral", variable.name),
                    required: value.round(),
                    actual: value,
                    violation_amount: (value - value.round()).abs(),
                    description: format!("{} is not integral", variable.name),
                });
            }
        }

        for constraint in &self.constraints {
            let actual = Self::evaluate(&constraint.terms, values);
            // Row tolerance grows with the magnitude of the right-hand side
            let slack = tolerance * constraint.rhs.abs().max(1.0);
            let amount = match constraint.op {
                ConstraintOp::Le => actual - constraint.rhs,
                ConstraintOp::Ge => constraint.rhs - actual,
                ConstraintOp::Eq => (actual - constraint.rhs).abs(),
            };
            if amount > slack {
                violations.push(ConstraintViolation {
                    constraint: constraint.name.clone(),
                    required: constraint.rhs,
                    actual,
                    violation_amount: amount,
                    description: format!(
                        "{}: {:.6} {} {:.6} does not hold",
                        constraint.name,
                        actual,
                        constraint.op.symbol(),
                        constraint.rhs
                    ),
                });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack() -> (MipProblem, VarId, VarId) {
        let mut problem = MipProblem::new("knapsack");
        let x = problem.add_variable("x", VarKind::Integer, 0.0, 10.0);
        let y = problem.add_variable("y", VarKind::Binary, -5.0, 7.0);
        problem.add_constraint("weight", vec![(x, 3.0), (y, 4.0)], ConstraintOp::Le, 10.0);
        problem.set_objective(vec![(x, 1.0), (y, 2.0)], false);
        (problem, x, y)
    }

    #[test]
    fn test_binary_bounds_are_clamped() {
        let (problem, _, y) = knapsack();
        let var = problem.variable(y);
        assert_eq!(var.lower, 0.0);
        assert_eq!(var.upper, 1.0);
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_integer_variables(), 2);
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn test_evaluate_repeated_terms() {
        let (_, x, y) = knapsack();
        let value = MipProblem::evaluate(&[(x, 1.0), (y, 2.0), (x, 0.5)], &[2.0, 1.0]);
        assert!((value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_violations_accepts_feasible_point() {
        let (problem, _, _) = knapsack();
        assert!(problem.violations(&[2.0, 1.0], 1e-9).is_empty());
        assert!((problem.objective_value(&[2.0, 1.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_violations_reports_rows_bounds_and_integrality() {
        let (problem, _, _) = knapsack();
        let violations = problem.violations(&[2.5, 1.0], 1e-9);
        let names: Vec<_> = violations.iter().map(|v| v.constraint.as_str()).collect();
        assert!(names.contains(&"x.integral"));
        assert!(names.contains(&"weight"));

        let violations = problem.violations(&[11.0, 0.0], 1e-9);
        assert!(violations.iter().any(|v| v.constraint == "x.upper"));
    }

    #[test]
    fn test_violations_rejects_wrong_length() {
        let (problem, _, _) = knapsack();
        let violations = problem.violations(&[1.0], 1e-9);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint, "knapsack");
    }

    #[test]
    fn test_fix_upper_only_tightens() {
        let (mut problem, x, _) = knapsack();
        problem.fix_upper(x, 4.0);
        problem.fix_upper(x, 8.0);
        assert_eq!(problem.variable(x).upper, 4.0);
    }
}

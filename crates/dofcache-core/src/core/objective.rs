//! Boundary of the external energy-function and minimizer collaborators.
//!
//! Objectives must be deterministic and free of side effects across repeated identical calls:
//! cached DOF vectors are only valid if re-evaluating the same inputs yields the same energy.

use super::models::ids::Position;
use nalgebra::DVector;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjectiveError {
    #[error("Objective evaluation failed: {0}")]
    Evaluation(String),

    #[error("Objective returned a non-finite value ({value})")]
    NonFinite { value: f64 },

    #[error("DOF vector has length {found}, objective expects {expected}")]
    Dimension { expected: usize, found: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MinimizerError {
    #[error(transparent)]
    Objective(#[from] ObjectiveError),

    #[error("Minimizer failed: {0}")]
    Failed(String),
}

/// How many iterations a minimizer may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationBudget {
    /// Run until the minimizer's own convergence criterion is met.
    Converge,
    /// Stop after at most this many iterations, converged or not.
    Capped(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub dofs: DVector<f64>,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DofBounds {
    pub min: DVector<f64>,
    pub max: DVector<f64>,
}

impl DofBounds {
    pub fn center(&self) -> DVector<f64> {
        (&self.min + &self.max) * 0.5
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            min: DVector::from_iterator(indices.len(), indices.iter().map(|&i| self.min[i])),
            max: DVector::from_iterator(indices.len(), indices.iter().map(|&i| self.max[i])),
        }
    }
}

/// Read-only objective. There is no per-DOF setter: reduced views write trial values into a
/// frozen copy of the full vector before each `value` call.
pub trait ObjectiveFunction: Send + Sync {
    fn num_dofs(&self) -> usize;

    fn value(&self, dofs: &DVector<f64>) -> Result<f64, ObjectiveError>;

    fn constraints(&self) -> DofBounds;

    fn center(&self) -> DVector<f64> {
        self.constraints().center()
    }

    fn is_angle(&self, dof: usize) -> bool;

    /// Position owning `dof` in the current conformation, or `None` when the ownership
    /// metadata is missing.
    fn dof_owner(&self, dof: usize) -> Option<Position>;
}

pub trait Minimizer: Send + Sync {
    fn minimize_from(
        &self,
        objective: &dyn ObjectiveFunction,
        start: &DVector<f64>,
        budget: IterationBudget,
    ) -> Result<Minimum, MinimizerError>;

    fn minimize_from_center(
        &self,
        objective: &dyn ObjectiveFunction,
        budget: IterationBudget,
    ) -> Result<Minimum, MinimizerError> {
        self.minimize_from(objective, &objective.center(), budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_center_is_midpoint() {
        let bounds = DofBounds {
            min: DVector::from_vec(vec![-1.0, 0.0]),
            max: DVector::from_vec(vec![3.0, 2.0]),
        };
        assert_eq!(bounds.center().as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn bounds_select_translates_indices() {
        let bounds = DofBounds {
            min: DVector::from_vec(vec![-1.0, -2.0, -3.0]),
            max: DVector::from_vec(vec![1.0, 2.0, 3.0]),
        };
        let selected = bounds.select(&[2, 0]);
        assert_eq!(selected.min.as_slice(), &[-3.0, -1.0]);
        assert_eq!(selected.max.as_slice(), &[3.0, 1.0]);
    }

    #[test]
    fn minimizer_error_wraps_objective_error_transparently() {
        let err: MinimizerError = ObjectiveError::Evaluation("boom".into()).into();
        assert_eq!(err.to_string(), "Objective evaluation failed: boom");
    }
}

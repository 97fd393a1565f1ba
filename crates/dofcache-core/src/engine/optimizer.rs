use crate::core::models::dofs::{DofIndex, gather, scatter};
use crate::core::models::ids::Position;
use crate::core::objective::{
    DofBounds, IterationBudget, Minimizer, MinimizerError, ObjectiveError, ObjectiveFunction,
};
use nalgebra::DVector;
use tracing::trace;

/// Reduced-dimension view of an objective: only the DOFs at `indices` vary, every other DOF
/// is frozen at its value in `template`.
pub(crate) struct SubsetObjective<'a> {
    base: &'a dyn ObjectiveFunction,
    template: DVector<f64>,
    indices: &'a [usize],
}

impl<'a> SubsetObjective<'a> {
    pub fn new(base: &'a dyn ObjectiveFunction, template: DVector<f64>, indices: &'a [usize]) -> Self {
        Self {
            base,
            template,
            indices,
        }
    }

    pub fn reduce(&self, full: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(gather(full, self.indices))
    }

    /// The full vector corresponding to `reduced`.
    pub fn expand(&self, reduced: &DVector<f64>) -> DVector<f64> {
        let mut full = self.template.clone();
        scatter(&mut full, self.indices, reduced.as_slice());
        full
    }
}

impl ObjectiveFunction for SubsetObjective<'_> {
    fn num_dofs(&self) -> usize {
        self.indices.len()
    }

    fn value(&self, dofs: &DVector<f64>) -> Result<f64, ObjectiveError> {
        if dofs.len() != self.indices.len() {
            return Err(ObjectiveError::Dimension {
                expected: self.indices.len(),
                found: dofs.len(),
            });
        }
        self.base.value(&self.expand(dofs))
    }

    fn constraints(&self) -> DofBounds {
        self.base.constraints().select(self.indices)
    }

    fn center(&self) -> DVector<f64> {
        self.reduce(&self.base.center())
    }

    fn is_angle(&self, dof: usize) -> bool {
        self.base.is_angle(self.indices[dof])
    }

    fn dof_owner(&self, dof: usize) -> Option<Position> {
        self.base.dof_owner(self.indices[dof])
    }
}

/// Result of one constrained optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetMinimum {
    /// The full DOF vector with the optimized subset scattered in.
    pub dofs: DVector<f64>,
    /// Full-vector indices that were optimized, in target-position order.
    pub indices: Vec<usize>,
    /// Energy reported by the minimizer; `None` when there was nothing to optimize.
    pub energy: Option<f64>,
}

impl SubsetMinimum {
    pub fn local_values(&self) -> Vec<f64> {
        gather(&self.dofs, &self.indices)
    }
}

/// Minimizes a chosen subset of DOFs while all others stay fixed.
///
/// Holds no state between calls; every call makes at most one minimizer invocation.
#[derive(Clone, Copy)]
pub struct ConstrainedOptimizer<'a> {
    objective: &'a dyn ObjectiveFunction,
    minimizer: &'a dyn Minimizer,
    index: &'a DofIndex,
}

impl<'a> ConstrainedOptimizer<'a> {
    pub fn new(
        objective: &'a dyn ObjectiveFunction,
        minimizer: &'a dyn Minimizer,
        index: &'a DofIndex,
    ) -> Self {
        Self {
            objective,
            minimizer,
            index,
        }
    }

    pub fn index(&self) -> &DofIndex {
        self.index
    }

    /// Optimizes the DOFs owned by `targets`, starting from `dofs`.
    ///
    /// Positions without DOFs in the current conformation contribute nothing; if no target
    /// owns any DOF the input is returned unchanged without invoking the minimizer.
    pub fn minimize(
        &self,
        targets: &[Position],
        dofs: &DVector<f64>,
        budget: IterationBudget,
    ) -> Result<SubsetMinimum, MinimizerError> {
        let indices = self.index.indices_for(targets);
        if indices.is_empty() {
            return Ok(SubsetMinimum {
                dofs: dofs.clone(),
                indices,
                energy: None,
            });
        }

        let view = SubsetObjective::new(self.objective, dofs.clone(), &indices);
        let start = view.reduce(dofs);
        let minimum = self.minimizer.minimize_from(&view, &start, budget)?;
        let full = view.expand(&minimum.dofs);
        trace!(
            targets = targets.len(),
            dofs = indices.len(),
            energy = minimum.energy,
            "Constrained minimization finished."
        );

        Ok(SubsetMinimum {
            dofs: full,
            indices,
            energy: Some(minimum.energy),
        })
    }
}

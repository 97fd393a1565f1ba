//! Deterministic collaborators shared by the unit tests.

use crate::core::minimizer::CcdMinimizer;
use crate::core::models::conformation::Conformation;
use crate::core::models::dofs::RotamerDofLayout;
use crate::core::models::ids::Position;
use crate::core::objective::{
    DofBounds, IterationBudget, Minimizer, MinimizerError, Minimum, ObjectiveError,
    ObjectiveFunction,
};
use nalgebra::DVector;
use parking_lot::Mutex;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

const COUPLING: f64 = 0.3;

/// Separable quadratic bowl per DOF plus a weak coupling between neighboring positions.
///
/// Targets depend on (position, rotamer class, local DOF), so two conformations that agree on
/// a position subset have identical objectives restricted to that subset, up to couplings that
/// cross its border.
#[derive(Debug, Clone)]
pub(crate) struct QuadraticObjective {
    owners: Vec<Option<Position>>,
    targets: Vec<f64>,
    weights: Vec<f64>,
    couplings: Vec<(usize, usize)>,
}

impl QuadraticObjective {
    pub fn new(layout: &RotamerDofLayout, conformation: &Conformation) -> Self {
        let mut owners = Vec::new();
        let mut targets = Vec::new();
        let mut weights = Vec::new();
        let mut spans: Vec<(Position, usize, usize)> = Vec::new();

        for (position, rc) in conformation.assigned() {
            let count = layout.dof_count(position, rc).unwrap_or(0);
            let first = owners.len();
            for k in 0..count {
                owners.push(Some(position));
                targets.push(((position * 7 + rc * 3 + k) % 11) as f64 * 0.1 - 0.5);
                weights.push(1.0 + 0.25 * k as f64);
            }
            if count > 0 {
                spans.push((position, first, first + count - 1));
            }
        }

        let couplings = spans
            .windows(2)
            .filter(|pair| pair[1].0 == pair[0].0 + 1)
            .map(|pair| (pair[0].2, pair[1].1))
            .collect();

        Self {
            owners,
            targets,
            weights,
            couplings,
        }
    }

    pub fn without_owner(mut self, dof: usize) -> Self {
        self.owners[dof] = None;
        self
    }

    pub fn zeros(&self) -> DVector<f64> {
        DVector::zeros(self.owners.len())
    }
}

impl ObjectiveFunction for QuadraticObjective {
    fn num_dofs(&self) -> usize {
        self.owners.len()
    }

    fn value(&self, dofs: &DVector<f64>) -> Result<f64, ObjectiveError> {
        if dofs.len() != self.owners.len() {
            return Err(ObjectiveError::Dimension {
                expected: self.owners.len(),
                found: dofs.len(),
            });
        }
        let bowl: f64 = dofs
            .iter()
            .zip(self.targets.iter().zip(&self.weights))
            .map(|(x, (t, w))| w * (x - t).powi(2))
            .sum();
        let coupled: f64 = self
            .couplings
            .iter()
            .map(|&(i, j)| COUPLING * dofs[i] * dofs[j])
            .sum();
        Ok(bowl + coupled)
    }

    fn constraints(&self) -> DofBounds {
        DofBounds {
            min: DVector::from_element(self.owners.len(), -PI),
            max: DVector::from_element(self.owners.len(), PI),
        }
    }

    fn is_angle(&self, _dof: usize) -> bool {
        true
    }

    fn dof_owner(&self, dof: usize) -> Option<Position> {
        self.owners.get(dof).copied().flatten()
    }
}

/// Fails exactly once, on the `fail_on`-th evaluation (1-based).
pub(crate) struct FlakyObjective {
    inner: QuadraticObjective,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FlakyObjective {
    pub fn new(inner: QuadraticObjective, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ObjectiveFunction for FlakyObjective {
    fn num_dofs(&self) -> usize {
        self.inner.num_dofs()
    }

    fn value(&self, dofs: &DVector<f64>) -> Result<f64, ObjectiveError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ObjectiveError::Evaluation(format!("injected failure on call {call}")));
        }
        self.inner.value(dofs)
    }

    fn constraints(&self) -> DofBounds {
        self.inner.constraints()
    }

    fn is_angle(&self, dof: usize) -> bool {
        self.inner.is_angle(dof)
    }

    fn dof_owner(&self, dof: usize) -> Option<Position> {
        self.inner.dof_owner(dof)
    }
}

/// Counts invocations and records the dimension of every objective it is handed.
#[derive(Default)]
pub(crate) struct CountingMinimizer {
    inner: CcdMinimizer,
    calls: AtomicUsize,
    dimensions: Mutex<Vec<usize>>,
}

impl CountingMinimizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.dimensions.lock().clone()
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.dimensions.lock().clear();
    }
}

impl Minimizer for CountingMinimizer {
    fn minimize_from(
        &self,
        objective: &dyn ObjectiveFunction,
        start: &DVector<f64>,
        budget: IterationBudget,
    ) -> Result<Minimum, MinimizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dimensions.lock().push(objective.num_dofs());
        self.inner.minimize_from(objective, start, budget)
    }
}

/// Fails whenever it is handed a reduced objective smaller than `full_dofs`.
pub(crate) struct SubsetFailingMinimizer {
    inner: CcdMinimizer,
    full_dofs: usize,
}

impl SubsetFailingMinimizer {
    pub fn new(full_dofs: usize) -> Self {
        Self {
            inner: CcdMinimizer::default(),
            full_dofs,
        }
    }
}

impl Minimizer for SubsetFailingMinimizer {
    fn minimize_from(
        &self,
        objective: &dyn ObjectiveFunction,
        start: &DVector<f64>,
        budget: IterationBudget,
    ) -> Result<Minimum, MinimizerError> {
        if objective.num_dofs() < self.full_dofs {
            return Err(MinimizerError::Failed("subset minimization diverged".to_string()));
        }
        self.inner.minimize_from(objective, start, budget)
    }
}

/// Rotamer class `rc` carries `1 + rc % 3` DOFs at every position.
pub(crate) fn varied_layout(num_positions: usize, num_rcs: usize) -> RotamerDofLayout {
    RotamerDofLayout::new(
        (0..num_positions)
            .map(|_| (0..num_rcs).map(|rc| 1 + rc % 3).collect())
            .collect(),
    )
}

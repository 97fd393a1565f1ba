//! Interchangeable caching strategies behind one minimization interface.
//!
//! - [`subtree`] - Full-subtree DOF caching with a boundary-refinement pass. Energies are
//!   converged minima of the merged vector.
//! - [`partial_fix`] - L-set caching with quick separator re-optimization. Keys ignore the
//!   separator so more conformations hit, but energies are provisional upper bounds.

pub mod partial_fix;
pub mod subtree;

use super::config::StrategyKind;
use super::error::EngineError;
use super::stats::CacheStatistics;
use crate::core::models::conformation::Conformation;
use crate::core::models::dofs::DofIndex;
use crate::core::objective::{IterationBudget, Minimizer, ObjectiveFunction};
use nalgebra::DVector;
use serde::Serialize;

pub use partial_fix::PartialFixCache;
pub use subtree::SubtreeCache;

/// How much the reported energy can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyFidelity {
    /// Every optimized DOF set ran to the minimizer's convergence criterion.
    Converged,
    /// Some DOFs were only quick-optimized; the energy is an upper bound on the minimum.
    UpperBound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationOutcome {
    pub dofs: DVector<f64>,
    pub energy: f64,
    /// Whether every cache unit of the call was served from cache.
    pub fully_cached: bool,
    pub fidelity: EnergyFidelity,
}

/// Inputs of one minimization call, with the conformation-scoped DOF index already built.
#[derive(Clone, Copy)]
pub struct MinimizationRequest<'a> {
    pub conformation: &'a Conformation,
    pub minimizer: &'a dyn Minimizer,
    pub initial_dofs: &'a DVector<f64>,
    pub objective: &'a dyn ObjectiveFunction,
    pub dof_index: &'a DofIndex,
}

pub trait MinimizationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Minimizes a fully assigned conformation, reusing cached DOFs where possible.
    fn minimize(&self, request: &MinimizationRequest<'_>) -> Result<MinimizationOutcome, EngineError>;

    /// Drops every cached entry and resets counters.
    fn clear(&self);

    fn statistics(&self) -> CacheStatistics;
}

/// One unconstrained minimization of the complete conformation via the wrapped minimizer.
pub(crate) fn full_minimization(
    request: &MinimizationRequest<'_>,
) -> Result<MinimizationOutcome, EngineError> {
    let minimum = request.minimizer.minimize_from(
        request.objective,
        request.initial_dofs,
        IterationBudget::Converge,
    )?;
    Ok(MinimizationOutcome {
        dofs: minimum.dofs,
        energy: minimum.energy,
        fully_cached: false,
        fidelity: EnergyFidelity::Converged,
    })
}

use crate::core::models::conformation::Conformation;
use crate::core::models::dofs::DofIndex;
use crate::core::objective::{IterationBudget, Minimizer, ObjectiveFunction};
use crate::engine::context::CacheContext;
use crate::engine::error::EngineError;
use crate::engine::strategy::{
    EnergyFidelity, MinimizationOutcome, MinimizationRequest, full_minimization,
};
use nalgebra::DVector;
use tracing::{debug, instrument, warn};

/// Minimizes `conformation`, reusing DOFs cached in `context` wherever possible.
///
/// Fragments (conformations with unassigned positions) skip every cache and return the
/// wrapped minimizer's output unchanged. Full conformations are validated against the
/// context's space; a mismatch is a caller error and propagates. Objective or minimizer
/// failures inside the cached path are logged and replaced by one full uncached
/// minimization from `initial_dofs`.
#[instrument(skip_all, name = "minimize_with_cache", fields(space = %context.space().id()))]
pub fn minimize_with_cache(
    context: &CacheContext,
    conformation: &Conformation,
    minimizer: &dyn Minimizer,
    initial_dofs: &DVector<f64>,
    objective: &dyn ObjectiveFunction,
) -> Result<MinimizationOutcome, EngineError> {
    let recorder = context.recorder();
    recorder.record_call();

    if initial_dofs.len() != objective.num_dofs() {
        return Err(EngineError::DimensionMismatch {
            expected: objective.num_dofs(),
            found: initial_dofs.len(),
        });
    }

    if conformation.is_fragment() {
        recorder.record_fragment_bypass();
        debug!(
            assigned = conformation.assigned().count(),
            "Fragment bypasses the cache."
        );
        let minimum =
            minimizer.minimize_from(objective, initial_dofs, IterationBudget::Converge)?;
        return Ok(MinimizationOutcome {
            dofs: minimum.dofs,
            energy: minimum.energy,
            fully_cached: false,
            fidelity: EnergyFidelity::Converged,
        });
    }

    conformation.check_against(context.space())?;

    let dof_index = DofIndex::for_objective(objective, conformation.len());
    let unresolved = dof_index.unresolved_count();
    if unresolved > 0 {
        warn!(
            count = unresolved,
            "DOFs without a resolvable owning position stay at their initial values."
        );
        recorder.record_unresolved(unresolved);
    }

    let request = MinimizationRequest {
        conformation,
        minimizer,
        initial_dofs,
        objective,
        dof_index: &dof_index,
    };

    if !context.config().enabled {
        return full_minimization(&request);
    }

    let strategy = context.strategy();
    match strategy.minimize(&request) {
        Ok(outcome) => {
            debug!(
                energy = outcome.energy,
                fully_cached = outcome.fully_cached,
                fidelity = ?outcome.fidelity,
                "Cached minimization finished."
            );
            Ok(outcome)
        }
        Err(error) if error.is_recoverable() => {
            warn!(
                %error,
                strategy = %strategy.kind(),
                "Cached minimization failed; falling back to full minimization."
            );
            recorder.record_fallback();
            full_minimization(&request).map_err(|fallback| match fallback {
                EngineError::Minimization { source } => EngineError::FallbackFailed {
                    cause: error.to_string(),
                    source,
                },
                other => other,
            })
        }
        Err(error) => Err(error),
    }
}

use super::objective::{
    IterationBudget, Minimizer, MinimizerError, Minimum, ObjectiveError, ObjectiveFunction,
};
use nalgebra::DVector;
use tracing::trace;

const MIN_STEP: f64 = 1e-6;
const MAX_EXPANSIONS: usize = 8;

/// Bounded cyclic coordinate descent.
///
/// Each sweep visits every DOF once, probing a step in both directions and expanding it while
/// the energy keeps dropping. Steps shrink on failure. Only improving moves are accepted, so
/// the returned point is never worse than the start.
#[derive(Debug, Clone, PartialEq)]
pub struct CcdMinimizer {
    pub max_sweeps: usize,
    pub tolerance: f64,
    pub initial_step: f64,
}

impl Default for CcdMinimizer {
    fn default() -> Self {
        Self {
            max_sweeps: 60,
            tolerance: 1e-9,
            initial_step: 0.25,
        }
    }
}

impl CcdMinimizer {
    pub fn new(max_sweeps: usize, tolerance: f64, initial_step: f64) -> Self {
        Self {
            max_sweeps,
            tolerance,
            initial_step,
        }
    }

    fn sweeps_for(&self, budget: IterationBudget) -> usize {
        match budget {
            IterationBudget::Converge => self.max_sweeps,
            IterationBudget::Capped(n) => n.min(self.max_sweeps),
        }
    }
}

fn evaluate(objective: &dyn ObjectiveFunction, dofs: &DVector<f64>) -> Result<f64, ObjectiveError> {
    let value = objective.value(dofs)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ObjectiveError::NonFinite { value })
    }
}

impl Minimizer for CcdMinimizer {
    fn minimize_from(
        &self,
        objective: &dyn ObjectiveFunction,
        start: &DVector<f64>,
        budget: IterationBudget,
    ) -> Result<Minimum, MinimizerError> {
        let n = objective.num_dofs();
        if start.len() != n {
            return Err(ObjectiveError::Dimension {
                expected: n,
                found: start.len(),
            }
            .into());
        }

        let bounds = objective.constraints();
        let mut x = start.clone();
        for i in 0..n {
            x[i] = x[i].clamp(bounds.min[i], bounds.max[i]);
        }
        let mut energy = evaluate(objective, &x)?;
        let mut steps = vec![self.initial_step; n];

        for sweep in 0..self.sweeps_for(budget) {
            let sweep_start = energy;
            for i in 0..n {
                let origin = x[i];
                let mut best = (energy, origin);

                for direction in [1.0, -1.0] {
                    let mut step = steps[i];
                    for _ in 0..MAX_EXPANSIONS {
                        let candidate = (origin + direction * step).clamp(bounds.min[i], bounds.max[i]);
                        if candidate == best.1 {
                            break;
                        }
                        x[i] = candidate;
                        let e = evaluate(objective, &x)?;
                        if e < best.0 {
                            best = (e, candidate);
                            step *= 2.0;
                        } else {
                            break;
                        }
                    }
                    if best.1 != origin {
                        break;
                    }
                }

                x[i] = best.1;
                if best.1 == origin {
                    steps[i] = (steps[i] * 0.5).max(MIN_STEP);
                } else {
                    steps[i] = (best.1 - origin).abs().max(MIN_STEP);
                    energy = best.0;
                }
            }

            trace!(sweep, energy, "CCD sweep finished.");
            if sweep_start - energy < self.tolerance && steps.iter().all(|&s| s <= MIN_STEP * 4.0) {
                break;
            }
        }

        Ok(Minimum { dofs: x, energy })
    }
}

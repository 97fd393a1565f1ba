use super::{
    EnergyFidelity, MinimizationOutcome, MinimizationRequest, MinimizationStrategy,
    full_minimization,
};
use crate::core::decomposition::{DecompositionTree, InteractionGraph};
use crate::core::models::dofs::scatter;
use crate::core::models::ids::{NodeId, Position};
use crate::core::objective::{IterationBudget, MinimizerError};
use crate::engine::cache::{CacheKey, CachedEntry, EntryStore, SharedEntry};
use crate::engine::config::{CacheConfig, StrategyKind};
use crate::engine::error::EngineError;
use crate::engine::optimizer::{ConstrainedOptimizer, SubsetMinimum};
use crate::engine::stats::{CacheStatistics, Phase, StrategyRecorder};
use itertools::Itertools;
use nalgebra::DVector;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One independently cached subtree. Units of a tree are mutually position-disjoint, so
/// their DOF index ranges never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheUnit {
    pub node: NodeId,
    pub positions: Vec<Position>,
}

/// Full-subtree DOF caching with boundary refinement.
///
/// Every unit whose local assignment was seen before gets its minimized DOFs copied verbatim
/// from cache; the remaining units are minimized independently (concurrently when enabled)
/// against one snapshot of the working vector. A final pass re-optimizes the positions on
/// unit borders against the full objective.
pub struct SubtreeCache {
    tree: Arc<DecompositionTree>,
    config: CacheConfig,
    units: Vec<CacheUnit>,
    boundary: Vec<Position>,
    store: EntryStore,
    stats: StrategyRecorder,
}

impl SubtreeCache {
    pub fn new(
        tree: Arc<DecompositionTree>,
        graph: &dyn InteractionGraph,
        config: CacheConfig,
    ) -> Self {
        let units: Vec<CacheUnit> = tree
            .units(config.max_unit_size)
            .into_iter()
            .filter_map(|node| {
                tree.node(node).map(|n| CacheUnit {
                    node,
                    positions: n.positions().to_vec(),
                })
            })
            .collect();
        let boundary = boundary_positions(&units, graph);
        debug!(
            units = units.len(),
            boundary = boundary.len(),
            "Initialized subtree cache."
        );

        Self {
            store: EntryStore::new(config.capacity),
            tree,
            config,
            units,
            boundary,
            stats: StrategyRecorder::default(),
        }
    }

    pub fn tree(&self) -> &DecompositionTree {
        &self.tree
    }

    pub fn units(&self) -> &[CacheUnit] {
        &self.units
    }

    pub fn boundary_positions(&self) -> &[Position] {
        &self.boundary
    }

    pub fn cached_entry(&self, key: &CacheKey) -> Option<SharedEntry> {
        self.store.peek(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn minimize_units(
        &self,
        optimizer: &ConstrainedOptimizer<'_>,
        pending: &[(&CacheUnit, CacheKey)],
        snapshot: &DVector<f64>,
    ) -> Result<Vec<SubsetMinimum>, MinimizerError> {
        let run = |(unit, _): &(&CacheUnit, CacheKey)| -> Result<SubsetMinimum, MinimizerError> {
            let minimum = optimizer.minimize(&unit.positions, snapshot, IterationBudget::Converge)?;
            if minimum.energy.is_some() {
                self.stats.record_minimization();
            }
            Ok(minimum)
        };

        #[cfg(feature = "parallel")]
        let results: Vec<Result<SubsetMinimum, MinimizerError>> = if self.config.parallel {
            pending.par_iter().map(&run).collect()
        } else {
            pending.iter().map(&run).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<SubsetMinimum, MinimizerError>> =
            pending.iter().map(&run).collect();

        results.into_iter().collect()
    }

    /// Re-optimizes the boundary positions and returns the final full-objective energy.
    ///
    /// A refinement that raises the energy is discarded.
    fn refine_boundary(
        &self,
        optimizer: &ConstrainedOptimizer<'_>,
        request: &MinimizationRequest<'_>,
        working: &mut DVector<f64>,
    ) -> Result<f64, EngineError> {
        let unrefined = request.objective.value(working)?;
        let budget = match self.config.refinement_budget() {
            Some(budget) if self.units.len() >= 2 && !self.boundary.is_empty() => budget,
            _ => return Ok(unrefined),
        };

        let started = Instant::now();
        let refined = optimizer.minimize(&self.boundary, working, budget)?;
        if refined.energy.is_some() {
            self.stats.record_minimization();
        }
        let refined_energy = request.objective.value(&refined.dofs)?;
        self.stats.record_time(Phase::Refinement, started.elapsed());

        if refined_energy <= unrefined {
            *working = refined.dofs;
            Ok(refined_energy)
        } else {
            debug!(
                refined_energy,
                unrefined, "Discarded boundary refinement that raised the energy."
            );
            Ok(unrefined)
        }
    }
}

/// Union over all unit pairs of the positions in one unit that interact with the other.
fn boundary_positions(units: &[CacheUnit], graph: &dyn InteractionGraph) -> Vec<Position> {
    let mut boundary = BTreeSet::new();
    for (a, b) in units.iter().tuple_combinations() {
        boundary.extend(graph.crossing(&a.positions, &b.positions));
        boundary.extend(graph.crossing(&b.positions, &a.positions));
    }
    boundary.into_iter().collect()
}

impl MinimizationStrategy for SubtreeCache {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Subtree
    }

    #[instrument(skip_all, name = "subtree_cache", fields(units = self.units.len()))]
    fn minimize(
        &self,
        request: &MinimizationRequest<'_>,
    ) -> Result<MinimizationOutcome, EngineError> {
        let started = Instant::now();
        self.stats.record_call();

        if self.units.is_empty() {
            self.stats.record_minimization();
            let outcome = full_minimization(request);
            self.stats.record_time(Phase::Total, started.elapsed());
            return outcome;
        }

        let keys = self
            .units
            .iter()
            .map(|unit| CacheKey::for_positions(request.conformation, &unit.positions))
            .collect::<Result<Vec<_>, _>>()?;

        let restore_started = Instant::now();
        let mut working = request.initial_dofs.clone();
        let mut pending: Vec<(&CacheUnit, CacheKey)> = Vec::new();
        for (unit, key) in self.units.iter().zip(keys) {
            let indices = request.dof_index.indices_for(&unit.positions);
            match self.store.get(&key) {
                Some(entry) if entry.local_dofs.len() == indices.len() => {
                    scatter(&mut working, &indices, &entry.local_dofs);
                    self.stats.record_hit();
                }
                Some(entry) => {
                    warn!(
                        cached = entry.local_dofs.len(),
                        resolved = indices.len(),
                        "Cached DOF count disagrees with the current conformation; re-minimizing unit."
                    );
                    self.stats.record_miss();
                    pending.push((unit, key));
                }
                None => {
                    self.stats.record_miss();
                    pending.push((unit, key));
                }
            }
        }
        self.stats
            .record_time(Phase::Restore, restore_started.elapsed());

        let fully_cached = pending.is_empty();
        let optimizer =
            ConstrainedOptimizer::new(request.objective, request.minimizer, request.dof_index);

        if !pending.is_empty() {
            let units_started = Instant::now();
            let minima = self.minimize_units(&optimizer, &pending, &working)?;
            for ((_, key), minimum) in pending.into_iter().zip(minima) {
                let local_dofs = minimum.local_values();
                scatter(&mut working, &minimum.indices, &local_dofs);
                let evicted = self.store.insert(
                    key,
                    Arc::new(CachedEntry {
                        local_dofs,
                        energy: minimum.energy,
                    }),
                );
                self.stats.record_insertion(evicted);
            }
            self.stats
                .record_time(Phase::UnitMinimization, units_started.elapsed());
        }

        let energy = self.refine_boundary(&optimizer, request, &mut working)?;
        self.stats.record_time(Phase::Total, started.elapsed());
        debug!(energy, fully_cached, "Subtree-cached minimization finished.");

        Ok(MinimizationOutcome {
            dofs: working,
            energy,
            fully_cached,
            fidelity: EnergyFidelity::Converged,
        })
    }

    fn clear(&self) {
        self.store.clear();
        self.stats.reset();
    }

    fn statistics(&self) -> CacheStatistics {
        self.stats
            .snapshot(StrategyKind::Subtree, self.store.len(), self.store.capacity())
    }
}

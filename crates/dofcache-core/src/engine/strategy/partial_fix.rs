use super::{EnergyFidelity, MinimizationOutcome, MinimizationRequest, MinimizationStrategy};
use crate::core::decomposition::DecompositionTree;
use crate::core::models::dofs::{gather, scatter};
use crate::core::models::ids::{NodeId, Position};
use crate::core::objective::IterationBudget;
use crate::engine::cache::{CacheKey, CachedEntry, EntryStore, SharedEntry};
use crate::engine::config::{CacheConfig, StrategyKind};
use crate::engine::error::EngineError;
use crate::engine::optimizer::ConstrainedOptimizer;
use crate::engine::stats::{CacheStatistics, Phase, StrategyRecorder};
use nalgebra::DVector;
use slotmap::SecondaryMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Caches the L-set DOFs of every internal node and re-optimizes its separator on each call.
///
/// The key ignores separator assignments, so conformations that differ only on a separator
/// still hit; the restored L-set values were minimized against a different separator context,
/// which is why energies from this strategy are upper bounds.
pub struct PartialFixCache {
    tree: Arc<DecompositionTree>,
    config: CacheConfig,
    l_sets: SecondaryMap<NodeId, Vec<Position>>,
    store: EntryStore,
    stats: StrategyRecorder,
}

struct Walk<'a, 'r> {
    request: &'r MinimizationRequest<'a>,
    optimizer: ConstrainedOptimizer<'a>,
    working: DVector<f64>,
    fully_cached: bool,
}

impl PartialFixCache {
    pub fn new(tree: Arc<DecompositionTree>, config: CacheConfig) -> Self {
        let mut l_sets = SecondaryMap::new();
        for (id, node) in tree.nodes() {
            if !node.is_leaf() {
                l_sets.insert(id, node.l_set());
            }
        }
        debug!(
            internal_nodes = l_sets.len(),
            "Initialized partial-fix cache."
        );

        Self {
            store: EntryStore::new(config.capacity),
            tree,
            config,
            l_sets,
            stats: StrategyRecorder::default(),
        }
    }

    pub fn tree(&self) -> &DecompositionTree {
        &self.tree
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

    fn visit(&self, id: NodeId, walk: &mut Walk<'_, '_>) -> Result<(), EngineError> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| EngineError::Internal(format!("decomposition node {id:?} is missing")))?;

        let Some((left, right)) = node.children() else {
            let started = Instant::now();
            let minimum = walk.optimizer.minimize(
                node.positions(),
                &walk.working,
                IterationBudget::Converge,
            )?;
            if minimum.energy.is_some() {
                self.stats.record_minimization();
                walk.fully_cached = false;
            }
            walk.working = minimum.dofs;
            self.stats
                .record_time(Phase::UnitMinimization, started.elapsed());
            return Ok(());
        };

        // An empty L-set would match every conformation.
        let l_set = self.l_sets.get(id).map_or(&[][..], Vec::as_slice);
        if l_set.is_empty() {
            self.visit(left, walk)?;
            self.visit(right, walk)?;
        } else {
            let key = CacheKey::for_positions(walk.request.conformation, l_set)?;
            let indices = walk.request.dof_index.indices_for(key.positions());
            let restore_started = Instant::now();
            let restored = match self.store.get(&key) {
                Some(entry) if entry.local_dofs.len() == indices.len() => {
                    scatter(&mut walk.working, &indices, &entry.local_dofs);
                    self.stats.record_hit();
                    true
                }
                _ => {
                    self.stats.record_miss();
                    false
                }
            };
            self.stats
                .record_time(Phase::Restore, restore_started.elapsed());

            if !restored {
                walk.fully_cached = false;
                self.visit(left, walk)?;
                self.visit(right, walk)?;
                let evicted = self.store.insert(
                    key,
                    Arc::new(CachedEntry {
                        local_dofs: gather(&walk.working, &indices),
                        energy: None,
                    }),
                );
                self.stats.record_insertion(evicted);
            }
        }

        if !node.separator().is_empty() {
            let started = Instant::now();
            let minimum = walk.optimizer.minimize(
                node.separator(),
                &walk.working,
                self.config.separator_budget(),
            )?;
            if minimum.energy.is_some() {
                self.stats.record_minimization();
            }
            walk.working = minimum.dofs;
            self.stats.record_time(Phase::Refinement, started.elapsed());
        }
        Ok(())
    }
}

impl MinimizationStrategy for PartialFixCache {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PartialFix
    }

    #[instrument(skip_all, name = "partial_fix_cache", fields(nodes = self.tree.node_count()))]
    fn minimize(
        &self,
        request: &MinimizationRequest<'_>,
    ) -> Result<MinimizationOutcome, EngineError> {
        let started = Instant::now();
        self.stats.record_call();

        let mut walk = Walk {
            request,
            optimizer: ConstrainedOptimizer::new(
                request.objective,
                request.minimizer,
                request.dof_index,
            ),
            working: request.initial_dofs.clone(),
            fully_cached: true,
        };
        self.visit(self.tree.root(), &mut walk)?;

        let energy = request.objective.value(&walk.working)?;
        let fidelity = if self.tree.root_node().is_leaf() {
            EnergyFidelity::Converged
        } else {
            EnergyFidelity::UpperBound
        };
        self.stats.record_time(Phase::Total, started.elapsed());
        debug!(
            energy,
            fully_cached = walk.fully_cached,
            "Partial-fix minimization finished."
        );

        Ok(MinimizationOutcome {
            dofs: walk.working,
            energy,
            fully_cached: walk.fully_cached,
            fidelity,
        })
    }

    fn clear(&self) {
        self.store.clear();
        self.stats.reset();
    }

    fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot(
            StrategyKind::PartialFix,
            self.store.len(),
            self.store.capacity(),
        )
    }
}

use super::config::{CacheConfig, ConfigError, StrategyKind};
use super::error::EngineError;
use super::stats::{ContextRecorder, ContextStatistics};
use super::strategy::{MinimizationStrategy, PartialFixCache, SubtreeCache};
use crate::core::decomposition::{DecompositionTree, InteractionGraph, SequentialNeighbors, TreeDecomposer};
use crate::core::models::space::{ConformationSpace, SpaceId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Long-lived caching state of one conformation space.
///
/// Owns the space's decomposition tree and up to one instance of each caching strategy.
/// Strategies are created lazily on first use; concurrent first accesses initialize exactly
/// once and every caller observes the same instance.
pub struct CacheContext {
    space: ConformationSpace,
    config: CacheConfig,
    graph: Arc<dyn InteractionGraph>,
    tree: Arc<DecompositionTree>,
    subtree: OnceLock<SubtreeCache>,
    partial_fix: OnceLock<PartialFixCache>,
    recorder: ContextRecorder,
}

impl CacheContext {
    pub fn new(
        space: ConformationSpace,
        graph: Arc<dyn InteractionGraph>,
        config: CacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tree = TreeDecomposer::new(graph.as_ref())
            .with_leaf_size(config.leaf_size)
            .decompose_count(space.num_positions());
        info!(
            space = %space.id(),
            positions = space.num_positions(),
            nodes = tree.node_count(),
            branch_width = tree.branch_width(),
            strategy = %config.strategy,
            "Created cache context."
        );

        Ok(Self {
            space,
            config,
            graph,
            tree: Arc::new(tree),
            subtree: OnceLock::new(),
            partial_fix: OnceLock::new(),
            recorder: ContextRecorder::default(),
        })
    }

    /// Context over the default sequential-neighbor interaction graph.
    pub fn with_sequential_neighbors(
        space: ConformationSpace,
        config: CacheConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(space, Arc::new(SequentialNeighbors), config)
    }

    pub fn space(&self) -> &ConformationSpace {
        &self.space
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn tree(&self) -> &DecompositionTree {
        &self.tree
    }

    pub fn graph(&self) -> &dyn InteractionGraph {
        self.graph.as_ref()
    }

    /// The configured strategy, initializing it on first use.
    pub fn strategy(&self) -> &dyn MinimizationStrategy {
        self.initialize(self.config.strategy)
    }

    /// Initializes the strategy of `kind` if needed and returns it. Idempotent.
    pub fn initialize(&self, kind: StrategyKind) -> &dyn MinimizationStrategy {
        match kind {
            StrategyKind::Subtree => self.subtree.get_or_init(|| {
                debug!(space = %self.space.id(), "Initializing subtree cache.");
                SubtreeCache::new(
                    Arc::clone(&self.tree),
                    self.graph.as_ref(),
                    self.config.clone(),
                )
            }),
            StrategyKind::PartialFix => self.partial_fix.get_or_init(|| {
                debug!(space = %self.space.id(), "Initializing partial-fix cache.");
                PartialFixCache::new(Arc::clone(&self.tree), self.config.clone())
            }),
        }
    }

    pub fn is_initialized(&self, kind: StrategyKind) -> bool {
        match kind {
            StrategyKind::Subtree => self.subtree.get().is_some(),
            StrategyKind::PartialFix => self.partial_fix.get().is_some(),
        }
    }

    /// Drops every cached entry of every initialized strategy and resets all counters.
    /// The tree is kept.
    pub fn clear(&self) {
        if let Some(cache) = self.subtree.get() {
            cache.clear();
        }
        if let Some(cache) = self.partial_fix.get() {
            cache.clear();
        }
        self.recorder.reset();
        info!(space = %self.space.id(), "Cleared cache context.");
    }

    /// Snapshot of all counters. Never fails, including before any strategy was initialized.
    pub fn statistics(&self) -> ContextStatistics {
        let strategies = self
            .subtree
            .get()
            .map(|cache| cache.statistics())
            .into_iter()
            .chain(self.partial_fix.get().map(|cache| cache.statistics()))
            .collect();
        ContextStatistics::collect(
            &self.recorder,
            self.space.id(),
            self.space.num_positions(),
            self.tree.node_count(),
            self.tree.branch_width(),
            strategies,
        )
    }

    pub(crate) fn recorder(&self) -> &ContextRecorder {
        &self.recorder
    }
}

/// Race-safe get-or-create of [`CacheContext`]s keyed by [`SpaceId`].
#[derive(Default)]
pub struct ContextRegistry {
    contexts: RwLock<HashMap<SpaceId, Arc<CacheContext>>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context registered for `space.id()`, creating it if absent.
    ///
    /// Concurrent callers racing on the same id all receive the same instance. Registering a
    /// different space under an existing id fails with [`EngineError::SpaceConflict`].
    pub fn get_or_create(
        &self,
        space: &ConformationSpace,
        graph: Arc<dyn InteractionGraph>,
        config: &CacheConfig,
    ) -> Result<Arc<CacheContext>, EngineError> {
        {
            let contexts = self.contexts.read();
            if let Some(context) = contexts.get(&space.id()) {
                return Self::check_same_space(context, space);
            }
        }

        let mut contexts = self.contexts.write();
        if let Some(context) = contexts.get(&space.id()) {
            return Self::check_same_space(context, space);
        }
        let context = Arc::new(CacheContext::new(space.clone(), graph, config.clone())?);
        contexts.insert(space.id(), Arc::clone(&context));
        Ok(context)
    }

    fn check_same_space(
        context: &Arc<CacheContext>,
        space: &ConformationSpace,
    ) -> Result<Arc<CacheContext>, EngineError> {
        if context.space() == space {
            Ok(Arc::clone(context))
        } else {
            Err(EngineError::SpaceConflict { id: space.id() })
        }
    }

    pub fn get(&self, id: SpaceId) -> Option<Arc<CacheContext>> {
        self.contexts.read().get(&id).cloned()
    }

    pub fn remove(&self, id: SpaceId) -> Option<Arc<CacheContext>> {
        self.contexts.write().remove(&id)
    }

    /// Clears every registered context without unregistering it.
    pub fn clear_all(&self) {
        for context in self.contexts.read().values() {
            context.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

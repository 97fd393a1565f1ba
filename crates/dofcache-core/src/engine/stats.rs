use super::config::StrategyKind;
use crate::core::models::space::SpaceId;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Restore,
    UnitMinimization,
    Refinement,
    Total,
}

/// Lock-free counters updated on the hot path by one caching strategy.
#[derive(Debug, Default)]
pub(crate) struct StrategyRecorder {
    calls: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    minimizations: AtomicU64,
    restore_nanos: AtomicU64,
    unit_nanos: AtomicU64,
    refine_nanos: AtomicU64,
    total_nanos: AtomicU64,
}

impl StrategyRecorder {
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insertion(&self, evicted: usize) {
        self.insertions.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn record_minimization(&self) {
        self.minimizations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_time(&self, phase: Phase, elapsed: Duration) {
        let counter = match phase {
            Phase::Restore => &self.restore_nanos,
            Phase::UnitMinimization => &self.unit_nanos,
            Phase::Refinement => &self.refine_nanos,
            Phase::Total => &self.total_nanos,
        };
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        counter.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for counter in [
            &self.calls,
            &self.hits,
            &self.misses,
            &self.insertions,
            &self.evictions,
            &self.minimizations,
            &self.restore_nanos,
            &self.unit_nanos,
            &self.refine_nanos,
            &self.total_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, strategy: StrategyKind, entries: usize, capacity: usize) -> CacheStatistics {
        let ms = |counter: &AtomicU64| counter.load(Ordering::Relaxed) as f64 / 1e6;
        CacheStatistics {
            strategy,
            calls: self.calls.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            minimizer_invocations: self.minimizations.load(Ordering::Relaxed),
            entries,
            capacity,
            timing: TimingBreakdown {
                restore_ms: ms(&self.restore_nanos),
                unit_minimization_ms: ms(&self.unit_nanos),
                refinement_ms: ms(&self.refine_nanos),
                total_ms: ms(&self.total_nanos),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimingBreakdown {
    pub restore_ms: f64,
    pub unit_minimization_ms: f64,
    /// Boundary refinement for the subtree strategy, separator re-optimization for the
    /// partial-fix strategy.
    pub refinement_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub strategy: StrategyKind,
    pub calls: u64,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub minimizer_invocations: u64,
    pub entries: usize,
    pub capacity: usize,
    pub timing: TimingBreakdown,
}

impl CacheStatistics {
    pub fn empty(strategy: StrategyKind, capacity: usize) -> Self {
        Self {
            strategy,
            calls: 0,
            hits: 0,
            misses: 0,
            insertions: 0,
            evictions: 0,
            minimizer_invocations: 0,
            entries: 0,
            capacity,
            timing: TimingBreakdown::default(),
        }
    }

    /// Fraction of unit lookups served from cache; 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.strategy)?;
        writeln!(f, "  calls:        {}", self.calls)?;
        writeln!(
            f,
            "  lookups:      {} hits / {} misses ({:.1}% hit rate)",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "  entries:      {} / {} ({} inserted, {} evicted)",
            self.entries, self.capacity, self.insertions, self.evictions
        )?;
        writeln!(f, "  minimizer:    {} invocations", self.minimizer_invocations)?;
        write!(
            f,
            "  timing (ms):  restore {:.3}, units {:.3}, refinement {:.3}, total {:.3}",
            self.timing.restore_ms,
            self.timing.unit_minimization_ms,
            self.timing.refinement_ms,
            self.timing.total_ms
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct ContextRecorder {
    calls: AtomicU64,
    fallbacks: AtomicU64,
    fragment_bypasses: AtomicU64,
    unresolved_dofs: AtomicU64,
}

impl ContextRecorder {
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fragment_bypass(&self) {
        self.fragment_bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unresolved(&self, count: usize) {
        self.unresolved_dofs.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.fragment_bypasses.store(0, Ordering::Relaxed);
        self.unresolved_dofs.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of one [`super::context::CacheContext`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextStatistics {
    pub space: SpaceId,
    pub positions: usize,
    pub tree_nodes: usize,
    pub branch_width: usize,
    pub calls: u64,
    pub fallbacks: u64,
    pub fragment_bypasses: u64,
    pub unresolved_dofs: u64,
    pub strategies: Vec<CacheStatistics>,
}

impl ContextStatistics {
    pub(crate) fn collect(
        recorder: &ContextRecorder,
        space: SpaceId,
        positions: usize,
        tree_nodes: usize,
        branch_width: usize,
        strategies: Vec<CacheStatistics>,
    ) -> Self {
        Self {
            space,
            positions,
            tree_nodes,
            branch_width,
            calls: recorder.calls.load(Ordering::Relaxed),
            fallbacks: recorder.fallbacks.load(Ordering::Relaxed),
            fragment_bypasses: recorder.fragment_bypasses.load(Ordering::Relaxed),
            unresolved_dofs: recorder.unresolved_dofs.load(Ordering::Relaxed),
            strategies,
        }
    }

    pub fn strategy(&self, kind: StrategyKind) -> Option<&CacheStatistics> {
        self.strategies.iter().find(|s| s.strategy == kind)
    }

    /// TOML rendering for export; falls back to the plain-text rendering if serialization
    /// fails.
    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for ContextStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cache statistics for {} ({} positions, {} tree nodes, branch width {})",
            self.space, self.positions, self.tree_nodes, self.branch_width
        )?;
        writeln!(
            f,
            "  calls: {}, fallbacks: {}, fragment bypasses: {}, unresolved DOFs: {}",
            self.calls, self.fallbacks, self.fragment_bypasses, self.unresolved_dofs
        )?;
        if self.strategies.is_empty() {
            write!(f, "  no cache initialized")?;
        }
        for (i, strategy) in self.strategies.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{strategy}")?;
        }
        Ok(())
    }
}

//! # dofcache
//!
//! Subtree-decomposition caching for repeated continuous minimization of rotamer
//! conformations over a fixed set of design positions.
//!
//! Many conformations enumerated by a combinatorial search share identical rotamer
//! assignments over large position subsets. This library decomposes the design positions
//! into a balanced tree of nested subtrees once per conformation space, and reuses
//! previously minimized degree-of-freedom (DOF) vectors for every subtree whose local
//! assignment has been seen before. Only new or boundary material is re-optimized.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless models (`ConformationSpace`, `Conformation`,
//!   `DofIndex`), the static `TreeDecomposer`, and the boundary traits for the external
//!   objective function and minimizer.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the LRU entry store, the
//!   `ConstrainedOptimizer`, and the two interchangeable caching strategies
//!   (`SubtreeCache` and `PartialFixCache`) owned by a per-space `CacheContext`.
//!
//! - **[`workflows`]: The Public API.** [`workflows::minimize::minimize_with_cache`], the
//!   hot-path entry point that handles fragment bypass, conformation validation and the
//!   full-minimization fallback.
//!
//! Cached results trade bounded optimality slack for reuse. Every outcome reports whether it
//! was fully served from cache and whether its energy is a converged minimum or a provisional
//! upper bound, so the trade-off stays auditable.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;

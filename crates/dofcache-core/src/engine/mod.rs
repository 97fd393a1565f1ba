//! # Engine Module
//!
//! This module implements the caching engine that sits between a combinatorial search and
//! its continuous minimizer.
//!
//! ## Overview
//!
//! A [`context::CacheContext`] is created once per conformation space. It owns the space's
//! decomposition tree and lazily initializes one caching strategy per [`config::StrategyKind`].
//! Each strategy keys minimized DOF sub-vectors by the local rotamer assignment of a tree
//! node, stores them in a bounded LRU store, and reassembles full DOF vectors from cached and
//! freshly minimized pieces.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Strategy selection, capacities and refinement budgets
//! - **Entry Store** ([`cache`]) - Cache keys, entries and the thread-safe LRU store
//! - **Constrained Optimization** ([`optimizer`]) - Minimizing a DOF subset with all other DOFs frozen
//! - **Strategies** ([`strategy`]) - Subtree caching and partial-fix caching
//! - **Context** ([`context`]) - Per-space ownership of tree, strategies and statistics
//! - **Statistics** ([`stats`]) - Hit/miss counters, timing breakdowns and exports
//! - **Error Handling** ([`error`]) - Engine-level error type and recoverability

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod optimizer;
pub mod stats;
pub mod strategy;

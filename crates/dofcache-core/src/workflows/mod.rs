//! # Workflows Module
//!
//! High-level entry points that tie a [`crate::engine::context::CacheContext`] to the caller's
//! objective and minimizer.
//!
//! - **Cached Minimization** ([`minimize`]) - The hot-path call made once per candidate
//!   conformation by a combinatorial search. Handles fragment bypass, validation against the
//!   conformation space, unresolved-DOF accounting and the full-minimization fallback.

pub mod minimize;

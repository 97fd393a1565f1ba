//! # Core Module
//!
//! Stateless building blocks shared by every caching strategy.
//!
//! - **Models** ([`models`]) - Positions, conformation spaces, conformations and the
//!   conformation-dependent mapping between positions and DOF indices.
//! - **Decomposition** ([`decomposition`]) - Interaction graphs and the balanced tree
//!   decomposition with minimal separators.
//! - **Objective** ([`objective`]) - The boundary of the external energy function and
//!   minimizer collaborators.
//! - **Minimizer** ([`minimizer`]) - A reference bounded coordinate-descent minimizer.

pub mod decomposition;
pub mod minimizer;
pub mod models;
pub mod objective;

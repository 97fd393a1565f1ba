//! # Core Models Module
//!
//! Data structures describing what is being minimized.
//!
//! - [`ids`] - Position, rotamer-class and tree-node identifiers
//! - [`space`] - The fixed, ordered design-position list of one conformation space
//! - [`conformation`] - Full or partial rotamer-class assignments
//! - [`dofs`] - Conformation-dependent DOF ownership and per-call DOF index

pub mod conformation;
pub mod dofs;
pub mod ids;
pub mod space;

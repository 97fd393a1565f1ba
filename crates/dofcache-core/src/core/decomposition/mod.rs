//! # Decomposition Module
//!
//! Static partitioning of the design positions into a balanced binary tree of nested
//! subtrees. Each internal node records the separator: the positions of either half that
//! interact with the other half. Separators and subtree boundaries are computed from a
//! pluggable [`graph::InteractionGraph`]; sequential-neighbor adjacency is only a placeholder
//! default and carries no physical meaning.

pub mod graph;
pub mod tree;

pub use graph::{AdjacencyGraph, InteractionGraph, SequentialNeighbors};
pub use tree::{DecompositionNode, DecompositionTree, TreeDecomposer, DEFAULT_LEAF_SIZE};

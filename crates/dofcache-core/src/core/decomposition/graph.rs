use crate::core::models::ids::Position;
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::fmt::Debug;

pub trait InteractionGraph: Send + Sync + Debug {
    fn interacts(&self, a: Position, b: Position) -> bool;

    /// Positions of `from` with at least one edge into `to`, in `from` order.
    fn crossing(&self, from: &[Position], to: &[Position]) -> Vec<Position> {
        from.iter()
            .copied()
            .filter(|&a| to.iter().any(|&b| a != b && self.interacts(a, b)))
            .collect()
    }
}

/// Positions `i` and `j` interact iff `|i - j| == 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialNeighbors;

impl InteractionGraph for SequentialNeighbors {
    fn interacts(&self, a: Position, b: Position) -> bool {
        a.abs_diff(b) == 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraph {
    edges: HashSet<(Position, Position)>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (Position, Position)>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    /// Connects every pair whose absolute pairwise interaction energy reaches `cutoff`.
    pub fn from_pair_energies(energies: &DMatrix<f64>, cutoff: f64) -> Self {
        let n = energies.nrows().min(energies.ncols());
        let mut graph = Self::new();
        for a in 0..n {
            for b in (a + 1)..n {
                let strength = energies[(a, b)].abs().max(energies[(b, a)].abs());
                if strength >= cutoff {
                    graph.add_edge(a, b);
                }
            }
        }
        graph
    }

    pub fn add_edge(&mut self, a: Position, b: Position) {
        if a != b {
            self.edges.insert((a.min(b), a.max(b)));
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn degree(&self, position: Position) -> usize {
        self.edges
            .iter()
            .filter(|&&(a, b)| a == position || b == position)
            .count()
    }
}

impl InteractionGraph for AdjacencyGraph {
    fn interacts(&self, a: Position, b: Position) -> bool {
        self.edges.contains(&(a.min(b), a.max(b)))
    }
}

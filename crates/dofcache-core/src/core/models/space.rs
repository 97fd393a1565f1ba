use super::ids::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpaceId(u64);

impl SpaceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space-{}", self.0)
    }
}

/// The ordered design positions of one conformation space together with the number of
/// candidate rotamer classes at each position.
///
/// Only used to size and construct the decomposition tree and to validate incoming
/// conformations; cache keys from two different spaces are never comparable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformationSpace {
    id: SpaceId,
    candidate_counts: Vec<usize>,
}

impl ConformationSpace {
    pub fn new(id: SpaceId, candidate_counts: Vec<usize>) -> Self {
        Self {
            id,
            candidate_counts,
        }
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn num_positions(&self) -> usize {
        self.candidate_counts.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        0..self.candidate_counts.len()
    }

    pub fn candidate_count(&self, position: Position) -> Option<usize> {
        self.candidate_counts.get(position).copied()
    }

    pub fn candidate_counts(&self) -> &[usize] {
        &self.candidate_counts
    }

    /// Number of full conformations in the space, saturating at `u128::MAX`.
    pub fn size(&self) -> u128 {
        self.candidate_counts
            .iter()
            .fold(1u128, |acc, &count| acc.saturating_mul(count as u128))
    }
}

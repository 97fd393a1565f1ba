use super::ids::{Position, RotamerClass};
use super::space::ConformationSpace;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConformationError {
    #[error("Position {position} is required but the conformation has only {slots} slot(s)")]
    MissingPosition { position: Position, slots: usize },

    #[error("Position {position} is unassigned in this conformation")]
    Unassigned { position: Position },

    #[error("Rotamer class {rc} at position {position} is out of range ({candidates} candidates)")]
    RotamerOutOfRange {
        position: Position,
        rc: RotamerClass,
        candidates: usize,
    },

    #[error("Conformation has {found} slots but the space has {expected} positions")]
    SlotCount { expected: usize, found: usize },
}

/// A full or partial assignment of rotamer classes to positions.
///
/// Slot `i` holds the rotamer class of position `i`, or `None` when the position is
/// unassigned. A conformation with any unassigned slot is a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conformation {
    slots: Vec<Option<RotamerClass>>,
}

impl Conformation {
    pub fn full<I>(rcs: I) -> Self
    where
        I: IntoIterator<Item = RotamerClass>,
    {
        Self {
            slots: rcs.into_iter().map(Some).collect(),
        }
    }

    pub fn fragment<I>(num_positions: usize, assignments: I) -> Self
    where
        I: IntoIterator<Item = (Position, RotamerClass)>,
    {
        let mut slots = vec![None; num_positions];
        for (position, rc) in assignments {
            if position >= slots.len() {
                slots.resize(position + 1, None);
            }
            slots[position] = Some(rc);
        }
        Self { slots }
    }

    pub fn from_slots(slots: Vec<Option<RotamerClass>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_fragment(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    pub fn rc_at(&self, position: Position) -> Option<RotamerClass> {
        self.slots.get(position).copied().flatten()
    }

    pub fn assigned(&self) -> impl Iterator<Item = (Position, RotamerClass)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(position, rc)| rc.map(|rc| (position, rc)))
    }

    /// Rotamer classes at `positions`, in the given order.
    ///
    /// Fails if any requested position is absent from or unassigned in this conformation.
    pub fn rcs_for(&self, positions: &[Position]) -> Result<Vec<RotamerClass>, ConformationError> {
        positions
            .iter()
            .map(|&position| match self.slots.get(position) {
                Some(Some(rc)) => Ok(*rc),
                Some(None) => Err(ConformationError::Unassigned { position }),
                None => Err(ConformationError::MissingPosition {
                    position,
                    slots: self.slots.len(),
                }),
            })
            .collect()
    }

    /// Checks slot count and rotamer-class ranges against `space`.
    ///
    /// Unassigned slots are accepted; callers decide separately how fragments are routed.
    pub fn check_against(&self, space: &ConformationSpace) -> Result<(), ConformationError> {
        let expected = space.num_positions();
        if self.slots.len() > expected {
            return Err(ConformationError::SlotCount {
                expected,
                found: self.slots.len(),
            });
        }
        if self.slots.len() < expected {
            return Err(ConformationError::MissingPosition {
                position: self.slots.len(),
                slots: self.slots.len(),
            });
        }
        for (position, rc) in self.assigned() {
            let candidates = space.candidate_count(position).unwrap_or(0);
            if rc >= candidates {
                return Err(ConformationError::RotamerOutOfRange {
                    position,
                    rc,
                    candidates,
                });
            }
        }
        Ok(())
    }
}

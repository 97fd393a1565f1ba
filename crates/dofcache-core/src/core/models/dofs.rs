use super::conformation::Conformation;
use super::ids::{Position, RotamerClass};
use crate::core::objective::ObjectiveFunction;
use nalgebra::DVector;

/// Per-position, per-rotamer-class DOF counts.
///
/// Different rotamer classes carry different numbers of continuous DOFs, so which entries of
/// a DOF vector belong to which position depends on the conformation. The layout packs the
/// DOFs of assigned positions contiguously in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotamerDofLayout {
    counts: Vec<Vec<usize>>,
}

impl RotamerDofLayout {
    pub fn new(counts: Vec<Vec<usize>>) -> Self {
        Self { counts }
    }

    pub fn uniform(num_positions: usize, num_rcs: usize, dofs_per_rc: usize) -> Self {
        Self {
            counts: vec![vec![dofs_per_rc; num_rcs]; num_positions],
        }
    }

    pub fn num_positions(&self) -> usize {
        self.counts.len()
    }

    pub fn dof_count(&self, position: Position, rc: RotamerClass) -> Option<usize> {
        self.counts.get(position).and_then(|rcs| rcs.get(rc)).copied()
    }

    /// Owner position of every DOF of `conformation`, in vector order.
    ///
    /// Positions unknown to the layout contribute no DOFs.
    pub fn owners(&self, conformation: &Conformation) -> Vec<Position> {
        conformation
            .assigned()
            .flat_map(|(position, rc)| {
                let count = self.dof_count(position, rc).unwrap_or(0);
                std::iter::repeat_n(position, count)
            })
            .collect()
    }

    pub fn total_dofs(&self, conformation: &Conformation) -> usize {
        conformation
            .assigned()
            .map(|(position, rc)| self.dof_count(position, rc).unwrap_or(0))
            .sum()
    }
}

/// Conformation-scoped lookup from positions to DOF indices.
///
/// Built once per minimization call from the objective's ownership metadata and passed down
/// to every constrained optimization, instead of re-resolving ownership per access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofIndex {
    by_position: Vec<Vec<usize>>,
    unresolved: Vec<usize>,
    num_dofs: usize,
}

impl DofIndex {
    /// Builds the index from the owner of every DOF, in vector order.
    ///
    /// DOFs without an owner, or owned by a position outside `0..num_positions`, are recorded
    /// as unresolved and never belong to any position: they stay at their fixed initial value.
    pub fn from_owners<I>(owners: I, num_positions: usize) -> Self
    where
        I: IntoIterator<Item = Option<Position>>,
    {
        let mut by_position = vec![Vec::new(); num_positions];
        let mut unresolved = Vec::new();
        let mut num_dofs = 0;
        for (dof, owner) in owners.into_iter().enumerate() {
            num_dofs += 1;
            match owner {
                Some(position) if position < num_positions => by_position[position].push(dof),
                _ => unresolved.push(dof),
            }
        }
        Self {
            by_position,
            unresolved,
            num_dofs,
        }
    }

    pub fn for_objective(objective: &dyn ObjectiveFunction, num_positions: usize) -> Self {
        Self::from_owners(
            (0..objective.num_dofs()).map(|dof| objective.dof_owner(dof)),
            num_positions,
        )
    }

    pub fn position_dofs(&self, position: Position) -> &[usize] {
        self.by_position
            .get(position)
            .map_or(&[][..], |dofs| dofs.as_slice())
    }

    /// DOF indices of `positions`, concatenated in the order the positions are given.
    pub fn indices_for(&self, positions: &[Position]) -> Vec<usize> {
        positions
            .iter()
            .flat_map(|&position| self.position_dofs(position).iter().copied())
            .collect()
    }

    pub fn unresolved(&self) -> &[usize] {
        &self.unresolved
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }
}

pub fn gather(dofs: &DVector<f64>, indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| dofs[i]).collect()
}

pub fn scatter(dofs: &mut DVector<f64>, indices: &[usize], values: &[f64]) {
    debug_assert_eq!(indices.len(), values.len());
    for (&i, &value) in indices.iter().zip(values) {
        dofs[i] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varied_layout() -> RotamerDofLayout {
        RotamerDofLayout::new(vec![vec![1, 2], vec![0, 3], vec![2, 2]])
    }

    #[test]
    fn owners_depend_on_assigned_rotamers() {
        let layout = varied_layout();
        let a = Conformation::full([0, 1, 0]);
        let b = Conformation::full([1, 0, 0]);
        assert_eq!(layout.owners(&a), vec![0, 1, 1, 1, 2, 2]);
        assert_eq!(layout.owners(&b), vec![0, 0, 2, 2]);
        assert_eq!(layout.total_dofs(&b), 4);
    }

    #[test]
    fn owners_skip_unassigned_positions() {
        let layout = varied_layout();
        let fragment = Conformation::fragment(3, [(2, 1)]);
        assert_eq!(layout.owners(&fragment), vec![2, 2]);
    }

    #[test]
    fn index_groups_dofs_by_position() {
        let index = DofIndex::from_owners([0, 1, 1, 1, 2, 2].map(Some), 3);
        assert_eq!(index.position_dofs(1), &[1, 2, 3]);
        assert_eq!(index.indices_for(&[2, 0]), vec![4, 5, 0]);
        assert_eq!(index.num_dofs(), 6);
        assert_eq!(index.unresolved_count(), 0);
    }

    #[test]
    fn index_records_unresolved_dofs() {
        let index = DofIndex::from_owners([Some(0), None, Some(7), Some(1)], 2);
        assert_eq!(index.unresolved(), &[1, 2]);
        assert_eq!(index.indices_for(&[0, 1]), vec![0, 3]);
    }

    #[test]
    fn position_without_dofs_resolves_to_empty_slice() {
        let index = DofIndex::from_owners([Some(0)], 2);
        assert!(index.position_dofs(1).is_empty());
        assert!(index.position_dofs(9).is_empty());
    }

    #[test]
    fn scatter_writes_values_at_indices() {
        let mut dofs = DVector::from_vec(vec![0.0; 4]);
        scatter(&mut dofs, &[3, 1], &[1.5, -2.0]);
        assert_eq!(dofs.as_slice(), &[0.0, -2.0, 0.0, 1.5]);
        assert_eq!(gather(&dofs, &[1, 3]), vec![-2.0, 1.5]);
    }
}

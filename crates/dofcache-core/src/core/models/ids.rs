use slotmap::new_key_type;

/// Index into the fixed, ordered design-position list of a conformation space.
pub type Position = usize;

/// Index of a rotamer class ("RC") among a position's candidates.
pub type RotamerClass = usize;

new_key_type! {
    pub struct NodeId;
}

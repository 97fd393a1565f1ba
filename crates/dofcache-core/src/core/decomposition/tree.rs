use super::graph::InteractionGraph;
use crate::core::models::ids::{NodeId, Position};
use slotmap::SlotMap;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_LEAF_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionNode {
    positions: Vec<Position>,
    separator: Vec<Position>,
    children: Option<(NodeId, NodeId)>,
}

impl DecompositionNode {
    /// Sorted positions covered by this subtree.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Sorted separator (M-set); empty for leaves.
    pub fn separator(&self) -> &[Position] {
        &self.separator
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    pub fn left(&self) -> Option<NodeId> {
        self.children.map(|(left, _)| left)
    }

    pub fn right(&self) -> Option<NodeId> {
        self.children.map(|(_, right)| right)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Positions of this subtree outside its separator (L-set), sorted.
    pub fn l_set(&self) -> Vec<Position> {
        self.positions
            .iter()
            .copied()
            .filter(|p| self.separator.binary_search(p).is_err())
            .collect()
    }
}

/// Immutable balanced binary decomposition of a position set.
#[derive(Debug, Clone)]
pub struct DecompositionTree {
    nodes: SlotMap<NodeId, DecompositionNode>,
    root: NodeId,
    branch_width: usize,
    leaf_size: usize,
}

impl DecompositionTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &DecompositionNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: NodeId) -> Option<&DecompositionNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DecompositionNode)> {
        self.nodes.iter()
    }

    /// Maximum separator size over all internal nodes; 0 for a single-leaf tree.
    pub fn branch_width(&self) -> usize {
        self.branch_width
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_positions(&self) -> usize {
        self.root_node().positions.len()
    }

    pub fn depth(&self) -> usize {
        fn depth_of(tree: &DecompositionTree, id: NodeId) -> usize {
            match tree.nodes[id].children {
                Some((left, right)) => 1 + depth_of(tree, left).max(depth_of(tree, right)),
                None => 1,
            }
        }
        depth_of(self, self.root)
    }

    /// Node ids in post-order (left subtree, right subtree, node).
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            match self.nodes[id].children {
                Some((left, right)) if !expanded => {
                    stack.push((id, true));
                    stack.push((right, false));
                    stack.push((left, false));
                }
                _ => order.push(id),
            }
        }
        order
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.post_order()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// Disjoint cache units covering every position: the shallowest subtrees holding at most
    /// `max_unit_size` positions (or leaves), left to right.
    ///
    /// A node is never split into a single-position unit; it stays whole instead. Empty when
    /// the root itself is a leaf; such a space is too small to decompose.
    pub fn units(&self, max_unit_size: usize) -> Vec<NodeId> {
        if self.root_node().is_leaf() {
            return Vec::new();
        }
        let mut units = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            match node.children {
                Some((left, right))
                    if (node.positions.len() > max_unit_size || id == self.root)
                        && self.nodes[left].positions.len() >= 2
                        && self.nodes[right].positions.len() >= 2 =>
                {
                    stack.push(right);
                    stack.push(left);
                }
                _ => units.push(id),
            }
        }
        units
    }
}

/// Builds a [`DecompositionTree`] by recursive midpoint bisection of the sorted positions.
#[derive(Debug, Clone, Copy)]
pub struct TreeDecomposer<'g> {
    graph: &'g dyn InteractionGraph,
    leaf_size: usize,
}

impl<'g> TreeDecomposer<'g> {
    pub fn new(graph: &'g dyn InteractionGraph) -> Self {
        Self {
            graph,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
        self
    }

    pub fn decompose_count(&self, num_positions: usize) -> DecompositionTree {
        let positions: Vec<Position> = (0..num_positions).collect();
        self.decompose(&positions)
    }

    pub fn decompose(&self, positions: &[Position]) -> DecompositionTree {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut nodes = SlotMap::with_key();
        let mut branch_width = 0;
        let root = self.build(&mut nodes, sorted, &mut branch_width);

        let tree = DecompositionTree {
            nodes,
            root,
            branch_width,
            leaf_size: self.leaf_size,
        };
        debug!(
            positions = tree.num_positions(),
            nodes = tree.node_count(),
            branch_width,
            "Built decomposition tree."
        );
        tree
    }

    fn build(
        &self,
        nodes: &mut SlotMap<NodeId, DecompositionNode>,
        positions: Vec<Position>,
        branch_width: &mut usize,
    ) -> NodeId {
        if positions.len() <= self.leaf_size {
            return nodes.insert(DecompositionNode {
                positions,
                separator: Vec::new(),
                children: None,
            });
        }

        let mid = positions.len() / 2;
        let (left_half, right_half) = positions.split_at(mid);

        let separator: Vec<Position> = self
            .graph
            .crossing(left_half, right_half)
            .into_iter()
            .chain(self.graph.crossing(right_half, left_half))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        *branch_width = (*branch_width).max(separator.len());

        let left = self.build(nodes, left_half.to_vec(), branch_width);
        let right = self.build(nodes, right_half.to_vec(), branch_width);

        nodes.insert(DecompositionNode {
            positions,
            separator,
            children: Some((left, right)),
        })
    }
}

//! A height balanced Binary Search Tree.
//!
//! Every node stores the height of its subtree and its balance factor,
//! `height(left) - height(right)`. Whenever an insertion or deletion pushes a
//! balance factor outside of `-1..=1`, one or two rotations restore it on the
//! way back up to the root.
//!
//! See <https://en.wikipedia.org/wiki/AVL_tree#Rebalancing> for terminology.

use std::cmp::Ordering;

use crate::arena::{Arena, NodeId};
use crate::binary;
use crate::config::TreeKind;
use crate::error::TreeError;
use crate::layout::LayoutConfig;
use crate::node::AvlNode;
use crate::snapshot::Snapshot;
use crate::trace::{StepKind, StepTrace};
use crate::{Engine, Key};

/// A height balanced Binary Search Tree.
#[derive(Clone, Debug)]
pub struct Avl<K> {
    nodes: Arena<AvlNode<K>>,
    root: Option<NodeId>,
    layout: LayoutConfig,
}

impl<K> Default for Avl<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Avl<K> {
    /// Generates a new, empty `Avl`.
    pub fn new() -> Self {
        Self::with_layout(LayoutConfig::default())
    }

    /// Generates a new, empty `Avl` whose snapshots use the given spacing.
    pub fn with_layout(layout: LayoutConfig) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            layout,
        }
    }

    /// Number of levels from the root to the deepest leaf.
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    fn height_of(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |id| self.nodes[id].height)
    }

    fn fix_height(&mut self, id: NodeId) {
        let left = self.height_of(self.nodes[id].left);
        let right = self.height_of(self.nodes[id].right);
        let node = &mut self.nodes[id];
        node.height = 1 + left.max(right);
        node.balance = left as isize - right as isize;
    }
}

/// What happened below a node during [`Avl::remove`].
enum Removal {
    NotFound,
    /// The key was deleted and the (rebalanced) subtree is now rooted here.
    Removed(Option<NodeId>),
}

impl<K: Key> Avl<K> {
    fn relayout(&mut self) {
        binary::relayout(&mut self.nodes, self.root, &self.layout);
    }

    /// Inserts below `id` and returns the root of the rebalanced subtree.
    fn insert_into(&mut self, id: NodeId, key: K, trace: &mut StepTrace<K>) -> NodeId {
        let node_key = self.nodes[id].key.clone();
        let go_left = match key.cmp(&node_key) {
            Ordering::Less => {
                trace.push(
                    StepKind::Compare,
                    vec![binary::touched(&self.nodes, id)],
                    format!("{key} < {node_key}, going left"),
                );
                true
            }
            Ordering::Equal => {
                trace.push(
                    StepKind::Compare,
                    vec![binary::touched(&self.nodes, id)],
                    format!("{key} = {node_key}, already present"),
                );
                return id;
            }
            Ordering::Greater => {
                trace.push(
                    StepKind::Compare,
                    vec![binary::touched(&self.nodes, id)],
                    format!("{key} > {node_key}, going right"),
                );
                false
            }
        };

        let child = if go_left {
            self.nodes[id].left
        } else {
            self.nodes[id].right
        };
        let child = match child {
            Some(child) => self.insert_into(child, key, trace),
            None => {
                let side = if go_left { "left" } else { "right" };
                let message = format!("Inserted {key} as {side} child of {node_key}");
                let new = self.nodes.alloc(AvlNode::new(key));
                trace.push(
                    StepKind::Insert,
                    vec![binary::touched(&self.nodes, new)],
                    message,
                );
                new
            }
        };
        if go_left {
            self.nodes[id].left = Some(child);
        } else {
            self.nodes[id].right = Some(child);
        }

        self.balance(id, trace)
    }

    fn remove(&mut self, id: NodeId, key: &K, trace: &mut StepTrace<K>) -> Removal {
        let node_key = self.nodes[id].key.clone();
        trace.push(
            StepKind::Highlight,
            vec![binary::touched(&self.nodes, id)],
            format!("Checking node {node_key}"),
        );

        match key.cmp(&node_key) {
            Ordering::Less => {
                let Some(left) = self.nodes[id].left else {
                    return Removal::NotFound;
                };
                match self.remove(left, key, trace) {
                    Removal::Removed(new_left) => {
                        self.nodes[id].left = new_left;
                        Removal::Removed(Some(self.balance(id, trace)))
                    }
                    Removal::NotFound => Removal::NotFound,
                }
            }
            Ordering::Greater => {
                let Some(right) = self.nodes[id].right else {
                    return Removal::NotFound;
                };
                match self.remove(right, key, trace) {
                    Removal::Removed(new_right) => {
                        self.nodes[id].right = new_right;
                        Removal::Removed(Some(self.balance(id, trace)))
                    }
                    Removal::NotFound => Removal::NotFound,
                }
            }
            Ordering::Equal => {
                trace.push(
                    StepKind::Found,
                    vec![binary::touched(&self.nodes, id)],
                    format!("Found node {node_key} to delete"),
                );
                match (self.nodes[id].left, self.nodes[id].right) {
                    (None, None) => {
                        trace.push(
                            StepKind::Clear,
                            vec![binary::touched(&self.nodes, id)],
                            format!("Removing leaf node {node_key}"),
                        );
                        self.nodes.free(id);
                        Removal::Removed(None)
                    }
                    (Some(child), None) | (None, Some(child)) => {
                        trace.push(
                            StepKind::Clear,
                            vec![binary::touched(&self.nodes, id)],
                            format!(
                                "Replacing node {node_key} with its only child {}",
                                self.nodes[child].key
                            ),
                        );
                        self.nodes.free(id);
                        Removal::Removed(Some(child))
                    }
                    (Some(_), Some(right)) => {
                        let mut successor = right;
                        while let Some(left) = self.nodes[successor].left {
                            successor = left;
                        }
                        let successor_key = self.nodes[successor].key.clone();
                        trace.push(
                            StepKind::Highlight,
                            vec![
                                binary::touched(&self.nodes, id),
                                binary::touched(&self.nodes, successor),
                            ],
                            format!("Replacing {node_key} with successor {successor_key}"),
                        );
                        self.nodes[id].key = successor_key.clone();

                        match self.remove(right, &successor_key, trace) {
                            Removal::Removed(new_right) => self.nodes[id].right = new_right,
                            Removal::NotFound => {
                                panic!("Successor not found but the right subtree holds it")
                            }
                        }
                        Removal::Removed(Some(self.balance(id, trace)))
                    }
                }
            }
        }
    }

    /// Refreshes the height of `id` and rotates if it became unbalanced.
    /// Returns whichever node now roots the subtree.
    fn balance(&mut self, id: NodeId, trace: &mut StepTrace<K>) -> NodeId {
        self.fix_height(id);
        let balance = self.nodes[id].balance;
        if balance.abs() <= 1 {
            return id;
        }

        trace.push(
            StepKind::Highlight,
            vec![binary::touched(&self.nodes, id)],
            format!(
                "Rebalancing required at node {} (balance factor {balance})",
                self.nodes[id].key
            ),
        );
        let new_root = if balance > 1 {
            let left = self.nodes[id].left.expect("Left heavy => left child");
            if self.nodes[left].balance < 0 {
                let new_left = self.rotate_left(left, trace);
                self.nodes[id].left = Some(new_left);
            }
            self.rotate_right(id, trace)
        } else {
            let right = self.nodes[id].right.expect("Right heavy => right child");
            if self.nodes[right].balance > 0 {
                let new_right = self.rotate_right(right, trace);
                self.nodes[id].right = Some(new_right);
            }
            self.rotate_left(id, trace)
        };

        if cfg!(debug_assertions) {
            let node = &self.nodes[new_root];
            assert!(node.balance.abs() <= 1);
        }
        new_root
    }

    /// Rotates `old_root` to the right. This moves its left child up and
    /// `old_root` down, so it must only be called when there _is_ a left
    /// child.
    ///
    /// ## Panics
    ///
    /// When called on a node without a left child.
    ///
    /// ```text
    ///    old_root                   new_root
    ///    /     \                    /     \
    /// new_root  z     rotate ->    x    old_root
    ///  / \                                /  \
    /// x   y                              y    z
    /// ```
    fn rotate_right(&mut self, old_root: NodeId, trace: &mut StepTrace<K>) -> NodeId {
        let new_root = self.nodes[old_root]
            .left
            .expect("Rotate right => left child");
        self.nodes[old_root].left = self.nodes[new_root].right;
        self.nodes[new_root].right = Some(old_root);
        self.fix_height(old_root);
        self.fix_height(new_root);

        tracing::trace!(pivot = %self.nodes[old_root].key, "rotate right");
        trace.push(
            StepKind::Rotate,
            binary::touched_all(&self.nodes, &[old_root, new_root]),
            format!("Right rotation at {}", self.nodes[old_root].key),
        );
        new_root
    }

    /// The mirror image of [`Avl::rotate_right`].
    fn rotate_left(&mut self, old_root: NodeId, trace: &mut StepTrace<K>) -> NodeId {
        let new_root = self.nodes[old_root]
            .right
            .expect("Rotate left => right child");
        self.nodes[old_root].right = self.nodes[new_root].left;
        self.nodes[new_root].left = Some(old_root);
        self.fix_height(old_root);
        self.fix_height(new_root);

        tracing::trace!(pivot = %self.nodes[old_root].key, "rotate left");
        trace.push(
            StepKind::Rotate,
            binary::touched_all(&self.nodes, &[old_root, new_root]),
            format!("Left rotation at {}", self.nodes[old_root].key),
        );
        new_root
    }
}

impl<K: Key> Engine<K> for Avl<K> {
    fn kind(&self) -> TreeKind {
        TreeKind::Avl
    }

    fn insert(&mut self, key: K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("insert", tree = "avl", %key).entered();

        let root = match self.root {
            None => {
                let message = format!("Inserted {key} as root");
                let root = self.nodes.alloc(AvlNode::new(key));
                trace.push(
                    StepKind::Insert,
                    vec![binary::touched(&self.nodes, root)],
                    message,
                );
                root
            }
            Some(root) => self.insert_into(root, key, &mut trace),
        };
        self.root = Some(root);

        self.relayout();
        tracing::debug!(steps = trace.len(), len = self.nodes.len(), "insert done");
        trace
    }

    fn delete(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("delete", tree = "avl", %key).entered();

        match self.root.map(|root| self.remove(root, key, &mut trace)) {
            None => trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("Tree is empty, cannot delete {key}"),
            ),
            Some(Removal::Removed(new_root)) => self.root = new_root,
            Some(Removal::NotFound) => trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("{key} not found, nothing to delete"),
            ),
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), len = self.nodes.len(), "delete done");
        trace
    }

    fn search(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let found = binary::search(&mut self.nodes, self.root, key, false, &mut trace);
        tracing::debug!(
            tree = "avl",
            %key,
            found = found.is_some(),
            steps = trace.len(),
            "search done"
        );
        trace
    }

    fn clear(&mut self) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::clear_step(&self.nodes, self.root, &mut trace);
        tracing::debug!(tree = "avl", nodes = self.nodes.len(), "clear");
        self.nodes.clear();
        self.root = None;
        trace
    }

    fn snapshot(&self) -> Snapshot<K> {
        binary::snapshot(&self.nodes, self.root, TreeKind::Avl, |node, snap| {
            snap.height = Some(node.height);
            snap.balance_factor = Some(node.balance);
        })
    }

    fn contains(&self, key: &K) -> bool {
        binary::find(&self.nodes, self.root, key).is_some()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn keys(&self) -> Vec<K> {
        binary::in_order_keys(&self.nodes, self.root)
    }

    fn validate(&self) -> Result<(), TreeError> {
        binary::check_order(&self.nodes, self.root)?;

        let ids = binary::pre_order(&self.nodes, self.root);
        if ids.len() != self.nodes.len() {
            return Err(TreeError::invariant(format!(
                "{} nodes reachable but {} allocated",
                ids.len(),
                self.nodes.len()
            )));
        }
        for id in ids {
            let node = &self.nodes[id];
            let left = self.height_of(node.left);
            let right = self.height_of(node.right);
            if node.height != 1 + left.max(right) {
                return Err(TreeError::invariant(format!(
                    "node {} stores height {} but its subtrees say {}",
                    node.key,
                    node.height,
                    1 + left.max(right)
                )));
            }
            if node.balance != left as isize - right as isize {
                return Err(TreeError::invariant(format!(
                    "node {} stores a stale balance factor {}",
                    node.key, node.balance
                )));
            }
            if node.balance.abs() > 1 {
                return Err(TreeError::invariant(format!(
                    "node {} is unbalanced (balance factor {})",
                    node.key, node.balance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotNode;
    use pretty_assertions::assert_eq;

    fn tree_of(keys: &[i32]) -> Avl<i32> {
        let mut tree = Avl::new();
        for &key in keys {
            tree.insert(key);
        }
        tree
    }

    /// `(key, balance factor)` for every node, pre-order.
    fn shape(tree: &Avl<i32>) -> Vec<(i32, isize)> {
        tree.snapshot()
            .nodes
            .iter()
            .map(|n: &SnapshotNode<i32>| (n.keys[0], n.balance_factor.unwrap()))
            .collect()
    }

    fn rotations(trace: &StepTrace<i32>) -> Vec<&str> {
        trace
            .iter()
            .filter(|step| step.kind == StepKind::Rotate)
            .map(|step| step.message.as_str())
            .collect()
    }

    #[test]
    fn right_right_case_rotates_left() {
        let mut tree = tree_of(&[10, 20]);
        let trace = tree.insert(30);

        assert_eq!(rotations(&trace), ["Left rotation at 10"]);
        assert_eq!(shape(&tree), vec![(20, 0), (10, 0), (30, 0)]);
        tree.validate().unwrap();
    }

    #[test]
    fn left_left_case_rotates_right() {
        let mut tree = tree_of(&[30, 20]);
        let trace = tree.insert(10);

        assert_eq!(rotations(&trace), ["Right rotation at 30"]);
        assert_eq!(shape(&tree), vec![(20, 0), (10, 0), (30, 0)]);
    }

    #[test]
    fn left_right_case_rotates_twice() {
        let mut tree = tree_of(&[30, 10]);
        let trace = tree.insert(20);

        assert_eq!(
            rotations(&trace),
            ["Left rotation at 10", "Right rotation at 30"]
        );
        assert_eq!(shape(&tree), vec![(20, 0), (10, 0), (30, 0)]);
    }

    #[test]
    fn right_left_case_rotates_twice() {
        let mut tree = tree_of(&[10, 30]);
        let trace = tree.insert(20);

        assert_eq!(
            rotations(&trace),
            ["Right rotation at 30", "Left rotation at 10"]
        );
        assert_eq!(shape(&tree), vec![(20, 0), (10, 0), (30, 0)]);
    }

    #[test]
    fn rebalance_is_announced_before_rotating() {
        let mut tree = tree_of(&[10, 20]);
        let trace = tree.insert(30);

        assert_eq!(
            trace.kinds(),
            vec![
                StepKind::Compare,
                StepKind::Compare,
                StepKind::Insert,
                StepKind::Highlight,
                StepKind::Rotate,
            ]
        );
        assert_eq!(
            trace.steps()[3].message,
            "Rebalancing required at node 10 (balance factor -2)"
        );
        let rotated: Vec<_> = trace.steps()[4].nodes.iter().map(|n| n.keys[0]).collect();
        assert_eq!(rotated, vec![10, 20]);
    }

    #[test]
    fn sorted_inserts_stay_logarithmic() {
        let keys: Vec<i32> = (0..127).collect();
        let tree = tree_of(&keys);

        assert_eq!(tree.height(), 7);
        assert_eq!(tree.keys(), keys);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_rebalances_every_ancestor() {
        // Removing 4 leaves 3 left heavy. Fixing that shortens the left side
        // of 5 which then leans too far right.
        let mut tree = tree_of(&[5, 3, 8, 2, 4, 7, 10, 1, 6, 9, 11, 12]);
        tree.validate().unwrap();
        let trace = tree.delete(&4);

        assert_eq!(
            rotations(&trace),
            ["Right rotation at 3", "Left rotation at 5"]
        );
        assert_eq!(tree.snapshot().root().unwrap().keys, vec![8]);
        assert!(!tree.contains(&4));
        tree.validate().unwrap();
    }

    #[test]
    fn delete_two_children_uses_successor() {
        let mut tree = tree_of(&[20, 10, 30, 25, 40]);
        let trace = tree.delete(&20);

        assert!(trace
            .iter()
            .any(|step| step.message == "Replacing 20 with successor 25"));
        assert_eq!(tree.keys(), vec![10, 25, 30, 40]);
        assert_eq!(tree.snapshot().root().unwrap().keys, vec![25]);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_missing_key_leaves_tree_alone() {
        let mut tree = tree_of(&[20, 10, 30]);
        let before = tree.snapshot();
        let trace = tree.delete(&15);

        assert_eq!(trace.last().unwrap().kind, StepKind::NotFound);
        assert_eq!(tree.snapshot(), before);
    }

    #[test]
    fn duplicates_do_not_rebalance() {
        let mut tree = tree_of(&[20, 10, 30]);
        let trace = tree.insert(10);

        assert_eq!(trace.kinds(), vec![StepKind::Compare, StepKind::Compare]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn snapshot_carries_heights() {
        let tree = tree_of(&[20, 10, 30, 5]);
        let snapshot = tree.snapshot();
        let heights: Vec<_> = snapshot
            .nodes
            .iter()
            .map(|n| (n.keys[0], n.height.unwrap()))
            .collect();

        assert_eq!(heights, vec![(20, 3), (10, 2), (5, 1), (30, 1)]);
        assert_eq!(shape(&tree), vec![(20, 1), (10, 1), (5, 0), (30, 0)]);
        assert!(snapshot.nodes.iter().all(|n| n.color.is_none()));
    }

    #[test]
    fn clone_works() {
        let original = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        let mut copy = original.clone();

        copy.delete(&4);
        copy.insert(8);

        assert_eq!(original.keys(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(copy.keys(), vec![1, 2, 3, 5, 6, 7, 8]);
        original.validate().unwrap();
        copy.validate().unwrap();
    }
}

#[cfg(test)]
mod quicktests {
    use super::*;
    use crate::test::quick::{check_ops, Op};

    quickcheck::quickcheck! {
        fn fuzz_multiple_operations_i8(ops: Vec<Op<i8>>) -> bool {
            check_ops(&ops, &mut Avl::new())
        }
    }

    quickcheck::quickcheck! {
        fn height_is_logarithmic(xs: Vec<u16>) -> bool {
            let mut tree = Avl::new();
            for x in &xs {
                tree.insert(*x);
            }

            // An AVL tree with n nodes is at most ~1.44 log2(n + 2) tall.
            let bound = 1.45 * ((tree.len() + 2) as f64).log2();
            tree.height() as f64 <= bound
        }
    }
}

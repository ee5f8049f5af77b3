//! A plain, unbalanced Binary Search Tree. Its shape depends entirely on the
//! order keys arrive in, which makes it the baseline the balanced engines are
//! compared against.
//!
//! # Examples
//!
//! ```
//! use trace_trees::{bst::Bst, trace::StepKind, Engine};
//!
//! let mut tree = Bst::new();
//!
//! // Nothing in here yet.
//! assert!(!tree.contains(&1));
//!
//! tree.insert(1);
//! assert!(tree.contains(&1));
//!
//! // Inserting the same key again changes nothing.
//! tree.insert(1);
//! assert_eq!(tree.len(), 1);
//!
//! // Deleting a missing key is not an error, the trace says what happened.
//! let trace = tree.delete(&42);
//! assert_eq!(trace.last().unwrap().kind, StepKind::NotFound);
//! ```

use std::cmp::Ordering;

use crate::arena::{Arena, NodeId};
use crate::binary;
use crate::config::TreeKind;
use crate::error::TreeError;
use crate::layout::LayoutConfig;
use crate::node::BstNode;
use crate::snapshot::Snapshot;
use crate::trace::{StepKind, StepTrace};
use crate::{Engine, Key};

/// An unbalanced Binary Search Tree.
#[derive(Clone, Debug)]
pub struct Bst<K> {
    nodes: Arena<BstNode<K>>,
    root: Option<NodeId>,
    layout: LayoutConfig,
}

impl<K> Default for Bst<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Bst<K> {
    /// Generates a new, empty `Bst`.
    pub fn new() -> Self {
        Self::with_layout(LayoutConfig::default())
    }

    /// Generates a new, empty `Bst` whose snapshots use the given spacing.
    pub fn with_layout(layout: LayoutConfig) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            layout,
        }
    }

    /// Number of levels from the root to the deepest leaf. An empty tree has
    /// a height of 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[id];
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        height
    }
}

/// The link that points at a node: the root slot or one side of a parent.
#[derive(Copy, Clone)]
enum Link {
    Root,
    Left(NodeId),
    Right(NodeId),
}

impl<K: Key> Bst<K> {
    fn relayout(&mut self) {
        binary::relayout(&mut self.nodes, self.root, &self.layout);
    }

    fn insert_below(&mut self, mut current: NodeId, key: K, trace: &mut StepTrace<K>) {
        loop {
            let node_key = self.nodes[current].key.clone();
            let (next, go_left) = match key.cmp(&node_key) {
                Ordering::Less => {
                    trace.push(
                        StepKind::Compare,
                        vec![binary::touched(&self.nodes, current)],
                        format!("{key} < {node_key}, going left"),
                    );
                    (self.nodes[current].left, true)
                }
                Ordering::Equal => {
                    trace.push(
                        StepKind::Compare,
                        vec![binary::touched(&self.nodes, current)],
                        format!("{key} = {node_key}, already present"),
                    );
                    return;
                }
                Ordering::Greater => {
                    trace.push(
                        StepKind::Compare,
                        vec![binary::touched(&self.nodes, current)],
                        format!("{key} > {node_key}, going right"),
                    );
                    (self.nodes[current].right, false)
                }
            };

            match next {
                Some(next) => current = next,
                None => {
                    let side = if go_left { "left" } else { "right" };
                    let message = format!("Inserted {key} as {side} child of {node_key}");
                    let new = self.nodes.alloc(BstNode::new(key));
                    if go_left {
                        self.nodes[current].left = Some(new);
                    } else {
                        self.nodes[current].right = Some(new);
                    }
                    trace.push(
                        StepKind::Insert,
                        vec![binary::touched(&self.nodes, new)],
                        message,
                    );
                    return;
                }
            }
        }
    }

    fn relink(&mut self, link: Link, child: Option<NodeId>) {
        match link {
            Link::Root => self.root = child,
            Link::Left(parent) => self.nodes[parent].left = child,
            Link::Right(parent) => self.nodes[parent].right = child,
        }
    }

    /// Walks down to `key` and deletes it. Returns `false` if it isn't in
    /// the tree.
    fn remove(&mut self, key: &K, trace: &mut StepTrace<K>) -> bool {
        let mut link = Link::Root;
        let mut current = self.root;
        while let Some(id) = current {
            let node_key = self.nodes[id].key.clone();
            trace.push(
                StepKind::Highlight,
                vec![binary::touched(&self.nodes, id)],
                format!("Checking node {node_key}"),
            );
            match key.cmp(&node_key) {
                Ordering::Less => {
                    link = Link::Left(id);
                    current = self.nodes[id].left;
                }
                Ordering::Greater => {
                    link = Link::Right(id);
                    current = self.nodes[id].right;
                }
                Ordering::Equal => {
                    self.unlink(id, link, trace);
                    return true;
                }
            }
        }
        false
    }

    /// Removes node `id`, which `link` points at.
    fn unlink(&mut self, id: NodeId, link: Link, trace: &mut StepTrace<K>) {
        let node_key = self.nodes[id].key.clone();
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
                self.relink(link, None);
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
                self.relink(link, Some(child));
            }
            (Some(_), Some(right)) => {
                let successor = self.successor(id, right, trace);
                let successor_key = self.nodes[successor].key.clone();
                trace.push(
                    StepKind::Highlight,
                    vec![
                        binary::touched(&self.nodes, id),
                        binary::touched(&self.nodes, successor),
                    ],
                    format!("Replacing {node_key} with successor {successor_key}"),
                );
                self.nodes[id].key = successor_key;

                // Walk down to the successor again, this time to delete it.
                let mut link = Link::Right(id);
                let mut current = right;
                loop {
                    trace.push(
                        StepKind::Highlight,
                        vec![binary::touched(&self.nodes, current)],
                        format!("Checking node {}", self.nodes[current].key),
                    );
                    if current == successor {
                        break;
                    }
                    link = Link::Left(current);
                    current = self.nodes[current]
                        .left
                        .expect("The successor is the leftmost node of the right subtree");
                }
                // No left child, so this ends in one of the cases above.
                self.unlink(successor, link, trace);
            }
        }
    }

    /// Finds the leftmost node of the right subtree of `of`, recording the
    /// descent.
    fn successor(&self, of: NodeId, right: NodeId, trace: &mut StepTrace<K>) -> NodeId {
        trace.push(
            StepKind::Highlight,
            vec![binary::touched(&self.nodes, right)],
            format!(
                "Looking for the successor of {} in its right subtree",
                self.nodes[of].key
            ),
        );
        let mut current = right;
        while let Some(left) = self.nodes[current].left {
            trace.push(
                StepKind::Compare,
                vec![
                    binary::touched(&self.nodes, current),
                    binary::touched(&self.nodes, left),
                ],
                format!(
                    "{} < {}, going left",
                    self.nodes[left].key, self.nodes[current].key
                ),
            );
            current = left;
        }
        current
    }
}

impl<K: Key> Engine<K> for Bst<K> {
    fn kind(&self) -> TreeKind {
        TreeKind::Bst
    }

    fn insert(&mut self, key: K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("insert", tree = "bst", %key).entered();

        match self.root {
            None => {
                let message = format!("Inserted {key} as root");
                let root = self.nodes.alloc(BstNode::new(key));
                self.root = Some(root);
                trace.push(
                    StepKind::Insert,
                    vec![binary::touched(&self.nodes, root)],
                    message,
                );
            }
            Some(root) => self.insert_below(root, key, &mut trace),
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), len = self.nodes.len(), "insert done");
        trace
    }

    fn delete(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("delete", tree = "bst", %key).entered();

        if self.root.is_none() {
            trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("Tree is empty, cannot delete {key}"),
            );
        } else if !self.remove(key, &mut trace) {
            trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("{key} not found, nothing to delete"),
            );
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
            tree = "bst",
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
        tracing::debug!(tree = "bst", nodes = self.nodes.len(), "clear");
        self.nodes.clear();
        self.root = None;
        trace
    }

    fn snapshot(&self) -> Snapshot<K> {
        binary::snapshot(&self.nodes, self.root, TreeKind::Bst, |_, _| {})
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
        let reachable = binary::pre_order(&self.nodes, self.root).len();
        if reachable != self.nodes.len() {
            return Err(TreeError::invariant(format!(
                "{reachable} nodes reachable but {} allocated",
                self.nodes.len()
            )));
        }
        Ok(())
    }
}


#[cfg(test)]
mod quicktests {
    use super::*;
    use crate::test::quick::{check_ops, Op};

    quickcheck::quickcheck! {
        fn fuzz_multiple_operations_i8(ops: Vec<Op<i8>>) -> bool {
            check_ops(&ops, &mut Bst::new())
        }
    }

    quickcheck::quickcheck! {
        fn contains(xs: Vec<i8>) -> bool {
            let mut tree = Bst::new();
            for x in &xs {
                tree.insert(*x);
            }

            xs.iter().all(|x| tree.contains(x))
        }
    }
}

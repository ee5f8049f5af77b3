//! A color balanced Binary Search Tree.
//!
//! Every node is red or black. The root is black, a red node never has a red
//! child, and every path from a node down to a missing child crosses the same
//! number of black nodes. Together these keep the longest root-to-leaf path
//! at most twice as long as the shortest.
//!
//! Nodes keep a back-index to their parent so that the insert and delete
//! fixups can walk upwards without recursion.

use std::cmp::Ordering;

use crate::arena::{Arena, NodeId};
use crate::binary;
use crate::config::TreeKind;
use crate::error::TreeError;
use crate::layout::LayoutConfig;
use crate::node::{Color, RbNode};
use crate::snapshot::Snapshot;
use crate::trace::{StepKind, StepTrace};
use crate::{Engine, Key};

/// A Red-Black tree.
#[derive(Clone, Debug)]
pub struct RedBlack<K> {
    nodes: Arena<RbNode<K>>,
    root: Option<NodeId>,
    layout: LayoutConfig,
}

impl<K> Default for RedBlack<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RedBlack<K> {
    /// Generates a new, empty `RedBlack`.
    pub fn new() -> Self {
        Self::with_layout(LayoutConfig::default())
    }

    /// Generates a new, empty `RedBlack` whose snapshots use the given
    /// spacing.
    pub fn with_layout(layout: LayoutConfig) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            layout,
        }
    }

    /// Missing children count as black.
    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.nodes[id].color)
    }

    fn is_left_child(&self, id: NodeId, parent: NodeId) -> bool {
        self.nodes[parent].left == Some(id)
    }

    /// Points whatever referred to `old` (its parent's link or the root) at
    /// `new`, and fixes `new`'s parent link.
    fn transplant(&mut self, old: NodeId, new: Option<NodeId>) {
        let parent = self.nodes[old].parent;
        match parent {
            None => self.root = new,
            Some(parent) if self.is_left_child(old, parent) => self.nodes[parent].left = new,
            Some(parent) => self.nodes[parent].right = new,
        }
        if let Some(new) = new {
            self.nodes[new].parent = parent;
        }
    }
}

impl<K: Key> RedBlack<K> {
    fn relayout(&mut self) {
        binary::relayout(&mut self.nodes, self.root, &self.layout);
    }

    fn recolor(&mut self, changes: &[(NodeId, Color)], message: String, trace: &mut StepTrace<K>) {
        for &(id, color) in changes {
            self.nodes[id].color = color;
        }
        let ids: Vec<NodeId> = changes.iter().map(|&(id, _)| id).collect();
        trace.push(
            StepKind::Recolor,
            binary::touched_all(&self.nodes, &ids),
            message,
        );
    }

    /// Moves the right child of `x` up into its place.
    ///
    /// ## Panics
    ///
    /// When `x` has no right child.
    ///
    /// ```text
    ///     x                   y
    ///    / \                 / \
    ///   a   y    rotate ->  x   c
    ///      / \             / \
    ///     b   c           a   b
    /// ```
    fn rotate_left(&mut self, x: NodeId, trace: &mut StepTrace<K>) {
        let y = self.nodes[x].right.expect("Rotate left => right child");
        let b = self.nodes[y].left;
        self.nodes[x].right = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(x);
        }
        self.transplant(x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);

        tracing::trace!(pivot = %self.nodes[x].key, "rotate left");
        trace.push(
            StepKind::Rotate,
            binary::touched_all(&self.nodes, &[x, y]),
            format!("Left rotation at {}", self.nodes[x].key),
        );
    }

    /// The mirror image of [`RedBlack::rotate_left`].
    fn rotate_right(&mut self, x: NodeId, trace: &mut StepTrace<K>) {
        let y = self.nodes[x].left.expect("Rotate right => left child");
        let b = self.nodes[y].right;
        self.nodes[x].left = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(x);
        }
        self.transplant(x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);

        tracing::trace!(pivot = %self.nodes[x].key, "rotate right");
        trace.push(
            StepKind::Rotate,
            binary::touched_all(&self.nodes, &[x, y]),
            format!("Right rotation at {}", self.nodes[x].key),
        );
    }

    /// Plain BST insertion. Returns the new red node, or `None` for a
    /// duplicate.
    fn attach(&mut self, key: K, trace: &mut StepTrace<K>) -> Option<NodeId> {
        let Some(mut current) = self.root else {
            let message = format!("Inserted {key} as root");
            let root = self.nodes.alloc(RbNode::new(key));
            self.root = Some(root);
            trace.push(
                StepKind::Insert,
                vec![binary::touched(&self.nodes, root)],
                message,
            );
            return Some(root);
        };

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
                    return None;
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
            if let Some(next) = next {
                current = next;
                continue;
            }

            let side = if go_left { "left" } else { "right" };
            let message = format!("Inserted {key} as {side} child of {node_key}");
            let new = self.nodes.alloc(RbNode::new(key));
            self.nodes[new].parent = Some(current);
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
            return Some(new);
        }
    }

    /// Restores the coloring rules after `z` was attached as a red node.
    fn insert_fixup(&mut self, mut z: NodeId, trace: &mut StepTrace<K>) {
        while let Some(mut p) = self.nodes[z].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            let g = self.nodes[p].parent.expect("A red node is never the root");
            let parent_is_left = self.is_left_child(p, g);
            let uncle = if parent_is_left {
                self.nodes[g].right
            } else {
                self.nodes[g].left
            };

            if let Some(u) = uncle.filter(|&u| self.nodes[u].color == Color::Red) {
                let message = format!(
                    "Uncle {} is red: recolored {} and {} black, {} red",
                    self.nodes[u].key, self.nodes[p].key, self.nodes[u].key, self.nodes[g].key
                );
                self.recolor(
                    &[(p, Color::Black), (u, Color::Black), (g, Color::Red)],
                    message,
                    trace,
                );
                z = g;
                continue;
            }

            // Inner grandchild: rotate it to the outside first.
            if parent_is_left && self.nodes[p].right == Some(z) {
                self.rotate_left(p, trace);
                z = p;
                p = self.nodes[z].parent.expect("Rotated node has a parent");
            } else if !parent_is_left && self.nodes[p].left == Some(z) {
                self.rotate_right(p, trace);
                z = p;
                p = self.nodes[z].parent.expect("Rotated node has a parent");
            }

            let message = format!(
                "Recolored {} black and {} red",
                self.nodes[p].key, self.nodes[g].key
            );
            self.recolor(&[(p, Color::Black), (g, Color::Red)], message, trace);
            if parent_is_left {
                self.rotate_right(g, trace);
            } else {
                self.rotate_left(g, trace);
            }
        }

        if let Some(root) = self.root.filter(|&root| self.nodes[root].color == Color::Red) {
            let message = format!("Root {} recolored black", self.nodes[root].key);
            self.recolor(&[(root, Color::Black)], message, trace);
        }
    }

    /// Walks from the root to `key`, highlighting every node on the way.
    fn locate(&self, key: &K, trace: &mut StepTrace<K>) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node_key = &self.nodes[id].key;
            trace.push(
                StepKind::Highlight,
                vec![binary::touched(&self.nodes, id)],
                format!("Checking node {node_key}"),
            );
            current = match key.cmp(node_key) {
                Ordering::Less => self.nodes[id].left,
                Ordering::Equal => return Some(id),
                Ordering::Greater => self.nodes[id].right,
            };
        }
        None
    }

    /// Unlinks `z` and repairs the coloring if a black node went missing.
    fn remove(&mut self, z: NodeId, trace: &mut StepTrace<K>) {
        let z_key = self.nodes[z].key.clone();
        trace.push(
            StepKind::Found,
            vec![binary::touched(&self.nodes, z)],
            format!("Found node {z_key} to delete"),
        );

        let mut removed_color = self.nodes[z].color;
        let x;
        let x_parent;
        match (self.nodes[z].left, self.nodes[z].right) {
            (None, right) => {
                trace.push(
                    StepKind::Clear,
                    vec![binary::touched(&self.nodes, z)],
                    self.unlink_message(&z_key, right),
                );
                x = right;
                x_parent = self.nodes[z].parent;
                self.transplant(z, right);
            }
            (left @ Some(_), None) => {
                trace.push(
                    StepKind::Clear,
                    vec![binary::touched(&self.nodes, z)],
                    self.unlink_message(&z_key, left),
                );
                x = left;
                x_parent = self.nodes[z].parent;
                self.transplant(z, left);
            }
            (Some(left), Some(right)) => {
                let mut y = right;
                while let Some(next) = self.nodes[y].left {
                    y = next;
                }
                trace.push(
                    StepKind::Highlight,
                    binary::touched_all(&self.nodes, &[z, y]),
                    format!("Replacing {z_key} with successor {}", self.nodes[y].key),
                );
                trace.push(
                    StepKind::Clear,
                    vec![binary::touched(&self.nodes, z)],
                    format!("Removing node {z_key}"),
                );

                removed_color = self.nodes[y].color;
                x = self.nodes[y].right;
                if self.nodes[y].parent == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.nodes[y].parent;
                    self.transplant(y, x);
                    self.nodes[y].right = Some(right);
                    self.nodes[right].parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(left);
                self.nodes[left].parent = Some(y);
                self.nodes[y].color = self.nodes[z].color;
            }
        }
        self.nodes.free(z);

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent, trace);
        }
    }

    fn unlink_message(&self, key: &K, child: Option<NodeId>) -> String {
        match child {
            None => format!("Removing leaf node {key}"),
            Some(child) => format!(
                "Replacing node {key} with its only child {}",
                self.nodes[child].key
            ),
        }
    }

    /// `x` (possibly missing) carries an extra black. Push it up the tree
    /// until it can be absorbed.
    fn delete_fixup(
        &mut self,
        mut x: Option<NodeId>,
        mut parent: Option<NodeId>,
        trace: &mut StepTrace<K>,
    ) {
        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };
            let x_is_left = self.nodes[p].left == x;

            let mut w = self.sibling(p, x_is_left);
            if self.nodes[w].color == Color::Red {
                let message = format!(
                    "Sibling {} is red: recolored it black and {} red",
                    self.nodes[w].key, self.nodes[p].key
                );
                self.recolor(&[(w, Color::Black), (p, Color::Red)], message, trace);
                self.rotate_toward(x_is_left, p, trace);
                w = self.sibling(p, x_is_left);
            }

            let (near, far) = self.nephews(w, x_is_left);
            if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                let message = format!(
                    "Sibling {} has two black children: recolored it red",
                    self.nodes[w].key
                );
                self.recolor(&[(w, Color::Red)], message, trace);
                x = Some(p);
                parent = self.nodes[p].parent;
                continue;
            }

            if self.color_of(far) == Color::Black {
                let near = near.expect("One nephew is red");
                let message = format!(
                    "Near nephew {} is red: recolored it black and {} red",
                    self.nodes[near].key, self.nodes[w].key
                );
                self.recolor(&[(near, Color::Black), (w, Color::Red)], message, trace);
                self.rotate_toward(!x_is_left, w, trace);
                w = self.sibling(p, x_is_left);
            }

            let far = self
                .nephews(w, x_is_left)
                .1
                .expect("Far nephew is red by now");
            let message = format!(
                "Far nephew {} is red: {} takes the color of {}, both turn black",
                self.nodes[far].key, self.nodes[w].key, self.nodes[p].key
            );
            let parent_color = self.nodes[p].color;
            self.recolor(
                &[(w, parent_color), (p, Color::Black), (far, Color::Black)],
                message,
                trace,
            );
            self.rotate_toward(x_is_left, p, trace);
            x = self.root;
            parent = None;
        }

        if let Some(x) = x.filter(|&x| self.nodes[x].color == Color::Red) {
            let message = format!("Recolored {} black", self.nodes[x].key);
            self.recolor(&[(x, Color::Black)], message, trace);
        }
    }

    /// The other child of `p`.
    fn sibling(&self, p: NodeId, x_is_left: bool) -> NodeId {
        let w = if x_is_left {
            self.nodes[p].right
        } else {
            self.nodes[p].left
        };
        w.expect("A doubly black node always has a sibling")
    }

    /// The children of `w`, nearest to the doubly black node first.
    fn nephews(&self, w: NodeId, x_is_left: bool) -> (Option<NodeId>, Option<NodeId>) {
        if x_is_left {
            (self.nodes[w].left, self.nodes[w].right)
        } else {
            (self.nodes[w].right, self.nodes[w].left)
        }
    }

    /// Rotates `at` down toward the left when `left` is set, right otherwise.
    fn rotate_toward(&mut self, left: bool, at: NodeId, trace: &mut StepTrace<K>) {
        if left {
            self.rotate_left(at, trace);
        } else {
            self.rotate_right(at, trace);
        }
    }

    /// Black nodes on every path below `id`, counting `id` itself.
    fn black_height(&self, id: Option<NodeId>) -> Result<usize, TreeError> {
        let Some(id) = id else {
            return Ok(1);
        };
        let node = &self.nodes[id];
        for child in [node.left, node.right].into_iter().flatten() {
            if self.nodes[child].parent != Some(id) {
                return Err(TreeError::invariant(format!(
                    "node {} does not point back at its parent {}",
                    self.nodes[child].key, node.key
                )));
            }
            if node.color == Color::Red && self.nodes[child].color == Color::Red {
                return Err(TreeError::invariant(format!(
                    "red node {} has a red child {}",
                    node.key, self.nodes[child].key
                )));
            }
        }
        let left = self.black_height(node.left)?;
        let right = self.black_height(node.right)?;
        if left != right {
            return Err(TreeError::invariant(format!(
                "node {} has black heights {left} on the left and {right} on the right",
                node.key
            )));
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}

impl<K: Key> Engine<K> for RedBlack<K> {
    fn kind(&self) -> TreeKind {
        TreeKind::RedBlack
    }

    fn insert(&mut self, key: K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("insert", tree = "red-black", %key).entered();

        if let Some(new) = self.attach(key, &mut trace) {
            self.insert_fixup(new, &mut trace);
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), len = self.nodes.len(), "insert done");
        trace
    }

    fn delete(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let _span = tracing::debug_span!("delete", tree = "red-black", %key).entered();

        if self.root.is_none() {
            trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("Tree is empty, cannot delete {key}"),
            );
        } else {
            match self.locate(key, &mut trace) {
                Some(z) => self.remove(z, &mut trace),
                None => trace.push(
                    StepKind::NotFound,
                    Vec::new(),
                    format!("{key} not found, nothing to delete"),
                ),
            }
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), len = self.nodes.len(), "delete done");
        trace
    }

    fn search(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        binary::reset_states(&mut self.nodes);
        let found = binary::search(&mut self.nodes, self.root, key, true, &mut trace);
        tracing::debug!(
            tree = "red-black",
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
        tracing::debug!(tree = "red-black", nodes = self.nodes.len(), "clear");
        self.nodes.clear();
        self.root = None;
        trace
    }

    fn snapshot(&self) -> Snapshot<K> {
        binary::snapshot(&self.nodes, self.root, TreeKind::RedBlack, |node, snap| {
            snap.color = Some(node.color);
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

        let reachable = binary::pre_order(&self.nodes, self.root).len();
        if reachable != self.nodes.len() {
            return Err(TreeError::invariant(format!(
                "{reachable} nodes reachable but {} allocated",
                self.nodes.len()
            )));
        }
        if let Some(root) = self.root {
            let node = &self.nodes[root];
            if node.color != Color::Black {
                return Err(TreeError::invariant(format!("root {} is red", node.key)));
            }
            if node.parent.is_some() {
                return Err(TreeError::invariant(format!(
                    "root {} has a parent",
                    node.key
                )));
            }
        }
        self.black_height(self.root).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_of(keys: &[i32]) -> RedBlack<i32> {
        let mut tree = RedBlack::new();
        for &key in keys {
            tree.insert(key);
        }
        tree
    }

    /// `(key, color)` for every node, pre-order.
    fn colors(tree: &RedBlack<i32>) -> Vec<(i32, Color)> {
        tree.snapshot()
            .nodes
            .iter()
            .map(|n| (n.keys[0], n.color.unwrap()))
            .collect()
    }

    fn messages(trace: &StepTrace<i32>, kind: StepKind) -> Vec<&str> {
        trace
            .iter()
            .filter(|step| step.kind == kind)
            .map(|step| step.message.as_str())
            .collect()
    }

    use Color::{Black, Red};

    #[test]
    fn root_is_recolored_black() {
        let mut tree = RedBlack::new();
        let trace = tree.insert(10);

        assert_eq!(trace.kinds(), vec![StepKind::Insert, StepKind::Recolor]);
        assert_eq!(trace.last().unwrap().message, "Root 10 recolored black");
        assert_eq!(colors(&tree), vec![(10, Black)]);
    }

    #[test]
    fn red_child_of_black_parent_needs_no_fixup() {
        let mut tree = tree_of(&[10]);
        let trace = tree.insert(20);

        assert_eq!(trace.kinds(), vec![StepKind::Compare, StepKind::Insert]);
        assert_eq!(colors(&tree), vec![(10, Black), (20, Red)]);
    }

    #[test]
    fn outer_grandchild_rotates_once() {
        let mut tree = tree_of(&[10, 20]);
        let trace = tree.insert(30);

        assert_eq!(messages(&trace, StepKind::Rotate), ["Left rotation at 10"]);
        assert_eq!(
            messages(&trace, StepKind::Recolor),
            ["Recolored 20 black and 10 red"]
        );
        assert_eq!(colors(&tree), vec![(20, Black), (10, Red), (30, Red)]);
        tree.validate().unwrap();
    }

    #[test]
    fn inner_grandchild_rotates_twice() {
        let mut tree = tree_of(&[10, 5]);
        let trace = tree.insert(7);

        assert_eq!(
            messages(&trace, StepKind::Rotate),
            ["Left rotation at 5", "Right rotation at 10"]
        );
        assert_eq!(colors(&tree), vec![(7, Black), (5, Red), (10, Red)]);
        tree.validate().unwrap();
    }

    #[test]
    fn red_uncle_recolors() {
        let mut tree = tree_of(&[10, 5, 15]);
        let trace = tree.insert(1);

        assert_eq!(
            trace.kinds(),
            vec![
                StepKind::Compare,
                StepKind::Compare,
                StepKind::Insert,
                StepKind::Recolor,
                StepKind::Recolor,
            ]
        );
        assert_eq!(
            messages(&trace, StepKind::Recolor),
            [
                "Uncle 15 is red: recolored 5 and 15 black, 10 red",
                "Root 10 recolored black"
            ]
        );
        assert_eq!(
            colors(&tree),
            vec![(10, Black), (5, Black), (1, Red), (15, Black)]
        );
    }

    #[test]
    fn search_reports_the_path() {
        let mut tree = tree_of(&[10, 5, 15]);

        let trace = tree.search(&5);
        assert_eq!(
            trace.kinds(),
            vec![
                StepKind::Highlight,
                StepKind::Compare,
                StepKind::Path,
                StepKind::Highlight,
                StepKind::Found,
                StepKind::SuccessPath,
            ]
        );
        assert_eq!(trace.steps()[2].message, "Current path: 10");
        assert_eq!(trace.last().unwrap().message, "Path taken: 10 → 5");

        let trace = tree.search(&12);
        assert_eq!(
            messages(&trace, StepKind::Path),
            ["Current path: 10", "Current path: 10 → 15"]
        );
        assert_eq!(trace.last().unwrap().kind, StepKind::NotFound);
    }

    #[test]
    fn delete_red_leaf() {
        let mut tree = tree_of(&[10, 5, 15]);
        let trace = tree.delete(&5);

        assert!(messages(&trace, StepKind::Recolor).is_empty());
        assert_eq!(colors(&tree), vec![(10, Black), (15, Red)]);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_black_leaf_with_red_sibling_children() {
        // 10 black, 5 and 15 black, 20 red below 15.
        let mut tree = tree_of(&[10, 5, 15, 1, 20]);
        tree.delete(&1);
        assert_eq!(
            colors(&tree),
            vec![(10, Black), (5, Black), (15, Black), (20, Red)]
        );

        let trace = tree.delete(&5);
        assert_eq!(
            messages(&trace, StepKind::Rotate),
            ["Left rotation at 10"]
        );
        assert_eq!(colors(&tree), vec![(15, Black), (10, Black), (20, Black)]);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_with_red_sibling_rotates_it_up_first() {
        let mut tree = tree_of(&[10, 5, 20, 15, 30, 40]);
        tree.delete(&40);
        assert_eq!(
            colors(&tree),
            vec![(10, Black), (5, Black), (20, Red), (15, Black), (30, Black)]
        );

        let trace = tree.delete(&5);
        assert_eq!(
            messages(&trace, StepKind::Recolor),
            [
                "Sibling 20 is red: recolored it black and 10 red",
                "Sibling 15 has two black children: recolored it red",
                "Recolored 10 black",
            ]
        );
        assert_eq!(messages(&trace, StepKind::Rotate), ["Left rotation at 10"]);
        assert_eq!(
            colors(&tree),
            vec![(20, Black), (10, Black), (15, Red), (30, Black)]
        );
        tree.validate().unwrap();
    }

    #[test]
    fn delete_with_black_nephews_pushes_the_extra_black_up() {
        let mut tree = tree_of(&[20, 10, 30, 5, 15, 1]);
        tree.delete(&1);
        assert_eq!(
            colors(&tree),
            vec![(20, Black), (10, Red), (5, Black), (15, Black), (30, Black)]
        );

        let trace = tree.delete(&15);
        assert_eq!(
            messages(&trace, StepKind::Recolor),
            [
                "Sibling 5 has two black children: recolored it red",
                "Recolored 10 black",
            ]
        );
        assert!(messages(&trace, StepKind::Rotate).is_empty());
        assert_eq!(
            colors(&tree),
            vec![(20, Black), (10, Black), (5, Red), (30, Black)]
        );
        tree.validate().unwrap();
    }

    #[test]
    fn delete_with_red_near_nephew_rotates_twice() {
        let mut tree = tree_of(&[10, 5, 20, 15]);
        assert_eq!(
            colors(&tree),
            vec![(10, Black), (5, Black), (20, Black), (15, Red)]
        );

        let trace = tree.delete(&5);
        assert_eq!(
            messages(&trace, StepKind::Recolor),
            [
                "Near nephew 15 is red: recolored it black and 20 red",
                "Far nephew 20 is red: 15 takes the color of 10, both turn black",
            ]
        );
        assert_eq!(
            messages(&trace, StepKind::Rotate),
            ["Right rotation at 20", "Left rotation at 10"]
        );
        assert_eq!(colors(&tree), vec![(15, Black), (10, Black), (20, Black)]);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_node_with_two_children() {
        let mut tree = tree_of(&[10, 5, 15, 1, 7, 12, 20]);
        let trace = tree.delete(&10);

        assert!(trace
            .iter()
            .any(|step| step.message == "Replacing 10 with successor 12"));
        assert_eq!(tree.keys(), vec![1, 5, 7, 12, 15, 20]);
        assert_eq!(tree.snapshot().root().unwrap().keys, vec![12]);
        tree.validate().unwrap();
    }

    #[test]
    fn delete_missing_key() {
        let mut tree = tree_of(&[10, 5, 15]);
        let before = tree.snapshot();
        let trace = tree.delete(&6);

        assert_eq!(
            trace.kinds(),
            vec![StepKind::Highlight, StepKind::Highlight, StepKind::NotFound]
        );
        assert_eq!(tree.snapshot(), before);
    }

    #[test]
    fn delete_everything() {
        let keys: Vec<i32> = (0..64).collect();
        let mut tree = tree_of(&keys);
        tree.validate().unwrap();

        for key in keys.iter().step_by(2).chain(keys.iter().skip(1).step_by(2)) {
            tree.delete(key);
            tree.validate().unwrap();
        }
        assert!(tree.is_empty());
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

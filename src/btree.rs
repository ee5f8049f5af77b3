//! A multiway balanced search tree.
//!
//! A B-Tree of order `m` stores up to `m - 1` sorted keys per node and an
//! internal node with `k` keys has `k + 1` children. Every node except the
//! root holds at least `(m - 1) / 2` keys and all leaves sit at the same
//! depth. Insertion splits overflowing nodes on the way back up (growing a
//! new root when the old one splits), and deletion repairs underflowing
//! nodes by borrowing from a sibling or merging with one (shrinking the tree
//! when the root runs out of keys).
//!
//! # Examples
//!
//! ```
//! use trace_trees::{btree::BTree, trace::StepKind, Engine};
//!
//! let mut tree = BTree::new(3).unwrap();
//! tree.insert(10);
//! tree.insert(20);
//! let trace = tree.insert(30);
//!
//! assert_eq!(trace.last().unwrap().kind, StepKind::Split);
//! let snapshot = tree.snapshot();
//! let root = snapshot.root().unwrap();
//! assert_eq!(root.keys, vec![20]);
//! let children: Vec<_> = snapshot.children(root.id).iter().map(|n| n.keys.clone()).collect();
//! assert_eq!(children, vec![vec![10], vec![30]]);
//! ```

use crate::arena::{Arena, NodeId};
use crate::config::TreeKind;
use crate::error::{TreeError, MIN_BTREE_ORDER};
use crate::layout::{self, Layout, LayoutConfig};
use crate::node::{BTreeNode, NodeState, Point};
use crate::snapshot::{Edge, Snapshot, SnapshotNode};
use crate::trace::{self, StepKind, StepTrace, Touched};
use crate::{Engine, Key};

/// A B-Tree of a fixed order.
#[derive(Clone, Debug)]
pub struct BTree<K> {
    nodes: Arena<BTreeNode<K>>,
    root: Option<NodeId>,
    order: usize,
    /// Number of stored keys.
    len: usize,
    layout: LayoutConfig,
}

impl<K> BTree<K> {
    /// Generates a new, empty `BTree` whose nodes have at most `order`
    /// children.
    ///
    /// ## Errors
    ///
    /// [`TreeError::InvalidOrder`] if `order` is below 3.
    pub fn new(order: usize) -> Result<Self, TreeError> {
        Self::with_layout(order, LayoutConfig::default())
    }

    /// Like [`BTree::new`], with custom snapshot spacing.
    pub fn with_layout(order: usize, layout: LayoutConfig) -> Result<Self, TreeError> {
        if order < MIN_BTREE_ORDER {
            return Err(TreeError::InvalidOrder {
                order,
                min: MIN_BTREE_ORDER,
            });
        }
        Ok(Self {
            nodes: Arena::new(),
            root: None,
            order,
            len: 0,
            layout,
        })
    }

    /// The maximum number of children per node.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels. Every leaf is this deep.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = self.nodes[id].children.first().copied();
        }
        height
    }

    fn max_keys(&self) -> usize {
        self.order - 1
    }

    fn min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent]
            .children
            .iter()
            .position(|&id| id == child)
            .expect("A parent always links to its children")
    }

    fn rightmost_leaf(&self, mut id: NodeId) -> NodeId {
        while let Some(&last) = self.nodes[id].children.last() {
            id = last;
        }
        id
    }

    fn leftmost_leaf(&self, mut id: NodeId) -> NodeId {
        while let Some(&first) = self.nodes[id].children.first() {
            id = first;
        }
        id
    }

    fn reset_states(&mut self) {
        for node in self.nodes.iter_mut() {
            node.state = NodeState::Default;
            node.found_key = None;
        }
    }
}

impl<K: Key> BTree<K> {
    fn touched(&self, id: NodeId) -> Touched<K> {
        Touched {
            id,
            keys: self.nodes[id].keys.clone(),
        }
    }

    fn show(&self, id: NodeId) -> String {
        format!("[{}]", trace::join(&self.nodes[id].keys, ", "))
    }

    fn relayout(&mut self) {
        let config = self.layout;
        layout::apply(self, &config);
    }

    /// Explains why the descent continues in child `i` of `id`.
    fn direction(&self, id: NodeId, i: usize, key: &K) -> String {
        let keys = &self.nodes[id].keys;
        if i == 0 {
            format!("{key} < {}, going to the first child", keys[0])
        } else if i == keys.len() {
            format!("{key} > {}, going to the last child", keys[i - 1])
        } else {
            format!(
                "{key} is between {} and {}, going to child {i}",
                keys[i - 1],
                keys[i]
            )
        }
    }

    /// Splits the overflowing node `id` around its median and returns the
    /// parent that received the median.
    fn split(&mut self, id: NodeId, trace: &mut StepTrace<K>) -> NodeId {
        let before = self.show(id);
        let node = &mut self.nodes[id];
        let mid = (node.keys.len() + 1) / 2 - 1;
        let right_keys = node.keys.split_off(mid + 1);
        let median = node.keys.pop().expect("An overflowing node has a median");
        let right_children = if node.is_leaf {
            Vec::new()
        } else {
            node.children.split_off(mid + 1)
        };
        let mut right = BTreeNode::new(node.is_leaf);
        right.keys = right_keys;
        right.children = right_children;
        right.parent = node.parent;
        let parent = node.parent;

        let right = self.nodes.alloc(right);
        for child in self.nodes[right].children.clone() {
            self.nodes[child].parent = Some(right);
        }

        let message = format!("Split {before} around {median}, {median} moves up");
        let parent = match parent {
            None => {
                let mut root = BTreeNode::new(false);
                root.keys.push(median);
                root.children = vec![id, right];
                let root = self.nodes.alloc(root);
                self.nodes[id].parent = Some(root);
                self.nodes[right].parent = Some(root);
                self.root = Some(root);
                tracing::trace!(node = %before, "split grew a new root");
                root
            }
            Some(parent) => {
                let at = self.child_index(parent, id);
                self.nodes[parent].keys.insert(at, median);
                self.nodes[parent].children.insert(at + 1, right);
                tracing::trace!(node = %before, "split");
                parent
            }
        };

        trace.push(
            StepKind::Split,
            vec![self.touched(id), self.touched(right), self.touched(parent)],
            message,
        );
        parent
    }

    /// Removes the key at `index` of node `id`.
    fn remove_at(&mut self, id: NodeId, index: usize, trace: &mut StepTrace<K>) {
        let key = self.nodes[id].keys[index].clone();
        if self.nodes[id].is_leaf {
            trace.push(
                StepKind::Clear,
                vec![self.touched(id)],
                format!("Removing {key} from leaf {}", self.show(id)),
            );
            self.nodes[id].keys.remove(index);
            self.rebalance_from(id, trace);
            return;
        }

        trace.push(
            StepKind::Clear,
            vec![self.touched(id)],
            format!("Removing {key} from internal node {}", self.show(id)),
        );

        // Prefer a donor leaf that can spare a key. If neither can, the
        // predecessor's leaf underflows and gets repaired below.
        let children = &self.nodes[id].children;
        let pred = self.rightmost_leaf(children[index]);
        let succ = self.leftmost_leaf(children[index + 1]);
        let min = self.min_keys();
        let use_successor =
            self.nodes[pred].keys.len() <= min && self.nodes[succ].keys.len() > min;
        let (donor, replacement, which) = if use_successor {
            (succ, self.nodes[succ].keys[0].clone(), "successor")
        } else {
            let last = self.nodes[pred].keys.len() - 1;
            (pred, self.nodes[pred].keys[last].clone(), "predecessor")
        };

        trace.push(
            StepKind::Highlight,
            vec![self.touched(id), self.touched(donor)],
            format!("Replacing {key} with {which} {replacement}"),
        );
        if use_successor {
            self.nodes[donor].keys.remove(0);
        } else {
            self.nodes[donor].keys.pop();
        }
        self.nodes[id].keys[index] = replacement;
        self.rebalance_from(donor, trace);
    }

    /// Fixes underflow at `id` and every ancestor it cascades to.
    fn rebalance_from(&mut self, mut id: NodeId, trace: &mut StepTrace<K>) {
        let min = self.min_keys();
        loop {
            let Some(parent) = self.nodes[id].parent else {
                if self.nodes[id].keys.is_empty() {
                    self.collapse_root(id, trace);
                }
                return;
            };
            if self.nodes[id].keys.len() >= min {
                return;
            }

            let at = self.child_index(parent, id);
            let siblings = &self.nodes[parent].children;
            let left = (at > 0).then(|| siblings[at - 1]);
            let right = siblings.get(at + 1).copied();
            if let Some(left) = left.filter(|&left| self.nodes[left].keys.len() > min) {
                self.borrow_from_left(parent, at, left, trace);
                return;
            }
            if let Some(right) = right.filter(|&right| self.nodes[right].keys.len() > min) {
                self.borrow_from_right(parent, at, right, trace);
                return;
            }

            self.merge_children(parent, if left.is_some() { at - 1 } else { at }, trace);
            id = parent;
        }
    }

    fn borrow_from_left(
        &mut self,
        parent: NodeId,
        at: usize,
        left: NodeId,
        trace: &mut StepTrace<K>,
    ) {
        let id = self.nodes[parent].children[at];
        let up = self.nodes[left]
            .keys
            .pop()
            .expect("A lending sibling has spare keys");
        let down = std::mem::replace(&mut self.nodes[parent].keys[at - 1], up.clone());
        let message = format!(
            "Borrowed {down} from the parent, {up} moves up from left sibling {}",
            self.show(left)
        );
        self.nodes[id].keys.insert(0, down);
        if !self.nodes[left].is_leaf {
            let child = self.nodes[left]
                .children
                .pop()
                .expect("Internal nodes have children");
            self.nodes[id].children.insert(0, child);
            self.nodes[child].parent = Some(id);
        }

        tracing::trace!(%up, "borrow from left");
        trace.push(
            StepKind::Borrow,
            vec![self.touched(id), self.touched(left), self.touched(parent)],
            message,
        );
    }

    fn borrow_from_right(
        &mut self,
        parent: NodeId,
        at: usize,
        right: NodeId,
        trace: &mut StepTrace<K>,
    ) {
        let id = self.nodes[parent].children[at];
        let up = self.nodes[right].keys.remove(0);
        let down = std::mem::replace(&mut self.nodes[parent].keys[at], up.clone());
        let message = format!(
            "Borrowed {down} from the parent, {up} moves up from right sibling {}",
            self.show(right)
        );
        self.nodes[id].keys.push(down);
        if !self.nodes[right].is_leaf {
            let child = self.nodes[right].children.remove(0);
            self.nodes[id].children.push(child);
            self.nodes[child].parent = Some(id);
        }

        tracing::trace!(%up, "borrow from right");
        trace.push(
            StepKind::Borrow,
            vec![self.touched(id), self.touched(right), self.touched(parent)],
            message,
        );
    }

    /// Fuses children `i` and `i + 1` of `parent` together with the key that
    /// separates them. The right child is freed.
    fn merge_children(&mut self, parent: NodeId, i: usize, trace: &mut StepTrace<K>) {
        let left = self.nodes[parent].children[i];
        let right = self.nodes[parent].children[i + 1];
        let right_touched = self.touched(right);
        let left_before = self.show(left);
        let right_before = self.show(right);

        let separator = self.nodes[parent].keys.remove(i);
        self.nodes[parent].children.remove(i + 1);
        let absorbed = self.nodes.free(right);
        for &child in &absorbed.children {
            self.nodes[child].parent = Some(left);
        }
        let message =
            format!("Merged {left_before} and {right_before} with separator {separator}");
        let node = &mut self.nodes[left];
        node.keys.push(separator);
        node.keys.extend(absorbed.keys);
        node.children.extend(absorbed.children);

        tracing::trace!(left = %left_before, right = %right_before, "merge");
        trace.push(
            StepKind::Merge,
            vec![self.touched(left), right_touched, self.touched(parent)],
            message,
        );
    }

    /// Drops a root that ran out of keys. Its only child (if any) takes over.
    fn collapse_root(&mut self, root: NodeId, trace: &mut StepTrace<K>) {
        let old = self.nodes.free(root);
        match old.children.first() {
            None => self.root = None,
            Some(&child) => {
                self.nodes[child].parent = None;
                self.root = Some(child);
                tracing::trace!("root collapse");
                trace.push(
                    StepKind::Highlight,
                    vec![self.touched(child)],
                    format!("Root is empty, {} becomes the new root", self.show(child)),
                );
            }
        }
    }

    /// Descends from `current` to the leaf that should hold `key`, inserts
    /// it there and splits every node that overflows on the way back up.
    fn insert_below(&mut self, mut current: NodeId, key: K, trace: &mut StepTrace<K>) {
        loop {
            trace.push(
                StepKind::Highlight,
                vec![self.touched(current)],
                format!("Checking node {}", self.show(current)),
            );
            match self.nodes[current].keys.binary_search(&key) {
                Ok(_) => {
                    trace.push(
                        StepKind::Compare,
                        vec![self.touched(current)],
                        format!("{key} already present in {}", self.show(current)),
                    );
                    return;
                }
                Err(i) if self.nodes[current].is_leaf => {
                    let message = format!("Inserted {key} into leaf");
                    self.nodes[current].keys.insert(i, key);
                    self.len += 1;
                    trace.push(
                        StepKind::Insert,
                        vec![self.touched(current)],
                        format!("{message} {}", self.show(current)),
                    );
                    break;
                }
                Err(i) => {
                    trace.push(
                        StepKind::Compare,
                        vec![self.touched(current)],
                        self.direction(current, i, &key),
                    );
                    current = self.nodes[current].children[i];
                }
            }
        }

        while self.nodes[current].keys.len() > self.max_keys() {
            current = self.split(current, trace);
        }
    }

    fn remove_below(&mut self, mut current: NodeId, key: &K, trace: &mut StepTrace<K>) {
        let found = loop {
            trace.push(
                StepKind::Highlight,
                vec![self.touched(current)],
                format!("Checking node {}", self.show(current)),
            );
            match self.nodes[current].keys.binary_search(key) {
                Ok(i) => break Some(i),
                Err(_) if self.nodes[current].is_leaf => break None,
                Err(i) => current = self.nodes[current].children[i],
            }
        };

        match found {
            Some(index) => {
                trace.push(
                    StepKind::Found,
                    vec![self.touched(current)],
                    format!("Found {key} in node {}", self.show(current)),
                );
                self.remove_at(current, index, trace);
                self.len -= 1;
            }
            None => trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("{key} not found, nothing to delete"),
            ),
        }
    }

    /// Marks the walked path, and the match if there is one. A miss marks
    /// every node.
    fn search_below(&mut self, mut current: NodeId, key: &K, trace: &mut StepTrace<K>) -> bool {
        let mut path = Vec::new();
        let found = loop {
            path.push(current);
            self.nodes[current].state = NodeState::Path;
            trace.push(
                StepKind::Highlight,
                path.iter().map(|&id| self.touched(id)).collect(),
                format!("Searching node {}", self.show(current)),
            );
            match self.nodes[current].keys.binary_search(key) {
                Ok(_) => {
                    let node = &mut self.nodes[current];
                    node.state = NodeState::Found;
                    node.found_key = Some(key.clone());
                    trace.push(
                        StepKind::Found,
                        vec![self.touched(current)],
                        format!("Found {key} in node {}", self.show(current)),
                    );
                    break true;
                }
                Err(_) if self.nodes[current].is_leaf => break false,
                Err(i) => {
                    trace.push(
                        StepKind::Compare,
                        vec![self.touched(current)],
                        self.direction(current, i, key),
                    );
                    current = self.nodes[current].children[i];
                }
            }
        };

        if !found {
            let all = self.pre_order();
            for &id in &all {
                self.nodes[id].state = NodeState::NotFound;
            }
            trace.push(
                StepKind::NotFound,
                all.iter().map(|&id| self.touched(id)).collect(),
                format!("{key} not found"),
            );
        }
        found
    }

    fn collect_keys(&self, id: NodeId, out: &mut Vec<K>) {
        let node = &self.nodes[id];
        for (i, key) in node.keys.iter().enumerate() {
            if let Some(&child) = node.children.get(i) {
                self.collect_keys(child, out);
            }
            out.push(key.clone());
        }
        if let Some(&last) = node.children.get(node.keys.len()) {
            self.collect_keys(last, out);
        }
    }
}

impl<K> Layout for BTree<K> {
    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    fn slots(&self, id: NodeId) -> Vec<Option<NodeId>> {
        self.nodes[id].children.iter().copied().map(Some).collect()
    }

    fn width(&self, id: NodeId, config: &LayoutConfig) -> f64 {
        self.nodes[id].keys.len().max(1) as f64 * config.key_width
    }

    fn place(&mut self, id: NodeId, at: Point) {
        self.nodes[id].pos = at;
    }
}

impl<K: Key> Engine<K> for BTree<K> {
    fn kind(&self) -> TreeKind {
        TreeKind::BTree
    }

    fn insert(&mut self, key: K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        self.reset_states();
        let _span =
            tracing::debug_span!("insert", tree = "b-tree", order = self.order, %key).entered();

        match self.root {
            None => {
                let message = format!("Inserted {key} into a new root");
                let mut root = BTreeNode::new(true);
                root.keys.push(key);
                let root = self.nodes.alloc(root);
                self.root = Some(root);
                self.len = 1;
                trace.push(StepKind::Insert, vec![self.touched(root)], message);
            }
            Some(root) => self.insert_below(root, key, &mut trace),
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), nodes = self.nodes.len(), "insert done");
        trace
    }

    fn delete(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        self.reset_states();
        let _span =
            tracing::debug_span!("delete", tree = "b-tree", order = self.order, %key).entered();

        match self.root {
            None => trace.push(
                StepKind::NotFound,
                Vec::new(),
                format!("Tree is empty, cannot delete {key}"),
            ),
            Some(root) => self.remove_below(root, key, &mut trace),
        }

        self.relayout();
        tracing::debug!(steps = trace.len(), nodes = self.nodes.len(), "delete done");
        trace
    }

    fn search(&mut self, key: &K) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        self.reset_states();

        let found = match self.root {
            None => {
                trace.push(
                    StepKind::NotFound,
                    Vec::new(),
                    format!("Tree is empty, {key} not found"),
                );
                false
            }
            Some(root) => self.search_below(root, key, &mut trace),
        };

        tracing::debug!(tree = "b-tree", %key, found, steps = trace.len(), "search done");
        trace
    }

    fn clear(&mut self) -> StepTrace<K> {
        let mut trace = StepTrace::new();
        let ids = self.pre_order();
        let message = if ids.is_empty() {
            "Tree is already empty".to_string()
        } else {
            format!("Clearing all {} nodes from the tree", ids.len())
        };
        trace.push(
            StepKind::Clear,
            ids.iter().map(|&id| self.touched(id)).collect(),
            message,
        );

        tracing::debug!(tree = "b-tree", nodes = self.nodes.len(), "clear");
        self.nodes.clear();
        self.root = None;
        self.len = 0;
        trace
    }

    fn snapshot(&self) -> Snapshot<K> {
        let ids = self.pre_order();
        let mut nodes = Vec::with_capacity(ids.len());
        let mut edges = Vec::new();
        for &id in &ids {
            let node = &self.nodes[id];
            let mut snap = SnapshotNode::new(id, node.keys.clone(), node.pos, node.state);
            snap.found_key = node.found_key.clone();
            nodes.push(snap);
            edges.extend(node.children.iter().map(|&child| Edge { parent: id, child }));
        }
        Snapshot {
            kind: TreeKind::BTree,
            nodes,
            edges,
        }
    }

    fn contains(&self, key: &K) -> bool {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id];
            match node.keys.binary_search(key) {
                Ok(_) => return true,
                Err(i) => current = node.children.get(i).copied(),
            }
        }
        false
    }

    fn len(&self) -> usize {
        self.len
    }

    fn keys(&self) -> Vec<K> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_keys(root, &mut out);
        }
        out
    }

    fn validate(&self) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            return if self.nodes.is_empty() && self.len == 0 {
                Ok(())
            } else {
                Err(TreeError::invariant(format!(
                    "empty tree still holds {} nodes and counts {} keys",
                    self.nodes.len(),
                    self.len
                )))
            };
        };
        if self.nodes[root].parent.is_some() {
            return Err(TreeError::invariant("root has a parent"));
        }

        let mut leaf_depth = None;
        let mut visited = 0;
        let mut stored = 0;
        let mut stack: Vec<(NodeId, usize, Option<&K>, Option<&K>)> = vec![(root, 0, None, None)];
        while let Some((id, depth, low, high)) = stack.pop() {
            visited += 1;
            let node = &self.nodes[id];
            let keys = &node.keys;
            stored += keys.len();
            if keys.is_empty() {
                return Err(TreeError::invariant(format!("node {id} has no keys")));
            }
            if keys.len() > self.max_keys() {
                return Err(TreeError::invariant(format!(
                    "node {} holds more than {} keys",
                    self.show(id),
                    self.max_keys()
                )));
            }
            if id != root && keys.len() < self.min_keys() {
                return Err(TreeError::invariant(format!(
                    "node {} holds fewer than {} keys",
                    self.show(id),
                    self.min_keys()
                )));
            }
            if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(TreeError::invariant(format!(
                    "keys of {} are not sorted",
                    self.show(id)
                )));
            }
            let first = &keys[0];
            let last = &keys[keys.len() - 1];
            if low.is_some_and(|low| first <= low) || high.is_some_and(|high| last >= high) {
                return Err(TreeError::invariant(format!(
                    "node {} is out of order with its separators",
                    self.show(id)
                )));
            }

            if node.is_leaf {
                if !node.children.is_empty() {
                    return Err(TreeError::invariant(format!(
                        "leaf {} has children",
                        self.show(id)
                    )));
                }
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(TreeError::invariant(format!(
                            "leaf {} is at depth {depth}, others at {expected}",
                            self.show(id)
                        )));
                    }
                    Some(_) => {}
                }
                continue;
            }

            if node.children.len() != keys.len() + 1 {
                return Err(TreeError::invariant(format!(
                    "node {} has {} children",
                    self.show(id),
                    node.children.len()
                )));
            }
            for (i, &child) in node.children.iter().enumerate() {
                if self.nodes[child].parent != Some(id) {
                    return Err(TreeError::invariant(format!(
                        "child {} does not point back at {}",
                        self.show(child),
                        self.show(id)
                    )));
                }
                let low = if i == 0 { low } else { Some(&keys[i - 1]) };
                let high = keys.get(i).or(high);
                stack.push((child, depth + 1, low, high));
            }
        }

        if visited != self.nodes.len() {
            return Err(TreeError::invariant(format!(
                "{visited} nodes reachable but {} allocated",
                self.nodes.len()
            )));
        }
        if stored != self.len {
            return Err(TreeError::invariant(format!(
                "{stored} keys stored but the count says {}",
                self.len
            )));
        }
        Ok(())
    }
}

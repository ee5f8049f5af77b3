//! Helpers shared by the three binary engines ([`Bst`][crate::bst::Bst],
//! [`Avl`][crate::avl::Avl] and [`RedBlack`][crate::red_black::RedBlack]).
//!
//! None of these change the shape of a tree. They walk it, record steps,
//! stamp display states and positions, or check the ordering invariant.

use std::cmp::Ordering;
use std::fmt;

use crate::arena::{Arena, NodeId};
use crate::config::TreeKind;
use crate::error::TreeError;
use crate::layout::{self, Layout, LayoutConfig};
use crate::node::{BinaryNode, NodeState, Point};
use crate::snapshot::{Edge, Snapshot, SnapshotNode};
use crate::trace::{self, StepKind, StepTrace, Touched};

/// A value copy of one node for a trace step.
pub(crate) fn touched<N>(arena: &Arena<N>, id: NodeId) -> Touched<N::Key>
where
    N: BinaryNode,
    N::Key: Clone,
{
    Touched {
        id,
        keys: vec![arena[id].key().clone()],
    }
}

pub(crate) fn touched_all<N>(arena: &Arena<N>, ids: &[NodeId]) -> Vec<Touched<N::Key>>
where
    N: BinaryNode,
    N::Key: Clone,
{
    ids.iter().map(|&id| touched(arena, id)).collect()
}

pub(crate) fn reset_states<N: BinaryNode>(arena: &mut Arena<N>) {
    for node in arena.iter_mut() {
        *node.state_mut() = NodeState::Default;
    }
}

/// Root, then left subtree, then right subtree.
pub(crate) fn pre_order<N: BinaryNode>(arena: &Arena<N>, root: Option<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(arena.len());
    let mut stack: Vec<NodeId> = root.into_iter().collect();
    while let Some(id) = stack.pop() {
        out.push(id);
        // Right first so the left subtree is popped first.
        stack.extend(arena[id].right());
        stack.extend(arena[id].left());
    }
    out
}

pub(crate) fn in_order_keys<N>(arena: &Arena<N>, root: Option<NodeId>) -> Vec<N::Key>
where
    N: BinaryNode,
    N::Key: Clone,
{
    let mut keys = Vec::with_capacity(arena.len());
    let mut stack = Vec::new();
    let mut current = root;
    loop {
        while let Some(id) = current {
            stack.push(id);
            current = arena[id].left();
        }
        let Some(id) = stack.pop() else {
            break;
        };
        keys.push(arena[id].key().clone());
        current = arena[id].right();
    }
    keys
}

/// Trace-free lookup.
pub(crate) fn find<N>(arena: &Arena<N>, root: Option<NodeId>, key: &N::Key) -> Option<NodeId>
where
    N: BinaryNode,
    N::Key: Ord,
{
    let mut current = root;
    while let Some(id) = current {
        current = match key.cmp(arena[id].key()) {
            Ordering::Less => arena[id].left(),
            Ordering::Equal => return Some(id),
            Ordering::Greater => arena[id].right(),
        };
    }
    None
}

/// Walks from the root towards `key`, recording a `highlight` and a
/// `compare` (or `found`) step per level. With `with_path` set, the walked
/// path is additionally reported after every turn and on success, which is
/// how the Red-Black engine explains its searches.
pub(crate) fn search<N>(
    arena: &mut Arena<N>,
    root: Option<NodeId>,
    key: &N::Key,
    with_path: bool,
    trace: &mut StepTrace<N::Key>,
) -> Option<NodeId>
where
    N: BinaryNode,
    N::Key: Ord + Clone + fmt::Display,
{
    if root.is_none() {
        trace.push(
            StepKind::NotFound,
            Vec::new(),
            format!("Tree is empty, {key} not found"),
        );
        return None;
    }

    let mut path: Vec<NodeId> = Vec::new();
    let mut current = root;
    while let Some(id) = current {
        path.push(id);
        *arena[id].state_mut() = NodeState::Path;
        let node_key = arena[id].key().clone();
        trace.push(
            StepKind::Highlight,
            vec![touched(arena, id)],
            format!("Checking node {node_key}"),
        );

        let next = match key.cmp(&node_key) {
            Ordering::Equal => {
                *arena[id].state_mut() = NodeState::Found;
                trace.push(
                    StepKind::Found,
                    vec![touched(arena, id)],
                    format!("Found {key}"),
                );
                if with_path {
                    trace.push(
                        StepKind::SuccessPath,
                        touched_all(arena, &path),
                        format!("Path taken: {}", path_keys(arena, &path)),
                    );
                }
                return Some(id);
            }
            Ordering::Less => {
                trace.push(
                    StepKind::Compare,
                    vec![touched(arena, id)],
                    format!("{key} < {node_key}, going left"),
                );
                arena[id].left()
            }
            Ordering::Greater => {
                trace.push(
                    StepKind::Compare,
                    vec![touched(arena, id)],
                    format!("{key} > {node_key}, going right"),
                );
                arena[id].right()
            }
        };
        if with_path {
            trace.push(
                StepKind::Path,
                touched_all(arena, &path),
                format!("Current path: {}", path_keys(arena, &path)),
            );
        }
        if next.is_none() {
            *arena[id].state_mut() = NodeState::NotFound;
        }
        current = next;
    }

    trace.push(StepKind::NotFound, Vec::new(), format!("{key} not found"));
    None
}

fn path_keys<N>(arena: &Arena<N>, path: &[NodeId]) -> String
where
    N: BinaryNode,
    N::Key: fmt::Display,
{
    let keys: Vec<&N::Key> = path.iter().map(|&id| arena[id].key()).collect();
    trace::join(&keys, " → ")
}

/// Records the single `clear` step over every node, pre-order.
pub(crate) fn clear_step<N>(arena: &Arena<N>, root: Option<NodeId>, trace: &mut StepTrace<N::Key>)
where
    N: BinaryNode,
    N::Key: Clone,
{
    let ids = pre_order(arena, root);
    let message = if ids.is_empty() {
        "Tree is already empty".to_string()
    } else {
        format!("Clearing all {} nodes from the tree", ids.len())
    };
    trace.push(StepKind::Clear, touched_all(arena, &ids), message);
}

/// Checks that every left subtree holds smaller keys and every right subtree
/// larger keys than their parent.
pub(crate) fn check_order<N>(arena: &Arena<N>, root: Option<NodeId>) -> Result<(), TreeError>
where
    N: BinaryNode,
    N::Key: Ord + fmt::Display,
{
    let mut stack: Vec<(NodeId, Option<&N::Key>, Option<&N::Key>)> =
        root.into_iter().map(|id| (id, None, None)).collect();
    while let Some((id, low, high)) = stack.pop() {
        let key = arena[id].key();
        if low.is_some_and(|low| key <= low) || high.is_some_and(|high| key >= high) {
            return Err(TreeError::invariant(format!(
                "key {key} is out of order with its ancestors"
            )));
        }
        if let Some(left) = arena[id].left() {
            stack.push((left, low, Some(key)));
        }
        if let Some(right) = arena[id].right() {
            stack.push((right, Some(key), high));
        }
    }
    Ok(())
}

/// Builds a pre-order snapshot. `extra` fills in the engine specific fields.
pub(crate) fn snapshot<N>(
    arena: &Arena<N>,
    root: Option<NodeId>,
    kind: TreeKind,
    extra: impl Fn(&N, &mut SnapshotNode<N::Key>),
) -> Snapshot<N::Key>
where
    N: BinaryNode,
    N::Key: Clone,
{
    let ids = pre_order(arena, root);
    let mut nodes = Vec::with_capacity(ids.len());
    let mut edges = Vec::new();
    for &id in &ids {
        let node = &arena[id];
        let mut snap = SnapshotNode::new(id, vec![node.key().clone()], node.pos(), node.state());
        extra(node, &mut snap);
        nodes.push(snap);
        for child in [node.left(), node.right()].into_iter().flatten() {
            edges.push(Edge { parent: id, child });
        }
    }
    Snapshot { kind, nodes, edges }
}

/// Recomputes the position of every node.
pub(crate) fn relayout<N: BinaryNode>(
    arena: &mut Arena<N>,
    root: Option<NodeId>,
    config: &LayoutConfig,
) {
    layout::apply(&mut Shape { arena, root }, config);
}

struct Shape<'a, N> {
    arena: &'a mut Arena<N>,
    root: Option<NodeId>,
}

impl<N: BinaryNode> Layout for Shape<'_, N> {
    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    fn slots(&self, id: NodeId) -> Vec<Option<NodeId>> {
        let node = &self.arena[id];
        match (node.left(), node.right()) {
            (None, None) => Vec::new(),
            (left, right) => vec![left, right],
        }
    }

    fn width(&self, _id: NodeId, config: &LayoutConfig) -> f64 {
        config.node_width
    }

    fn place(&mut self, id: NodeId, at: Point) {
        *self.arena[id].pos_mut() = at;
    }
}

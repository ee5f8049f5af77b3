//! Deterministic coordinates for renderers.
//!
//! Depth decides `y`. For `x`, subtree widths are accumulated bottom-up so
//! that siblings never overlap, then each subtree is handed an interval
//! top-down with its children centered inside it and its root centered over
//! them. The finished tree is centered on `x = 0`.

use serde::{Deserialize, Serialize};

use crate::arena::NodeId;
use crate::node::Point;

/// Spacing used by the layout pass.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical distance between two levels.
    pub level_height: f64,
    /// Width reserved for one binary tree node.
    pub node_width: f64,
    /// Width reserved for each key of a B-Tree node.
    pub key_width: f64,
    /// Horizontal gap between neighbouring subtrees.
    pub sibling_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            level_height: 80.0,
            node_width: 50.0,
            key_width: 30.0,
            sibling_gap: 20.0,
        }
    }
}

/// The view of a tree the layout pass needs.
pub(crate) trait Layout {
    fn root(&self) -> Option<NodeId>;

    /// Upper bound on node ids, for sizing the width table.
    fn capacity(&self) -> usize;

    /// Child slots from left to right. A `None` slot is drawn as an empty
    /// gap of one node width.
    fn slots(&self, id: NodeId) -> Vec<Option<NodeId>>;

    fn width(&self, id: NodeId, config: &LayoutConfig) -> f64;

    fn place(&mut self, id: NodeId, at: Point);
}

pub(crate) fn apply<T: Layout>(tree: &mut T, config: &LayoutConfig) {
    let Some(root) = tree.root() else {
        return;
    };
    let mut widths = vec![0.0; tree.capacity()];
    let total = measure(tree, root, config, &mut widths);
    assign(tree, root, -total / 2.0, config, &widths);
}

fn slot_width(slot: Option<NodeId>, config: &LayoutConfig, widths: &[f64]) -> f64 {
    match slot {
        Some(id) => widths[id.index()],
        None => config.node_width,
    }
}

fn children_span(slots: &[Option<NodeId>], config: &LayoutConfig, widths: &[f64]) -> f64 {
    if slots.is_empty() {
        return 0.0;
    }
    let gaps = (slots.len() - 1) as f64 * config.sibling_gap;
    slots
        .iter()
        .map(|&slot| slot_width(slot, config, widths))
        .sum::<f64>()
        + gaps
}

/// Fills `widths` bottom-up and returns the width of the whole tree.
///
/// Walks with an explicit stack: a plain BST fed sorted keys is as deep as it
/// is large.
fn measure<T: Layout>(tree: &T, root: NodeId, config: &LayoutConfig, widths: &mut [f64]) -> f64 {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(tree.slots(id).into_iter().flatten());
    }

    // Every node comes after its ancestors in `order`, so the reverse sees
    // children first.
    for &id in order.iter().rev() {
        let slots = tree.slots(id);
        widths[id.index()] = tree
            .width(id, config)
            .max(children_span(&slots, config, widths));
    }
    widths[root.index()]
}

/// Hands every subtree its interval, top-down, and places its root.
fn assign<T: Layout>(tree: &mut T, root: NodeId, left: f64, config: &LayoutConfig, widths: &[f64]) {
    let mut stack = vec![(root, 0_usize, left)];
    while let Some((id, depth, left)) = stack.pop() {
        let width = widths[id.index()];
        let slots = tree.slots(id);
        let mut cursor = left + (width - children_span(&slots, config, widths)) / 2.0;
        let mut centers = Vec::with_capacity(slots.len());
        for slot in slots {
            let slot_width = slot_width(slot, config, widths);
            if let Some(child) = slot {
                stack.push((child, depth + 1, cursor));
            }
            centers.push(cursor + slot_width / 2.0);
            cursor += slot_width + config.sibling_gap;
        }

        // Over the midpoint of the outermost child slots, but never poking out
        // of the interval this subtree was given.
        let half = tree.width(id, config) / 2.0;
        let x = match (centers.first(), centers.last()) {
            (Some(first), Some(last)) => {
                ((first + last) / 2.0).clamp(left + half, left + width - half)
            }
            _ => left + width / 2.0,
        };
        tree.place(
            id,
            Point {
                x,
                y: depth as f64 * config.level_height,
            },
        );
    }
}

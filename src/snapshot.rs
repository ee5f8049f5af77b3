//! A serializable picture of a tree for renderers: nodes with coordinates
//! and display metadata, plus parent to child edges.

use serde::Serialize;

use crate::arena::NodeId;
use crate::config::TreeKind;
use crate::error::TreeError;
use crate::node::{Color, NodeState, Point};

/// One node as seen by a renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode<K> {
    /// Matches the ids used in [`Touched`][crate::trace::Touched].
    pub id: NodeId,
    /// One key for binary trees, the ordered key list for B-Trees.
    pub keys: Vec<K>,
    /// Horizontal layout coordinate.
    pub x: f64,
    /// Vertical layout coordinate.
    pub y: f64,
    /// Display tag set by the last call.
    pub state: NodeState,
    /// Red-Black only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// AVL only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
    /// AVL only, `height(left) - height(right)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_factor: Option<isize>,
    /// B-Tree only: the key the last search matched in this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_key: Option<K>,
}

impl<K> SnapshotNode<K> {
    pub(crate) fn new(id: NodeId, keys: Vec<K>, pos: Point, state: NodeState) -> Self {
        Self {
            id,
            keys,
            x: pos.x,
            y: pos.y,
            state,
            color: None,
            height: None,
            balance_factor: None,
            found_key: None,
        }
    }
}

/// A parent to child link.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// The upper end of the edge.
    pub parent: NodeId,
    /// The lower end of the edge.
    pub child: NodeId,
}

/// Every node of a tree in pre-order, and every edge in the same order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot<K> {
    /// The engine that produced the snapshot.
    pub kind: TreeKind,
    /// Pre-order, so the root (if any) comes first.
    pub nodes: Vec<SnapshotNode<K>>,
    /// Parent to child links.
    pub edges: Vec<Edge>,
}

impl<K> Snapshot<K> {
    /// The root node, if the tree isn't empty.
    pub fn root(&self) -> Option<&SnapshotNode<K>> {
        self.nodes.first()
    }

    /// Looks a node up by id.
    pub fn node(&self, id: NodeId) -> Option<&SnapshotNode<K>> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// The children of `id`, left to right.
    pub fn children(&self, id: NodeId) -> Vec<&SnapshotNode<K>> {
        self.edges
            .iter()
            .filter(|edge| edge.parent == id)
            .filter_map(|edge| self.node(edge.child))
            .collect()
    }

    /// All keys in the snapshot, node by node in pre-order.
    pub fn keys(&self) -> Vec<&K> {
        self.nodes.iter().flat_map(|node| node.keys.iter()).collect()
    }

    /// Encodes the snapshot as JSON.
    pub fn to_json(&self) -> Result<String, TreeError>
    where
        K: Serialize,
    {
        serde_json::to_string(self).map_err(TreeError::Serialize)
    }
}

//! The node records stored by each engine.
//!
//! Every record carries its key(s), its structural links as [`NodeId`]s, a
//! layout position and a display [`NodeState`]. Links to parents are plain
//! indices used for walking upwards during fixups; ownership always flows
//! from the engine's arena, never from a parent.

use serde::{Deserialize, Serialize};

use crate::arena::NodeId;

/// Display tag used by renderers to correlate a node with the last trace.
///
/// Engines leave nodes in `Default`, `Path`, `Found` or `NotFound` once a
/// call returns. `Highlight` and `Compare` are never left behind: a renderer
/// replaying a trace paints them one step at a time, see
/// [`StepKind::node_state`][crate::trace::StepKind::node_state].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    /// Nothing interesting happened to this node.
    #[default]
    Default,
    /// The node is currently being examined.
    Highlight,
    /// The node took part in a directional comparison.
    Compare,
    /// The node holds the key that was searched for.
    Found,
    /// The search ended here (or, for a B-Tree, anywhere) without a match.
    NotFound,
    /// The node lies on the path walked by the last search.
    Path,
}

/// Red-Black node color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    /// Newly inserted nodes are red.
    Red,
    /// The root and every counted node of a black-height.
    Black,
}

/// Layout coordinates handed to renderers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position. The tree is centered on `x = 0`.
    pub x: f64,
    /// Vertical position, `depth * level_height`.
    pub y: f64,
}

/// Read access shared by the three binary engines so that searching,
/// traversal, layout and validation can be written once.
pub(crate) trait BinaryNode {
    type Key;

    fn key(&self) -> &Self::Key;
    fn left(&self) -> Option<NodeId>;
    fn right(&self) -> Option<NodeId>;
    fn state(&self) -> NodeState;
    fn pos(&self) -> Point;
    fn state_mut(&mut self) -> &mut NodeState;
    fn pos_mut(&mut self) -> &mut Point;
}

macro_rules! impl_binary_node {
    ($node:ident) => {
        impl<K> BinaryNode for $node<K> {
            type Key = K;

            fn key(&self) -> &K {
                &self.key
            }

            fn left(&self) -> Option<NodeId> {
                self.left
            }

            fn right(&self) -> Option<NodeId> {
                self.right
            }

            fn state(&self) -> NodeState {
                self.state
            }

            fn pos(&self) -> Point {
                self.pos
            }

            fn state_mut(&mut self) -> &mut NodeState {
                &mut self.state
            }

            fn pos_mut(&mut self) -> &mut Point {
                &mut self.pos
            }
        }
    };
}

#[derive(Clone, Debug)]
pub(crate) struct BstNode<K> {
    pub(crate) key: K,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) pos: Point,
    pub(crate) state: NodeState,
}

impl<K> BstNode<K> {
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            left: None,
            right: None,
            pos: Point::default(),
            state: NodeState::Default,
        }
    }
}

impl_binary_node!(BstNode);

#[derive(Clone, Debug)]
pub(crate) struct AvlNode<K> {
    pub(crate) key: K,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// How many levels are in the subtree rooted at this node.
    /// A node with no children has a height of 1.
    pub(crate) height: usize,
    /// `height(left) - height(right)`.
    pub(crate) balance: isize,
    pub(crate) pos: Point,
    pub(crate) state: NodeState,
}

impl<K> AvlNode<K> {
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            left: None,
            right: None,
            height: 1,
            balance: 0,
            pos: Point::default(),
            state: NodeState::Default,
        }
    }
}

impl_binary_node!(AvlNode);

#[derive(Clone, Debug)]
pub(crate) struct RbNode<K> {
    pub(crate) key: K,
    pub(crate) color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) pos: Point,
    pub(crate) state: NodeState,
}

impl<K> RbNode<K> {
    /// New nodes always start out red.
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            color: Color::Red,
            left: None,
            right: None,
            parent: None,
            pos: Point::default(),
            state: NodeState::Default,
        }
    }
}

impl_binary_node!(RbNode);

#[derive(Clone, Debug)]
pub(crate) struct BTreeNode<K> {
    pub(crate) keys: Vec<K>,
    /// Empty for leaves, `keys.len() + 1` entries otherwise.
    pub(crate) children: Vec<NodeId>,
    pub(crate) is_leaf: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) pos: Point,
    pub(crate) state: NodeState,
    /// Which key (if any) the last search matched in this node.
    pub(crate) found_key: Option<K>,
}

impl<K> BTreeNode<K> {
    pub(crate) fn new(is_leaf: bool) -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
            is_leaf,
            parent: None,
            pos: Point::default(),
            state: NodeState::Default,
            found_key: None,
        }
    }
}

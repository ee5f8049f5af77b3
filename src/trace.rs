//! The ordered log of micro-steps produced by one engine call.
//!
//! A [`StepTrace`] is pure data. The tree's structure after the call is
//! authoritative and the trace explains, in call order, how it was reached.
//! Every call builds a fresh trace and threads it by `&mut` through the
//! recursion, so two calls can never write into the same log.
//!
//! # Examples
//!
//! ```
//! use trace_trees::{bst::Bst, trace::StepKind, Engine};
//!
//! let mut tree = Bst::new();
//! tree.insert(10);
//! let trace = tree.insert(5);
//!
//! assert_eq!(trace.kinds(), vec![StepKind::Compare, StepKind::Insert]);
//! assert_eq!(trace.last().unwrap().message, "Inserted 5 as left child of 10");
//! ```

use std::fmt;

use serde::Serialize;

use crate::arena::NodeId;
use crate::error::TreeError;
use crate::node::NodeState;

/// What happened in one [`Step`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// A key was placed into a new or existing node.
    Insert,
    /// A node is under examination.
    Highlight,
    /// A directional decision was taken at a node.
    Compare,
    /// The searched key was located.
    Found,
    /// The searched key is absent.
    NotFound,
    /// Nodes are being removed.
    Clear,
    /// A rotation around the first node in the step.
    Rotate,
    /// An overflowing B-Tree node was split in two.
    Split,
    /// Red-Black nodes changed color.
    Recolor,
    /// A B-Tree node took a key from a sibling through their parent.
    Borrow,
    /// Two B-Tree siblings were fused with their separator key.
    Merge,
    /// The path walked so far.
    Path,
    /// The full path that led to a successful search.
    #[serde(rename = "success-path")]
    SuccessPath,
}

impl StepKind {
    /// The state a renderer paints the nodes of a step of this kind with
    /// while replaying a trace.
    pub fn node_state(self) -> NodeState {
        match self {
            Self::Compare => NodeState::Compare,
            Self::Found => NodeState::Found,
            Self::NotFound => NodeState::NotFound,
            Self::Path | Self::SuccessPath => NodeState::Path,
            Self::Insert
            | Self::Highlight
            | Self::Clear
            | Self::Rotate
            | Self::Split
            | Self::Recolor
            | Self::Borrow
            | Self::Merge => NodeState::Highlight,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Highlight => "highlight",
            Self::Compare => "compare",
            Self::Found => "found",
            Self::NotFound => "notFound",
            Self::Clear => "clear",
            Self::Rotate => "rotate",
            Self::Split => "split",
            Self::Recolor => "recolor",
            Self::Borrow => "borrow",
            Self::Merge => "merge",
            Self::Path => "path",
            Self::SuccessPath => "success-path",
        };
        f.write_str(name)
    }
}

/// A value copy of a node as it looked when the step was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Touched<K> {
    /// The node's id in the engine that recorded the step.
    pub id: NodeId,
    /// The node's key (binary trees) or key list (B-Trees).
    pub keys: Vec<K>,
}

/// One entry of a [`StepTrace`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Step<K> {
    /// The event type.
    pub kind: StepKind,
    /// The nodes involved, in a kind specific order.
    pub nodes: Vec<Touched<K>>,
    /// A human readable explanation.
    pub message: String,
}

/// An append-only, ordered list of [`Step`]s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepTrace<K> {
    steps: Vec<Step<K>>,
}

impl<K> Default for StepTrace<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> StepTrace<K> {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub(crate) fn push(&mut self, kind: StepKind, nodes: Vec<Touched<K>>, message: String) {
        tracing::trace!(%kind, nodes = nodes.len(), %message, "step");
        self.steps.push(Step {
            kind,
            nodes,
            message,
        });
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over the steps in the order they happened.
    pub fn iter(&self) -> std::slice::Iter<'_, Step<K>> {
        self.steps.iter()
    }

    /// The kinds of every step, in order. Handy for asserting on the shape of
    /// a trace.
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|step| step.kind).collect()
    }

    /// The most recent step.
    pub fn last(&self) -> Option<&Step<K>> {
        self.steps.last()
    }

    /// The steps as a slice.
    pub fn steps(&self) -> &[Step<K>] {
        &self.steps
    }

    /// Encodes the trace as a JSON array.
    pub fn to_json(&self) -> Result<String, TreeError>
    where
        K: Serialize,
    {
        serde_json::to_string(self).map_err(TreeError::Serialize)
    }
}

impl<'a, K> IntoIterator for &'a StepTrace<K> {
    type Item = &'a Step<K>;
    type IntoIter = std::slice::Iter<'a, Step<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl<K> IntoIterator for StepTrace<K> {
    type Item = Step<K>;
    type IntoIter = std::vec::IntoIter<Step<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// Joins keys for messages like `[1, 2, 3]` or `10 → 5 → 7`.
pub(crate) fn join<K: fmt::Display>(keys: &[K], sep: &str) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_with_renderer_names() {
        let kinds = [
            StepKind::NotFound,
            StepKind::SuccessPath,
            StepKind::Rotate,
            StepKind::Recolor,
        ];
        let json = serde_json::to_string(&kinds).unwrap();
        assert_eq!(json, r#"["notFound","success-path","rotate","recolor"]"#);

        for kind in kinds {
            assert_eq!(format!("\"{kind}\""), serde_json::to_string(&kind).unwrap());
        }
    }

    #[test]
    fn trace_keeps_call_order() {
        let mut trace = StepTrace::new();
        trace.push(StepKind::Highlight, Vec::new(), "first".to_string());
        trace.push(
            StepKind::Found,
            vec![Touched {
                id: NodeId(3),
                keys: vec![7],
            }],
            "second".to_string(),
        );

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.kinds(), vec![StepKind::Highlight, StepKind::Found]);
        let messages: Vec<_> = trace.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(
            trace.to_json().unwrap(),
            r#"[{"kind":"highlight","nodes":[],"message":"first"},{"kind":"found","nodes":[{"id":3,"keys":[7]}],"message":"second"}]"#
        );
    }

    #[test]
    fn steps_map_to_display_states() {
        assert_eq!(StepKind::Highlight.node_state(), NodeState::Highlight);
        assert_eq!(StepKind::Compare.node_state(), NodeState::Compare);
        assert_eq!(StepKind::Found.node_state(), NodeState::Found);
        assert_eq!(StepKind::NotFound.node_state(), NodeState::NotFound);
        assert_eq!(StepKind::SuccessPath.node_state(), NodeState::Path);
        assert_eq!(StepKind::Rotate.node_state(), NodeState::Highlight);
    }

    #[test]
    fn join_formats_keys() {
        assert_eq!(join(&[1, 2, 3], ", "), "1, 2, 3");
        assert_eq!(join::<i32>(&[], ", "), "");
    }
}

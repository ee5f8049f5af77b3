//! This crate exposes four ordered search trees that explain themselves,
//! mostly for educational purposes.
//!
//! ## Search trees
//!
//! A search tree stores keys so that they can be inserted, found, and
//! deleted by repeatedly comparing against the keys stored in its nodes. For
//! binary trees the most important invariants are:
//!
//! 1. For every `Node`, all the `Node`s in its left subtree have a key less
//!    than its own key.
//! 2. For every `Node`, all the `Node`s in its right subtree have a key
//!    greater than its own key.
//!
//! A plain [`Bst`][bst::Bst] stops there, so its height depends on the order
//! keys arrive in. An [`Avl`][avl::Avl] tree additionally keeps the heights of
//! every node's subtrees within one of each other, rotating as needed. A
//! [`RedBlack`][red_black::RedBlack] tree colors nodes so that no red node has
//! a red child and every root-to-leaf path crosses the same number of black
//! nodes. A [`BTree`][btree::BTree] gives up on binary nodes altogether,
//! storing up to `order - 1` sorted keys per node and splitting or merging
//! nodes to keep every leaf at the same depth.
//!
//! ## Traces
//!
//! Every call to `insert`, `delete`, `search` or `clear` returns a
//! [`StepTrace`][trace::StepTrace]: the comparisons, rotations, splits and
//! recolorings performed, in the order they happened. The same sequence of
//! calls always produces the same traces, so a renderer can replay them.
//! [`Engine::snapshot`] gives the matching picture of the tree.
//!
//! ## History
//!
//! Engines are `Clone` and a clone shares nothing with its source. The
//! [`History`][history::History] type builds undo/redo on top of that.
//!
//! # Examples
//!
//! ```
//! use trace_trees::{avl::Avl, trace::StepKind, Engine};
//!
//! let mut tree = Avl::new();
//! tree.insert(10);
//! tree.insert(20);
//! let trace = tree.insert(30);
//!
//! assert!(trace.kinds().contains(&StepKind::Rotate));
//! assert_eq!(tree.keys(), vec![10, 20, 30]);
//! assert_eq!(tree.snapshot().root().unwrap().keys, vec![20]);
//! ```

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

use std::fmt;

pub mod arena;
pub mod avl;
mod binary;
pub mod bst;
pub mod btree;
pub mod config;
pub mod error;
pub mod history;
pub mod layout;
pub mod node;
pub mod red_black;
pub mod snapshot;
pub mod trace;


pub use arena::NodeId;
pub use config::{TreeConfig, TreeKind};
pub use error::TreeError;
pub use history::{History, Operation};
pub use snapshot::Snapshot;
pub use trace::{Step, StepKind, StepTrace};

/// What a tree needs from its keys: a total order, cheap copies for trace
/// steps and snapshots, and a printable form for trace messages.
pub trait Key: Ord + Clone + fmt::Display {}

impl<T> Key for T where T: Ord + Clone + fmt::Display {}

/// The operations every engine offers.
///
/// Each mutating or searching call runs to completion and returns a fresh
/// trace of what it did. Missing keys, duplicates and empty trees are normal
/// outcomes reported through the trace.
pub trait Engine<K: Key>: Clone {
    /// Which engine this is.
    fn kind(&self) -> TreeKind;

    /// Inserts `key`. Inserting a key that is already present leaves the
    /// tree untouched.
    fn insert(&mut self, key: K) -> StepTrace<K>;

    /// Removes `key`. Removing an absent key leaves the tree untouched and
    /// the trace explains the failed search.
    fn delete(&mut self, key: &K) -> StepTrace<K>;

    /// Looks for `key`, marking the walked nodes for display.
    fn search(&mut self, key: &K) -> StepTrace<K>;

    /// Removes every node.
    fn clear(&mut self) -> StepTrace<K>;

    /// The nodes and edges of the tree with their layout coordinates.
    fn snapshot(&self) -> Snapshot<K>;

    /// Whether `key` is stored, without recording anything.
    fn contains(&self, key: &K) -> bool;

    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether no key is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored key in ascending order.
    fn keys(&self) -> Vec<K>;

    /// Walks the whole tree checking its structural invariants.
    fn validate(&self) -> Result<(), TreeError>;
}

/// Any of the four engines, chosen at runtime.
#[derive(Clone, Debug)]
pub enum AnyTree<K> {
    /// See [`bst`].
    Bst(bst::Bst<K>),
    /// See [`avl`].
    Avl(avl::Avl<K>),
    /// See [`red_black`].
    RedBlack(red_black::RedBlack<K>),
    /// See [`btree`].
    BTree(btree::BTree<K>),
}

impl<K: Key> AnyTree<K> {
    /// Builds the engine described by `config`.
    pub fn from_config(config: &TreeConfig) -> Result<Self, TreeError> {
        Ok(match config.kind {
            TreeKind::Bst => Self::Bst(bst::Bst::with_layout(config.layout)),
            TreeKind::Avl => Self::Avl(avl::Avl::with_layout(config.layout)),
            TreeKind::RedBlack => Self::RedBlack(red_black::RedBlack::with_layout(config.layout)),
            TreeKind::BTree => Self::BTree(btree::BTree::with_layout(config.order, config.layout)?),
        })
    }
}

macro_rules! dispatch {
    ($self:ident, $tree:ident => $call:expr) => {
        match $self {
            AnyTree::Bst($tree) => $call,
            AnyTree::Avl($tree) => $call,
            AnyTree::RedBlack($tree) => $call,
            AnyTree::BTree($tree) => $call,
        }
    };
}

impl<K: Key> Engine<K> for AnyTree<K> {
    fn kind(&self) -> TreeKind {
        dispatch!(self, tree => tree.kind())
    }

    fn insert(&mut self, key: K) -> StepTrace<K> {
        dispatch!(self, tree => tree.insert(key))
    }

    fn delete(&mut self, key: &K) -> StepTrace<K> {
        dispatch!(self, tree => tree.delete(key))
    }

    fn search(&mut self, key: &K) -> StepTrace<K> {
        dispatch!(self, tree => tree.search(key))
    }

    fn clear(&mut self) -> StepTrace<K> {
        dispatch!(self, tree => tree.clear())
    }

    fn snapshot(&self) -> Snapshot<K> {
        dispatch!(self, tree => tree.snapshot())
    }

    fn contains(&self, key: &K) -> bool {
        dispatch!(self, tree => tree.contains(key))
    }

    fn len(&self) -> usize {
        dispatch!(self, tree => tree.len())
    }

    fn keys(&self) -> Vec<K> {
        dispatch!(self, tree => tree.keys())
    }

    fn validate(&self) -> Result<(), TreeError> {
        dispatch!(self, tree => tree.validate())
    }
}

//! Linear undo/redo over whole trees.
//!
//! Every applied [`Operation`] runs against a fresh clone of the current
//! tree, so each entry keeps the exact tree and trace it produced. Undoing
//! moves a cursor back, and applying a new operation after an undo drops the
//! entries that could have been redone.
//!
//! # Examples
//!
//! ```
//! use trace_trees::{avl::Avl, history::{History, Operation}, Engine};
//!
//! let mut history = History::new(Avl::new());
//! history.apply(Operation::Insert(1));
//! history.apply(Operation::Insert(2));
//! assert_eq!(history.current().keys(), vec![1, 2]);
//!
//! assert!(history.undo());
//! assert_eq!(history.current().keys(), vec![1]);
//!
//! assert!(history.redo());
//! assert_eq!(history.current().keys(), vec![1, 2]);
//! ```

use serde::{Deserialize, Serialize};

use crate::trace::StepTrace;
use crate::{Engine, Key};

/// One call to an [`Engine`], as data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "key", rename_all = "camelCase")]
pub enum Operation<K> {
    /// [`Engine::insert`]
    Insert(K),
    /// [`Engine::delete`]
    Delete(K),
    /// [`Engine::search`]
    Search(K),
    /// [`Engine::clear`]
    Clear,
}

impl<K: Key> Operation<K> {
    /// Runs the operation against `tree`.
    pub fn apply<T: Engine<K>>(&self, tree: &mut T) -> StepTrace<K> {
        match self {
            Self::Insert(key) => tree.insert(key.clone()),
            Self::Delete(key) => tree.delete(key),
            Self::Search(key) => tree.search(key),
            Self::Clear => tree.clear(),
        }
    }
}

#[derive(Clone, Debug)]
struct Entry<K, T> {
    tree: T,
    trace: StepTrace<K>,
}

/// A list of tree versions with a cursor pointing at the current one.
#[derive(Clone, Debug)]
pub struct History<K, T> {
    entries: Vec<Entry<K, T>>,
    cursor: usize,
}

impl<K: Key, T: Engine<K>> History<K, T> {
    /// Starts a history whose first entry is `tree` with an empty trace.
    pub fn new(tree: T) -> Self {
        Self {
            entries: vec![Entry {
                tree,
                trace: StepTrace::new(),
            }],
            cursor: 0,
        }
    }

    /// Applies `op` to a clone of the current tree and makes the result
    /// current. Anything that could have been redone is discarded.
    pub fn apply(&mut self, op: Operation<K>) -> &StepTrace<K> {
        let mut tree = self.current().clone();
        let trace = op.apply(&mut tree);

        let dropped = self.entries.len() - self.cursor - 1;
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Entry { tree, trace });
        self.cursor += 1;
        tracing::debug!(
            entries = self.entries.len(),
            dropped,
            "history entry added"
        );

        &self.entries[self.cursor].trace
    }

    /// Steps back one entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        tracing::debug!(cursor = self.cursor, "undo");
        true
    }

    /// Steps forward one entry. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        tracing::debug!(cursor = self.cursor, "redo");
        true
    }

    /// The tree at the cursor.
    pub fn current(&self) -> &T {
        &self.entries[self.cursor].tree
    }

    /// The trace that produced the tree at the cursor. Empty for the first
    /// entry.
    pub fn current_trace(&self) -> &StepTrace<K> {
        &self.entries[self.cursor].trace
    }

    /// Whether [`History::undo`] would move.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether [`History::redo`] would move.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of entries, including the initial one.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Index of the current entry.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

//! Index based node storage shared by every engine.
//!
//! Nodes live in a `Vec` and refer to each other through [`NodeId`]s rather
//! than pointers. Rotations, splits and merges only ever rewrite indices, and
//! cloning a whole tree is a single bulk copy of the slot table.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;

/// A handle to a node inside one engine's [`Arena`].
///
/// Ids are only meaningful for the engine (or clone of the engine) that
/// produced them. A freed id may be handed out again by a later insert.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The slot index behind this id.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Arena<N> {
    slots: Vec<Option<N>>,
    free: Vec<NodeId>,
}

impl<N> Default for Arena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Arena<N> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: N) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Removes the node from the arena and hands it back. The id becomes
    /// available for reuse.
    pub(crate) fn free(&mut self, id: NodeId) -> N {
        let node = self.slots[id.0]
            .take()
            .expect("Freeing a node requires it to be live");
        self.free.push(id);
        node
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the largest id ever handed out. Useful for sizing side tables.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut N> {
        self.slots.iter_mut().flatten()
    }
}

impl<N> Index<NodeId> for Arena<N> {
    type Output = N;

    fn index(&self, id: NodeId) -> &N {
        self.slots[id.0]
            .as_ref()
            .expect("NodeId must refer to a live node")
    }
}

impl<N> IndexMut<NodeId> for Arena<N> {
    fn index_mut(&mut self, id: NodeId) -> &mut N {
        self.slots[id.0]
            .as_mut()
            .expect("NodeId must refer to a live node")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.free(a), 1);
        assert_eq!(arena.len(), 1);

        let c = arena.alloc(3);
        assert_eq!(c, a);
        assert_eq!(arena[c], 3);
        assert_eq!(arena[b], 2);
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    fn clone_is_independent() {
        let mut arena = Arena::new();
        let a = arena.alloc(String::from("a"));
        let mut copy = arena.clone();
        copy[a].push('!');

        assert_eq!(arena[a], "a");
        assert_eq!(copy[a], "a!");
    }

    #[test]
    #[should_panic(expected = "live node")]
    fn indexing_freed_slot_panics() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        arena.free(a);
        let _ = arena[a];
    }
}

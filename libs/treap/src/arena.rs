// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Slot storage for treap nodes.
//!
//! Nodes live in two parallel tables: the [`LinkTable`] holds the topology (parent/child links
//! plus the sentinel) and the entry table holds values and priorities. Keeping them apart lets
//! navigation borrow the links while values are handed out mutably, see [`crate::IterMut`].

use alloc::vec::Vec;
use core::{fmt, mem};

use crate::utils::Side;
use crate::{AllocError, Priority};

/// A reference to a node slot inside an [`Arena`].
///
/// This is encoded as a `u32` index to keep links small. Index `0` is reserved for the sentinel,
/// real nodes start at `1`. This doesn't have a lifetime, but is logically bound to the arena it
/// was allocated from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeRef(u32);

impl NodeRef {
    /// The reserved anchor slot. Every tree has its sentinel at this index.
    pub(crate) const SENTINEL: Self = Self(0);

    /// Index into the slot vectors. Must not be called on the sentinel.
    #[inline]
    fn slot(self) -> usize {
        debug_assert_ne!(self, Self::SENTINEL, "the sentinel has no slot");
        self.0 as usize - 1
    }

    /// Raw index, stable for the lifetime of the node.
    #[cfg(feature = "dot")]
    #[inline]
    pub(crate) fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            f.write_str("NodeRef(sentinel)")
        } else {
            write!(f, "NodeRef({})", self.0)
        }
    }
}

pub(crate) type Link = Option<NodeRef>;

/// Links of a single node, or of the sentinel.
///
/// For a node, `up` is its parent (the sentinel when the node is the root). For the sentinel,
/// `up` is the root, `left` the leftmost node and `right` the rightmost node; all three point
/// back at the sentinel itself when the tree is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) up: NodeRef,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

impl Links {
    const EMPTY_SENTINEL: Self = Self {
        up: NodeRef::SENTINEL,
        left: Some(NodeRef::SENTINEL),
        right: Some(NodeRef::SENTINEL),
    };

    const DETACHED: Self = Self {
        up: NodeRef::SENTINEL,
        left: None,
        right: None,
    };

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Link {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn replace_child(&mut self, side: Side, child: Link) -> Link {
        match side {
            Side::Left => mem::replace(&mut self.left, child),
            Side::Right => mem::replace(&mut self.right, child),
        }
    }
}

/// The topology of a tree: the sentinel's links plus one `Links` per slot.
pub(crate) struct LinkTable {
    sentinel: Links,
    slots: Vec<Links>,
}

impl LinkTable {
    const fn new() -> Self {
        Self {
            sentinel: Links::EMPTY_SENTINEL,
            slots: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self, node: NodeRef) -> &Links {
        if node.is_sentinel() {
            &self.sentinel
        } else {
            &self.slots[node.slot()]
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, node: NodeRef) -> &mut Links {
        if node.is_sentinel() {
            &mut self.sentinel
        } else {
            &mut self.slots[node.slot()]
        }
    }

    #[inline]
    pub(crate) fn root(&self) -> Link {
        let root = self.sentinel.up;
        (!root.is_sentinel()).then_some(root)
    }

    #[inline]
    pub(crate) fn leftmost(&self) -> NodeRef {
        self.sentinel.left.unwrap_or(NodeRef::SENTINEL)
    }

    #[inline]
    pub(crate) fn rightmost(&self) -> NodeRef {
        self.sentinel.right.unwrap_or(NodeRef::SENTINEL)
    }

    #[inline]
    pub(crate) fn set_root(&mut self, root: Link) {
        self.sentinel.up = root.unwrap_or(NodeRef::SENTINEL);
    }

    #[inline]
    pub(crate) fn set_leftmost(&mut self, node: NodeRef) {
        self.sentinel.left = Some(node);
    }

    #[inline]
    pub(crate) fn set_rightmost(&mut self, node: NodeRef) {
        self.sentinel.right = Some(node);
    }

    #[inline]
    pub(crate) fn parent(&self, node: NodeRef) -> NodeRef {
        self.get(node).up
    }

    #[inline]
    pub(crate) fn left(&self, node: NodeRef) -> Link {
        self.get(node).left
    }

    #[inline]
    pub(crate) fn right(&self, node: NodeRef) -> Link {
        self.get(node).right
    }

    /// Returns on which side of its parent `node` hangs. Must not be called on the root.
    #[inline]
    pub(crate) fn side_of(&self, node: NodeRef) -> Side {
        let parent = self.parent(node);
        debug_assert!(!parent.is_sentinel(), "the root is nobody's child");
        if self.left(parent) == Some(node) {
            Side::Left
        } else {
            debug_assert_eq!(self.right(parent), Some(node));
            Side::Right
        }
    }

    /// Points whatever referenced `old` as a child (or as the root) at `new` instead.
    pub(crate) fn replace_in_parent(&mut self, old: NodeRef, new: Link) {
        let parent = self.parent(old);
        if parent.is_sentinel() {
            self.set_root(new);
        } else {
            let side = self.side_of(old);
            self.get_mut(parent).replace_child(side, new);
        }
    }
}

/// A value slot.
pub(crate) enum Entry<T> {
    Occupied { value: T, priority: Priority },
    Vacant { next_free: Link },
}

impl<T> Entry<T> {
    #[inline]
    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }
}

/// Growable slot arena with a free list of vacated slots.
pub(crate) struct Arena<T> {
    pub(crate) links: LinkTable,
    entries: Vec<Entry<T>>,
    free_head: Link,
    occupied: usize,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            links: LinkTable::new(),
            entries: Vec::new(),
            free_head: None,
            occupied: 0,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub(crate) fn occupied(&self) -> usize {
        self.occupied
    }

    /// Makes sure `additional` more nodes can be allocated without growing the slot vectors.
    ///
    /// Vacant slots on the free list count towards the available space.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let vacant = self.entries.len() - self.occupied;
        let Some(needed) = additional.checked_sub(vacant).filter(|needed| *needed > 0) else {
            return Ok(());
        };

        // slot indices are offset by one for the sentinel and must fit a `u32`
        let total = self
            .entries
            .len()
            .checked_add(needed)
            .filter(|total| *total < u32::MAX as usize)
            .ok_or(AllocError::TooManyNodes)?;
        debug_assert!(total > self.entries.len());

        self.entries.try_reserve(needed)?;
        self.links.slots.try_reserve(needed)?;
        Ok(())
    }

    /// Places `value` into a vacant slot, returning the slot's reference.
    ///
    /// The new node is detached: its links must be set by the caller before the tree is observed.
    ///
    /// # Panics
    ///
    /// Panics if there is no free slot and no spare capacity, i.e. if the caller didn't
    /// [`try_reserve`](Self::try_reserve) first.
    pub(crate) fn alloc(&mut self, value: T, priority: Priority) -> NodeRef {
        self.occupied += 1;
        let entry = Entry::Occupied { value, priority };

        if let Some(node) = self.free_head {
            let slot = node.slot();
            let Entry::Vacant { next_free } = mem::replace(&mut self.entries[slot], entry) else {
                unreachable!("free list references an occupied slot {node:?}");
            };
            self.free_head = next_free;
            self.links.slots[slot] = Links::DETACHED;
            node
        } else {
            assert!(
                self.entries.len() < self.entries.capacity()
                    && self.links.slots.len() < self.links.slots.capacity(),
                "node allocation without reserved capacity"
            );
            self.entries.push(entry);
            self.links.slots.push(Links::DETACHED);
            // `try_reserve` keeps the slot count below `u32::MAX`
            NodeRef(u32::try_from(self.entries.len()).unwrap_or(u32::MAX))
        }
    }

    /// Vacates the slot of `node`, handing back its value and putting the slot on the free list.
    pub(crate) fn free(&mut self, node: NodeRef) -> T {
        let slot = node.slot();
        let vacant = Entry::Vacant {
            next_free: self.free_head,
        };
        let Entry::Occupied { value, .. } = mem::replace(&mut self.entries[slot], vacant) else {
            unreachable!("double free of {node:?}");
        };
        self.free_head = Some(node);
        self.links.slots[slot] = Links::DETACHED;
        self.occupied -= 1;
        value
    }

    /// Drops all values and releases every slot, returning the arena to its empty state.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.links.slots.clear();
        self.links.sentinel = Links::EMPTY_SENTINEL;
        self.free_head = None;
        self.occupied = 0;
    }

    #[inline]
    pub(crate) fn entry(&self, node: NodeRef) -> Option<&Entry<T>> {
        if node.is_sentinel() {
            None
        } else {
            self.entries.get(node.slot())
        }
    }

    /// Returns the value stored in `node`, `None` for the sentinel or a vacant slot.
    #[inline]
    pub(crate) fn get(&self, node: NodeRef) -> Option<&T> {
        self.entry(node).and_then(Entry::value)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, node: NodeRef) -> Option<&mut T> {
        if node.is_sentinel() {
            None
        } else {
            self.entries.get_mut(node.slot()).and_then(Entry::value_mut)
        }
    }

    /// Returns the value stored in a node known to be live.
    ///
    /// # Panics
    ///
    /// Panics if `node` is the sentinel or a vacant slot.
    #[inline]
    #[track_caller]
    pub(crate) fn value(&self, node: NodeRef) -> &T {
        match self.get(node) {
            Some(value) => value,
            None => panic!("{node:?} does not hold a value"),
        }
    }

    /// Returns the priority of a live node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is the sentinel or a vacant slot.
    #[inline]
    #[track_caller]
    pub(crate) fn priority(&self, node: NodeRef) -> Priority {
        match self.entry(node) {
            Some(Entry::Occupied { priority, .. }) => *priority,
            _ => panic!("{node:?} does not hold a priority"),
        }
    }

    /// Returns `true` if `node` references a live element of this arena.
    #[inline]
    pub(crate) fn is_live(&self, node: NodeRef) -> bool {
        self.get(node).is_some()
    }

    /// Splits the arena into its topology and a raw view of the entries, for iterators that hand
    /// out mutable references to values while navigating the links.
    pub(crate) fn split_mut(&mut self) -> (&LinkTable, &mut [Entry<T>]) {
        (&self.links, &mut self.entries)
    }

    /// Entry-table index of `node`, for use with the slice returned by [`Self::split_mut`].
    #[inline]
    pub(crate) fn slot_index(node: NodeRef) -> usize {
        node.slot()
    }

    /// Moves the value out of `node` without touching any links or the free list.
    ///
    /// Used by consuming iteration, which walks the (now frozen) topology while emptying slots.
    pub(crate) fn vacate(&mut self, node: NodeRef) -> T {
        let vacant = Entry::Vacant { next_free: None };
        let Entry::Occupied { value, .. } = mem::replace(&mut self.entries[node.slot()], vacant)
        else {
            unreachable!("{node:?} was already vacated");
        };
        self.occupied -= 1;
        value
    }

    /// Number of slots on the free list, walking it.
    pub(crate) fn count_free(&self) -> usize {
        let mut count = 0;
        let mut next = self.free_head;
        while let Some(node) = next {
            match self.entries.get(node.slot()) {
                Some(Entry::Vacant { next_free }) => next = *next_free,
                _ => panic!("free list references a live slot {node:?}"),
            }
            count += 1;
            assert!(count <= self.entries.len(), "free list contains a cycle");
        }
        count
    }

    /// Total number of slots, live or vacant.
    #[inline]
    pub(crate) fn capacity_used(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slots_are_recycled() {
        let mut arena = Arena::new();
        arena.try_reserve(2).unwrap();

        let a = arena.alloc("a", 1);
        let b = arena.alloc("b", 2);
        assert_ne!(a, b);
        assert_eq!(arena.occupied(), 2);

        assert_eq!(arena.free(a), "a");
        assert_eq!(arena.count_free(), 1);
        assert!(!arena.is_live(a));

        // a free slot satisfies the reservation without growing
        arena.try_reserve(1).unwrap();
        let c = arena.alloc("c", 3);
        assert_eq!(c, a);
        assert_eq!(arena.value(c), &"c");
        assert_eq!(arena.priority(c), 3);
        assert_eq!(arena.capacity_used(), 2);
        assert_eq!(arena.count_free(), 0);
    }

    #[test]
    fn reservations_beyond_index_space_fail() {
        let mut arena = Arena::new();
        arena.try_reserve(2).unwrap();
        let a = arena.alloc('a', 1);
        arena.alloc('b', 2);
        arena.free(a);

        assert_eq!(arena.try_reserve(usize::MAX), Err(AllocError::TooManyNodes));
        assert_eq!(
            arena.try_reserve(u32::MAX as usize),
            Err(AllocError::TooManyNodes)
        );

        // nothing changed
        assert_eq!(arena.occupied(), 1);
        assert_eq!(arena.capacity_used(), 2);
        assert_eq!(arena.count_free(), 1);
        arena.try_reserve(1).unwrap();
        assert_eq!(arena.alloc('c', 3), a);
    }

    #[test]
    fn reserve_errors_map_to_out_of_memory() {
        let err = Vec::<u64>::new().try_reserve(usize::MAX).unwrap_err();
        assert_eq!(AllocError::from(err), AllocError::OutOfMemory);
    }

    #[test]
    fn sentinel_is_not_a_value() {
        let arena: Arena<u8> = Arena::new();
        assert!(arena.get(NodeRef::SENTINEL).is_none());
        assert_eq!(arena.links.root(), None);
        assert_eq!(arena.links.leftmost(), NodeRef::SENTINEL);
        assert_eq!(arena.links.rightmost(), NodeRef::SENTINEL);
    }

    #[test]
    fn clear_resets_everything() {
        let mut arena = Arena::new();
        arena.try_reserve(3).unwrap();
        let a = arena.alloc(1, 1);
        arena.alloc(2, 2);
        arena.free(a);
        arena.links.set_root(Some(a));

        arena.clear();
        assert_eq!(arena.occupied(), 0);
        assert_eq!(arena.capacity_used(), 0);
        assert_eq!(arena.count_free(), 0);
        assert_eq!(arena.links.root(), None);
    }
}

// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # A randomized ordered set.
//!
//! [`Treap`] is an ordered, duplicate-free set backed by a *treap*: a binary search tree ordered
//! by the elements that is at the same time a max-heap over random priorities drawn when each
//! element is inserted. The random priorities give the tree an expected logarithmic height without
//! any explicit balancing rules; insertions and removals restore both orders with rotations.
//!
//! Nodes live in a slot arena and are addressed by stable indices. An element never moves while
//! it is part of the tree, so a [`Position`] obtained from an insertion or lookup stays valid
//! until that very element is removed, no matter what else is inserted or removed in between.
//!
//! ```rust
//! use treap::Treap;
//!
//! let mut tree = Treap::from([5, 3, 8, 1, 4]);
//! assert!(tree.iter().copied().eq([1, 3, 4, 5, 8]));
//!
//! assert!(tree.remove(&3));
//! assert_eq!(tree.find(&3), tree.end());
//!
//! assert_eq!(tree.get(tree.lower_bound(&4)), Some(&4));
//! assert_eq!(tree.get(tree.upper_bound(&4)), Some(&5));
//! assert_eq!(tree.get(tree.lower_bound(&6)), Some(&8));
//! assert_eq!(tree.upper_bound(&8), tree.end());
//! ```
//!
//! ## when to use this
//!
//! - **want positions that survive mutation** - a [`Position`] is a plain copyable handle, not a
//!   borrow, and is only invalidated by removing the element it points to.
//! - **want hinted insertion** - inserting next to a known position is O(1) plus rebalancing.
//! - **want pluggable ordering** - the order is a [`Compare`] value (any closure works), not
//!   necessarily the element's [`Ord`] implementation.
//!
//! ## when not to use this
//!
//! - **need worst-case guarantees** - balance is probabilistic and only as good as the
//!   [`PrioritySource`]; a degenerate source degrades the tree to a linked list.
//! - **need duplicates** - this is a set, inserting an equal element is a no-op.
//! - **need concurrent mutation** - there is no internal synchronization.
//!
//! ## features
//!
//! | Feature | Default | Explanation                                                                  |
//! |:--------|:--------|:-----------------------------------------------------------------------------|
//! | `std`   | `true`  | Seeds [`DefaultPriority`] from the OS, enabling [`Treap::new`] and friends    |
//! | `dot`   | `false` | Enables the `Treap::dot` method, which renders the tree in [graphviz format] |
//!
//! [graphviz format]: https://graphviz.org/doc/info/lang.html

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod arena;
mod compare;
mod cursors;
#[cfg(feature = "dot")]
mod dot;
mod priority;
mod utils;

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::ops::{Bound, RangeBounds};
use core::{fmt, mem};

use crate::arena::{Arena, NodeRef};
use crate::utils::Side;

pub use compare::{Compare, Natural, Reverse};
pub use cursors::{Cursor, CursorMut, IntoIter, Iter, IterMut, Range};
#[cfg(feature = "dot")]
pub use dot::Dot;
pub use priority::{DefaultPriority, FromRng, Priority, PrioritySource};

/// Error returned by the fallible (`try_*`) operations when a node cannot be allocated.
///
/// The tree is left exactly as it was before the failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, onlyerror::Error)]
pub enum AllocError {
    /// The tree already holds as many nodes as its `u32` slot indices can address.
    #[error("treap node index space exhausted")]
    TooManyNodes,
    /// The allocator could not provide memory for more nodes.
    #[error("memory allocation failed")]
    OutOfMemory,
}

impl From<TryReserveError> for AllocError {
    fn from(_: TryReserveError) -> Self {
        AllocError::OutOfMemory
    }
}

#[cold]
#[track_caller]
fn alloc_failed(err: AllocError) -> ! {
    panic!("treap allocation failed: {err}")
}

/// A position in a [`Treap`]: one of its elements, or the past-the-end position.
///
/// Positions are plain copyable handles that don't borrow the tree. A position stays valid until
/// the element it refers to is removed; inserting or removing *other* elements never affects it.
/// Using a position after its element was removed, or with a different tree, is a logic error:
/// it is memory safe but may refer to an unrelated element or panic.
///
/// The past-the-end position is shared by all trees and compares equal to [`Treap::end`]. Moving
/// past the last element leads to it, and moving on from it wraps around to the first element.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position(NodeRef);

impl Position {
    /// The past-the-end position.
    pub const END: Self = Self(NodeRef::SENTINEL);

    /// Returns `true` if this is the past-the-end position.
    #[must_use]
    pub fn is_end(self) -> bool {
        self.0.is_sentinel()
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            f.write_str("Position(end)")
        } else {
            f.debug_tuple("Position").field(&self.0).finish()
        }
    }
}

/// Where a value belongs in the tree.
enum InsertPos {
    /// An equivalent element is already stored in this node.
    Occupied(NodeRef),
    /// The value becomes the `side`-child of `parent`, or the root if `parent` is the sentinel.
    Vacant { parent: NodeRef, side: Side },
}

impl InsertPos {
    const ROOT: Self = InsertPos::Vacant {
        parent: NodeRef::SENTINEL,
        side: Side::Left,
    };
}

/// An ordered set based on a randomized binary search tree (a *treap*).
///
/// Elements are ordered by the comparator `C` (by default their [`Ord`] implementation, see
/// [`Natural`]) and every node carries a priority drawn from `G` (by default [`DefaultPriority`]).
/// Expected cost of lookups, insertions and removals is O(log n).
///
/// Besides the usual set operations the tree exposes [`Position`]s, stable handles to elements
/// that can be dereferenced with [`Treap::get`], advanced with [`Treap::successor`] and
/// [`Treap::predecessor`], passed back as insertion hints and used to remove elements.
pub struct Treap<T, C = Natural, G = DefaultPriority> {
    arena: Arena<T>,
    len: usize,
    compare: C,
    generator: G,
}

impl<T, C, G> Default for Treap<T, C, G>
where
    C: Default,
    G: Default,
{
    fn default() -> Self {
        Self::with_parts(C::default(), G::default())
    }
}

#[cfg(feature = "std")]
impl<T> Treap<T> {
    /// Creates a new, empty tree ordered by [`Ord`] with OS-seeded priorities.
    ///
    /// This does not allocate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "std")]
impl<T, C> Treap<T, C> {
    /// Creates a new, empty tree ordered by `compare`.
    #[must_use]
    pub fn with_compare(compare: C) -> Self {
        Self::with_parts(compare, DefaultPriority::default())
    }
}

impl<T, G> Treap<T, Natural, G> {
    /// Creates a new, empty tree ordered by [`Ord`] drawing node priorities from `generator`.
    #[must_use]
    pub fn with_generator(generator: G) -> Self {
        Self::with_parts(Natural, generator)
    }
}

impl<T, C, G> Treap<T, C, G> {
    /// Creates a new, empty tree from an explicit comparator and priority source.
    #[must_use]
    pub const fn with_parts(compare: C, generator: G) -> Self {
        Self {
            arena: Arena::new(),
            len: 0,
            compare,
            generator,
        }
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.arena.links.root().is_none(), self.len == 0);
        self.len == 0
    }

    /// Returns the comparator ordering this tree.
    pub fn compare(&self) -> &C {
        &self.compare
    }

    /// Returns the smallest element, in O(1).
    pub fn first(&self) -> Option<&T> {
        self.arena.get(self.arena.links.leftmost())
    }

    /// Returns the largest element, in O(1).
    pub fn last(&self) -> Option<&T> {
        self.arena.get(self.arena.links.rightmost())
    }

    /// Returns the position of the smallest element, or [`Treap::end`] if the tree is empty.
    pub fn begin(&self) -> Position {
        Position(self.arena.links.leftmost())
    }

    /// Returns the past-the-end position.
    pub fn end(&self) -> Position {
        Position::END
    }

    /// Returns the element at `pos`, or `None` for the past-the-end position.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.arena.get(pos.0)
    }

    /// Returns a mutable reference to the element at `pos`, or `None` for the past-the-end
    /// position.
    ///
    /// It is a logic error to modify the element in a way that changes its ordering relative to
    /// the other elements.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.arena.get_mut(pos.0)
    }

    /// Returns the position following `pos` in order.
    ///
    /// The successor of the last element is [`Treap::end`], the successor of the end is the first
    /// element.
    ///
    /// # Panics
    ///
    /// May panic if `pos` doesn't belong to this tree.
    pub fn successor(&self, pos: Position) -> Position {
        Position(utils::next(&self.arena.links, pos.0))
    }

    /// Returns the position preceding `pos` in order.
    ///
    /// The predecessor of the first element is [`Treap::end`], the predecessor of the end is the
    /// last element.
    ///
    /// # Panics
    ///
    /// May panic if `pos` doesn't belong to this tree.
    pub fn predecessor(&self, pos: Position) -> Position {
        Position(utils::prev(&self.arena.links, pos.0))
    }

    /// Returns a read-only cursor pointing at `pos`.
    pub fn cursor(&self, pos: Position) -> Cursor<'_, T> {
        Cursor {
            current: pos.0,
            arena: &self.arena,
        }
    }

    /// Returns a cursor pointing at `pos` that can modify the tree.
    pub fn cursor_mut(&mut self, pos: Position) -> CursorMut<'_, T, C, G> {
        CursorMut {
            current: pos.0,
            tree: self,
        }
    }

    /// Gets an iterator over the elements of the tree, in order.
    ///
    /// The iterator is double-ended, iterate it in reverse with [`Iterator::rev`].
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.arena.links.leftmost(),
            tail: self.arena.links.rightmost(),
            remaining: self.len,
            arena: &self.arena,
        }
    }

    /// Gets a mutable iterator over the elements of the tree, in order.
    ///
    /// It is a logic error to modify elements in a way that changes their relative order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let head = self.arena.links.leftmost();
        let tail = self.arena.links.rightmost();
        let (links, entries) = self.arena.split_mut();
        IterMut::new(links, entries, head, tail, self.len)
    }

    /// Removes the element at `pos`, returning the position of its successor.
    ///
    /// Removing at [`Treap::end`] does nothing and returns the end.
    pub fn erase(&mut self, pos: Position) -> Position {
        self.remove_at(pos).map_or(Position::END, |(_, next)| next)
    }

    /// Removes the element at `pos`, returning it together with the position of its successor.
    ///
    /// Returns `None` for the past-the-end position.
    pub fn remove_at(&mut self, pos: Position) -> Option<(T, Position)> {
        if !self.arena.is_live(pos.0) {
            return None;
        }

        let next = utils::next(&self.arena.links, pos.0);
        let value = self.erase_node(pos.0);
        Some((value, Position(next)))
    }

    /// Removes every element from `first` up to, but not including, `last`, returning `last`.
    ///
    /// `last` must not come before `first`; if it does, everything from `first` to the end is
    /// removed.
    pub fn erase_range(&mut self, mut first: Position, last: Position) -> Position {
        while first != last && !first.is_end() {
            first = self.erase(first);
        }
        first
    }

    /// Removes and returns the smallest element.
    pub fn pop_first(&mut self) -> Option<T> {
        let first = self.arena.links.leftmost();
        (!first.is_sentinel()).then(|| self.erase_node(first))
    }

    /// Removes and returns the largest element.
    pub fn pop_last(&mut self) -> Option<T> {
        let last = self.arena.links.rightmost();
        (!last.is_sentinel()).then(|| self.erase_node(last))
    }

    /// Retains only the elements specified by the predicate, visiting them in order.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        let mut curr = self.arena.links.leftmost();
        while !curr.is_sentinel() {
            let next = utils::next(&self.arena.links, curr);
            if !f(self.arena.value(curr)) {
                drop(self.erase_node(curr));
            }
            curr = next;
        }
    }

    /// Removes all elements from the tree.
    pub fn clear(&mut self) {
        tracing::debug!(len = self.len, "clearing treap");
        self.arena.clear();
        self.len = 0;
    }

    /// Swaps the contents (including comparators and priority sources) of two trees in O(1).
    ///
    /// Positions keep referring to the same elements, which now live in the other tree.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    pub fn height(&self) -> usize {
        let Some(root) = self.arena.links.root() else {
            return 0;
        };

        let mut height = 0;
        let mut stack = Vec::new();
        stack.push((root, 1));
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            let links = self.arena.links.get(node);
            stack.extend(links.left.into_iter().map(|child| (child, depth + 1)));
            stack.extend(links.right.into_iter().map(|child| (child, depth + 1)));
        }
        height
    }

    /// Renders the tree in graphviz format.
    #[cfg(feature = "dot")]
    pub fn dot(&self) -> Dot<'_, T> {
        Dot { arena: &self.arena }
    }

    /// Links a freshly allocated node into the tree and restores the heap order.
    fn link_new(&mut self, node: NodeRef, parent: NodeRef, side: Side) {
        let links = &mut self.arena.links;
        links.get_mut(node).up = parent;

        if parent.is_sentinel() {
            // first element
            links.set_root(Some(node));
            links.set_leftmost(node);
            links.set_rightmost(node);
        } else {
            let prev = links.get_mut(parent).replace_child(side, Some(node));
            debug_assert!(prev.is_none(), "{parent:?} already has a {side} child");

            if side == Side::Left && parent == links.leftmost() {
                links.set_leftmost(node);
            } else if side == Side::Right && parent == links.rightmost() {
                links.set_rightmost(node);
            }
        }

        self.len += 1;
        self.rebalance_after_insert(node);
    }

    /// Rotates `node` up while it outranks its parent.
    fn rebalance_after_insert(&mut self, node: NodeRef) {
        let priority = self.arena.priority(node);
        let mut rotations = 0_usize;

        loop {
            let parent = self.arena.links.parent(node);
            if parent.is_sentinel() || self.arena.priority(parent) >= priority {
                break;
            }
            self.rotate_up(node);
            rotations += 1;
        }

        tracing::trace!(?node, priority, rotations, "rebalanced after insert");
    }

    /// Rotates `node` down to a leaf, unlinks it and frees its slot.
    ///
    /// At every step the child with the higher priority is promoted, so the heap order holds
    /// above and below the sinking node. On equal priorities the right child is promoted.
    fn erase_node(&mut self, node: NodeRef) -> T {
        let mut rotations = 0_usize;

        loop {
            let links = *self.arena.links.get(node);
            let child = match (links.left, links.right) {
                (Some(left), Some(right)) => {
                    if self.arena.priority(left) > self.arena.priority(right) {
                        left
                    } else {
                        right
                    }
                }
                (Some(child), None) | (None, Some(child)) => child,
                (None, None) => break,
            };
            self.rotate_up(child);
            rotations += 1;
        }

        let links = &mut self.arena.links;
        links.replace_in_parent(node, None);

        let was_leftmost = links.leftmost() == node;
        let was_rightmost = links.rightmost() == node;
        match links.root() {
            Some(root) => {
                if was_leftmost {
                    let lowest = utils::find_lowest(links, root);
                    links.set_leftmost(lowest);
                }
                if was_rightmost {
                    let highest = utils::find_highest(links, root);
                    links.set_rightmost(highest);
                }
            }
            None => {
                links.set_leftmost(NodeRef::SENTINEL);
                links.set_rightmost(NodeRef::SENTINEL);
            }
        }

        self.len -= 1;
        tracing::trace!(?node, rotations, "erased node");

        self.arena.free(node)
    }

    /// Exchanges `x` with its parent, preserving the in-order sequence.
    ///
    /// If `x` is a left child this is a right rotation, otherwise a left rotation. The cached
    /// extremes are unaffected since rotations never change the order.
    fn rotate_up(&mut self, x: NodeRef) {
        let links = &mut self.arena.links;
        let z = links.parent(x);
        debug_assert!(!z.is_sentinel(), "cannot rotate the root up");

        // z ends up on the side of x opposite to the one x hangs off z
        let side = links.side_of(x).opposite();
        let y = links.get(x).child(side);
        let p_z = links.parent(z);

        // Rotate X into place
        links.replace_in_parent(z, Some(x));
        links.get_mut(x).up = p_z;

        // make z the `side`-child of x
        links.get_mut(x).replace_child(side, Some(z));
        links.get_mut(z).up = x;

        // make y the `opposite side`-child of z
        links.get_mut(z).replace_child(side.opposite(), y);
        if let Some(y) = y {
            links.get_mut(y).up = z;
        }
    }
}

impl<T, C, G> Treap<T, C, G>
where
    C: Compare<T>,
{
    /// Returns `true` if the tree contains an element equivalent to `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.find_node(value).is_some()
    }

    /// Returns the position of the element equivalent to `value`, or [`Treap::end`].
    pub fn find(&self, value: &T) -> Position {
        Position(self.find_node(value).unwrap_or(NodeRef::SENTINEL))
    }

    /// Returns the position of the first element that is not less than `value`, or
    /// [`Treap::end`] if there is none.
    pub fn lower_bound(&self, value: &T) -> Position {
        Position(self.lower_bound_node(value))
    }

    /// Returns the position of the first element that is greater than `value`, or [`Treap::end`]
    /// if there is none.
    pub fn upper_bound(&self, value: &T) -> Position {
        Position(self.upper_bound_node(value))
    }

    /// Gets a double-ended iterator over the elements within `range`, in order.
    ///
    /// A range whose start lies after its end yields nothing.
    pub fn range<R>(&self, range: R) -> Range<'_, T>
    where
        R: RangeBounds<T>,
    {
        let front = match range.start_bound() {
            Bound::Included(start) => self.lower_bound_node(start),
            Bound::Excluded(start) => self.upper_bound_node(start),
            Bound::Unbounded => self.arena.links.leftmost(),
        };
        let back = match range.end_bound() {
            Bound::Included(end) => self.upper_bound_node(end),
            Bound::Excluded(end) => self.lower_bound_node(end),
            Bound::Unbounded => NodeRef::SENTINEL,
        };

        let inverted = front.is_sentinel()
            || (!back.is_sentinel()
                && self
                    .compare
                    .less(self.arena.value(back), self.arena.value(front)));

        if inverted {
            Range::empty(&self.arena)
        } else {
            Range::new(&self.arena, front, back)
        }
    }

    /// Removes the element equivalent to `value`, returning whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the element equivalent to `value`, if any.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let node = self.find_node(value)?;
        Some(self.erase_node(node))
    }

    /// Asserts as many of the tree's invariants as possible.
    ///
    /// This walks the entire tree and checks the search order, the heap order of priorities,
    /// parent links, the cached first/last elements, the element count and the slot free list.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violated invariant.
    #[track_caller]
    pub fn assert_valid(&self) {
        let links = &self.arena.links;

        assert_eq!(
            self.arena.occupied(),
            self.len,
            "occupied slots don't match the element count"
        );
        assert_eq!(
            self.arena.count_free() + self.arena.occupied(),
            self.arena.capacity_used(),
            "vacant slots missing from the free list"
        );

        let Some(root) = links.root() else {
            assert_eq!(self.len, 0, "tree without root must be empty");
            assert_eq!(links.leftmost(), NodeRef::SENTINEL, "empty tree must begin at end");
            assert_eq!(links.rightmost(), NodeRef::SENTINEL, "empty tree must end at end");
            return;
        };

        assert_eq!(
            links.parent(root),
            NodeRef::SENTINEL,
            "root must hang off the sentinel"
        );

        // structure and heap order
        let mut visited = 0;
        let mut stack = Vec::new();
        stack.push(root);
        while let Some(node) = stack.pop() {
            visited += 1;
            assert!(
                visited <= self.len,
                "more nodes reachable than elements, the links contain a cycle"
            );

            let node_links = links.get(node);
            let priority = self.arena.priority(node);
            for child in [node_links.left, node_links.right].into_iter().flatten() {
                assert_ne!(child, node, "{node:?} is its own child");
                assert_eq!(
                    links.parent(child),
                    node,
                    "{child:?} doesn't link back to its parent {node:?}"
                );
                assert!(
                    self.arena.priority(child) <= priority,
                    "heap order violation: {child:?} outranks its parent {node:?}"
                );
                stack.push(child);
            }
        }
        assert_eq!(visited, self.len, "element count doesn't match the tree");

        // search order, the in-order walk must be strictly increasing
        let mut count = 1;
        let mut prev = links.leftmost();
        let mut curr = utils::next(links, prev);
        while !curr.is_sentinel() {
            assert!(
                self.compare
                    .less(self.arena.value(prev), self.arena.value(curr)),
                "ordering violation: {curr:?} is not greater than its predecessor {prev:?}"
            );
            count += 1;
            assert!(count <= self.len, "in-order walk does not terminate");
            prev = curr;
            curr = utils::next(links, curr);
        }
        assert_eq!(count, self.len, "in-order walk skipped elements");

        assert_eq!(
            links.leftmost(),
            utils::find_lowest(links, root),
            "cached first element is stale"
        );
        assert_eq!(
            links.rightmost(),
            utils::find_highest(links, root),
            "cached last element is stale"
        );
    }

    fn find_node(&self, value: &T) -> Option<NodeRef> {
        let node = self.lower_bound_node(value);
        (!node.is_sentinel() && !self.compare.less(value, self.arena.value(node))).then_some(node)
    }

    fn lower_bound_node(&self, value: &T) -> NodeRef {
        let links = &self.arena.links;
        let mut bound = NodeRef::SENTINEL;
        let mut tree = links.root();
        while let Some(curr) = tree {
            if self.compare.less(self.arena.value(curr), value) {
                tree = links.right(curr);
            } else {
                bound = curr;
                tree = links.left(curr);
            }
        }
        bound
    }

    fn upper_bound_node(&self, value: &T) -> NodeRef {
        let links = &self.arena.links;
        let mut bound = NodeRef::SENTINEL;
        let mut tree = links.root();
        while let Some(curr) = tree {
            if self.compare.less(value, self.arena.value(curr)) {
                bound = curr;
                tree = links.left(curr);
            } else {
                tree = links.right(curr);
            }
        }
        bound
    }

    fn find_insert_pos(&self, value: &T) -> InsertPos {
        let links = &self.arena.links;
        let Some(mut curr) = links.root() else {
            return InsertPos::ROOT;
        };

        loop {
            let curr_value = self.arena.value(curr);
            let side = if self.compare.less(value, curr_value) {
                Side::Left
            } else if self.compare.less(curr_value, value) {
                Side::Right
            } else {
                return InsertPos::Occupied(curr);
            };

            match links.get(curr).child(side) {
                Some(child) => curr = child,
                None => return InsertPos::Vacant { parent: curr, side },
            }
        }
    }

    /// Like [`Self::find_insert_pos`] but first checks whether `value` belongs right next to
    /// `hint`, which takes O(1) comparisons.
    fn find_insert_pos_hint(&self, hint: NodeRef, value: &T) -> InsertPos {
        let links = &self.arena.links;
        if links.root().is_none() {
            return InsertPos::ROOT;
        }

        if hint.is_sentinel() {
            // hinting at the end means "append"
            let last = links.rightmost();
            if self.compare.less(self.arena.value(last), value) {
                return InsertPos::Vacant {
                    parent: last,
                    side: Side::Right,
                };
            }
            return self.find_insert_pos(value);
        }

        let Some(hint_value) = self.arena.get(hint) else {
            // stale hint, don't bother
            return self.find_insert_pos(value);
        };

        if self.compare.less(value, hint_value) {
            if hint == links.leftmost() {
                return InsertPos::Vacant {
                    parent: hint,
                    side: Side::Left,
                };
            }

            // value goes between `before` and `hint`, one of them has a free slot on that side
            let before = utils::prev(links, hint);
            if self.compare.less(self.arena.value(before), value) {
                return if links.right(before).is_none() {
                    InsertPos::Vacant {
                        parent: before,
                        side: Side::Right,
                    }
                } else {
                    InsertPos::Vacant {
                        parent: hint,
                        side: Side::Left,
                    }
                };
            }
        } else if self.compare.less(hint_value, value) {
            if hint == links.rightmost() {
                return InsertPos::Vacant {
                    parent: hint,
                    side: Side::Right,
                };
            }

            // value goes between `hint` and `after`
            let after = utils::next(links, hint);
            if self.compare.less(value, self.arena.value(after)) {
                return if links.right(hint).is_none() {
                    InsertPos::Vacant {
                        parent: hint,
                        side: Side::Right,
                    }
                } else {
                    InsertPos::Vacant {
                        parent: after,
                        side: Side::Left,
                    }
                };
            }
        } else {
            return InsertPos::Occupied(hint);
        }

        self.find_insert_pos(value)
    }
}

impl<T, C, G> Treap<T, C, G>
where
    C: Compare<T>,
    G: PrioritySource,
{
    /// Inserts `value` into the tree.
    ///
    /// Returns the position of the inserted element and `true`, or the position of the
    /// equivalent element already present and `false`, in which case `value` is dropped and the
    /// tree is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if a new node cannot be allocated, see [`Treap::try_insert`].
    pub fn insert(&mut self, value: T) -> (Position, bool) {
        self.try_insert(value).unwrap_or_else(|err| alloc_failed(err))
    }

    /// Inserts `value` into the tree, reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if a new node is needed but cannot be allocated. The tree is left
    /// untouched.
    pub fn try_insert(&mut self, value: T) -> Result<(Position, bool), AllocError> {
        match self.find_insert_pos(&value) {
            InsertPos::Occupied(node) => Ok((Position(node), false)),
            InsertPos::Vacant { parent, side } => {
                let node = self.alloc_node(value)?;
                self.link_new(node, parent, side);
                Ok((Position(node), true))
            }
        }
    }

    /// Inserts `value` using `hint` as a suggestion for where it belongs, returning the position
    /// of the inserted (or already present, equivalent) element.
    ///
    /// If `value` belongs immediately before or after `hint` this takes O(1) comparisons plus
    /// rebalancing, otherwise it falls back to a regular insertion. Any hint, including
    /// [`Treap::end`], produces a correct tree.
    ///
    /// # Panics
    ///
    /// Panics if a new node cannot be allocated, see [`Treap::try_insert_hint`].
    pub fn insert_hint(&mut self, hint: Position, value: T) -> Position {
        self.try_insert_hint(hint, value)
            .unwrap_or_else(|err| alloc_failed(err))
    }

    /// Hinted insertion reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if a new node is needed but cannot be allocated. The tree is left
    /// untouched.
    pub fn try_insert_hint(&mut self, hint: Position, value: T) -> Result<Position, AllocError> {
        self.insert_hint_inner(hint.0, value).map(|(pos, _)| pos)
    }

    /// Builds a value with `make` and inserts it.
    ///
    /// The node is allocated and the value constructed *before* looking for an equivalent
    /// element; if one exists the fresh node is discarded again and the existing position
    /// returned with `false`.
    ///
    /// # Panics
    ///
    /// Panics if a new node cannot be allocated, see [`Treap::try_emplace_with`].
    pub fn emplace_with<F>(&mut self, make: F) -> (Position, bool)
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_with(make)
            .unwrap_or_else(|err| alloc_failed(err))
    }

    /// Like [`Treap::emplace_with`], reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if the node cannot be allocated. The tree is left untouched.
    pub fn try_emplace_with<F>(&mut self, make: F) -> Result<(Position, bool), AllocError>
    where
        F: FnOnce() -> T,
    {
        let node = self.alloc_node(make())?;
        let pos = self.find_insert_pos(self.arena.value(node));
        Ok(self.place(node, pos))
    }

    /// Builds a value with `make` and inserts it using `hint`, see [`Treap::insert_hint`] and
    /// [`Treap::emplace_with`].
    ///
    /// # Panics
    ///
    /// Panics if a new node cannot be allocated, see [`Treap::try_emplace_hint_with`].
    pub fn emplace_hint_with<F>(&mut self, hint: Position, make: F) -> Position
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_hint_with(hint, make)
            .unwrap_or_else(|err| alloc_failed(err))
    }

    /// Like [`Treap::emplace_hint_with`], reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if the node cannot be allocated. The tree is left untouched.
    pub fn try_emplace_hint_with<F>(
        &mut self,
        hint: Position,
        make: F,
    ) -> Result<Position, AllocError>
    where
        F: FnOnce() -> T,
    {
        let node = self.alloc_node(make())?;
        let pos = self.find_insert_pos_hint(hint.0, self.arena.value(node));
        Ok(self.place(node, pos).0)
    }

    pub(crate) fn insert_hint_inner(
        &mut self,
        hint: NodeRef,
        value: T,
    ) -> Result<(Position, bool), AllocError> {
        match self.find_insert_pos_hint(hint, &value) {
            InsertPos::Occupied(node) => Ok((Position(node), false)),
            InsertPos::Vacant { parent, side } => {
                let node = self.alloc_node(value)?;
                self.link_new(node, parent, side);
                Ok((Position(node), true))
            }
        }
    }

    /// Links an already allocated node at `pos`, or discards it if `pos` is occupied.
    fn place(&mut self, node: NodeRef, pos: InsertPos) -> (Position, bool) {
        match pos {
            InsertPos::Occupied(existing) => {
                drop(self.arena.free(node));
                (Position(existing), false)
            }
            InsertPos::Vacant { parent, side } => {
                self.link_new(node, parent, side);
                (Position(node), true)
            }
        }
    }

    /// Allocates a detached node for `value` with a freshly drawn priority.
    fn alloc_node(&mut self, value: T) -> Result<NodeRef, AllocError> {
        self.arena
            .try_reserve(1)
            .inspect_err(|err| tracing::debug!(%err, len = self.len, "node allocation failed"))?;
        let priority = self.generator.next_priority();
        Ok(self.arena.alloc(value, priority))
    }
}

impl<T, C, G> Treap<T, C, G>
where
    T: Clone,
    C: Clone,
    G: Clone,
{
    /// Creates a deep copy of the tree, reporting allocation failure instead of panicking.
    ///
    /// The copy has exactly the same shape and priorities as `self`; no priorities are redrawn.
    /// Its priority source is a clone of `self`'s.
    ///
    /// If allocation fails or cloning an element panics, everything copied so far is dropped and
    /// `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if the nodes of the copy cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let mut arena = Arena::new();

        if let Some(root) = self.arena.links.root() {
            arena.try_reserve(self.len)?;

            // (source node, parent in the copy, side of that parent)
            let mut pending = Vec::new();
            pending.try_reserve(self.len)?;
            pending.push((root, NodeRef::SENTINEL, Side::Left));

            while let Some((src, parent, side)) = pending.pop() {
                let node = arena.alloc(
                    self.arena.value(src).clone(),
                    self.arena.priority(src),
                );

                arena.links.get_mut(node).up = parent;
                if parent.is_sentinel() {
                    arena.links.set_root(Some(node));
                } else {
                    arena.links.get_mut(parent).replace_child(side, Some(node));
                }

                let src_links = self.arena.links.get(src);
                if let Some(right) = src_links.right {
                    pending.push((right, node, Side::Right));
                }
                if let Some(left) = src_links.left {
                    pending.push((left, node, Side::Left));
                }
            }

            if let Some(new_root) = arena.links.root() {
                let lowest = utils::find_lowest(&arena.links, new_root);
                let highest = utils::find_highest(&arena.links, new_root);
                arena.links.set_leftmost(lowest);
                arena.links.set_rightmost(highest);
            }
        }

        tracing::debug!(len = self.len, "cloned treap");

        Ok(Self {
            arena,
            len: self.len,
            compare: self.compare.clone(),
            generator: self.generator.clone(),
        })
    }
}

impl<T, C, G> Clone for Treap<T, C, G>
where
    T: Clone,
    C: Clone,
    G: Clone,
{
    /// # Panics
    ///
    /// Panics if the copy cannot be allocated, see [`Treap::try_clone`].
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| alloc_failed(err))
    }
}

impl<T, C, G> fmt::Debug for Treap<T, C, G>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, C, G, C2, G2> PartialEq<Treap<T, C2, G2>> for Treap<T, C, G>
where
    T: PartialEq,
{
    /// Trees are equal when they hold equal elements in the same order. Their shapes and
    /// priorities are irrelevant.
    fn eq(&self, other: &Treap<T, C2, G2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, C, G> Eq for Treap<T, C, G> {}

impl<T, C, G> Extend<T> for Treap<T, C, G>
where
    C: Compare<T>,
    G: PrioritySource,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, C, G> Extend<&'a T> for Treap<T, C, G>
where
    T: Copy + 'a,
    C: Compare<T>,
    G: PrioritySource,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, C, G> FromIterator<T> for Treap<T, C, G>
where
    C: Compare<T> + Default,
    G: PrioritySource + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

#[cfg(feature = "std")]
impl<T: Ord, const N: usize> From<[T; N]> for Treap<T> {
    fn from(values: [T; N]) -> Self {
        Self::from_iter(values)
    }
}

impl<T, C, G> IntoIterator for Treap<T, C, G> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let Self { arena, len, .. } = self;
        IntoIter {
            head: arena.links.leftmost(),
            tail: arena.links.rightmost(),
            remaining: len,
            arena,
        }
    }
}

impl<'a, T, C, G> IntoIterator for &'a Treap<T, C, G> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, C, G> IntoIterator for &'a mut Treap<T, C, G> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::arena::{Arena, Entry, LinkTable, NodeRef};
use crate::{AllocError, Compare, Position, PrioritySource, Treap, alloc_failed, utils};

/// A cursor which provides read-only access to a [`Treap`].
///
/// Moving past either end lands on the past-the-end position, moving on from there wraps around
/// to the other end.
pub struct Cursor<'a, T> {
    pub(crate) current: NodeRef,
    pub(crate) arena: &'a Arena<T>,
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current,
            arena: self.arena,
        }
    }
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

impl<'a, T> Cursor<'a, T> {
    /// Returns the position the cursor points at.
    pub fn position(&self) -> Position {
        Position(self.current)
    }
    /// Returns the current element, or `None` at the past-the-end position.
    pub fn get(&self) -> Option<&'a T> {
        self.arena.get(self.current)
    }
    pub fn move_next(&mut self) {
        self.current = utils::next(&self.arena.links, self.current);
    }
    pub fn move_prev(&mut self) {
        self.current = utils::prev(&self.arena.links, self.current);
    }
    pub fn peek_next(&self) -> Option<&'a T> {
        self.arena
            .get(utils::next(&self.arena.links, self.current))
    }
    pub fn peek_prev(&self) -> Option<&'a T> {
        self.arena
            .get(utils::prev(&self.arena.links, self.current))
    }
}

/// A cursor which provides mutable access to a [`Treap`].
pub struct CursorMut<'a, T, C, G> {
    pub(crate) current: NodeRef,
    pub(crate) tree: &'a mut Treap<T, C, G>,
}

impl<T, C, G> fmt::Debug for CursorMut<'_, T, C, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

impl<T, C, G> CursorMut<'_, T, C, G> {
    /// Returns the position the cursor points at.
    pub fn position(&self) -> Position {
        Position(self.current)
    }
    pub fn get(&self) -> Option<&T> {
        self.tree.arena.get(self.current)
    }
    /// Returns the current element mutably.
    ///
    /// It is a logic error to modify the element in a way that changes its ordering relative to
    /// the other elements.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.tree.arena.get_mut(self.current)
    }
    pub fn move_next(&mut self) {
        self.current = utils::next(&self.tree.arena.links, self.current);
    }
    pub fn move_prev(&mut self) {
        self.current = utils::prev(&self.tree.arena.links, self.current);
    }
    pub fn peek_next(&self) -> Option<&T> {
        let arena = &self.tree.arena;
        arena.get(utils::next(&arena.links, self.current))
    }
    pub fn peek_prev(&self) -> Option<&T> {
        let arena = &self.tree.arena;
        arena.get(utils::prev(&arena.links, self.current))
    }
    /// Removes the current element and moves the cursor to its successor.
    ///
    /// Returns `None` (and doesn't move) at the past-the-end position.
    pub fn remove_current(&mut self) -> Option<T> {
        let (value, next) = self.tree.remove_at(Position(self.current))?;
        self.current = next.0;
        Some(value)
    }
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            current: self.current,
            arena: &self.tree.arena,
        }
    }
}

impl<T, C, G> CursorMut<'_, T, C, G>
where
    C: Compare<T>,
    G: PrioritySource,
{
    /// Inserts `value` using the current position as a hint, returning whether it was inserted.
    ///
    /// The cursor keeps pointing at the same element.
    ///
    /// # Panics
    ///
    /// Panics if a new node cannot be allocated, see [`CursorMut::try_insert`].
    pub fn insert(&mut self, value: T) -> bool {
        self.try_insert(value)
            .unwrap_or_else(|err| alloc_failed(err))
    }

    /// Hinted insertion at the cursor, reporting allocation failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocError`] if a new node is needed but cannot be allocated.
    pub fn try_insert(&mut self, value: T) -> Result<bool, AllocError> {
        self.tree
            .insert_hint_inner(self.current, value)
            .map(|(_, inserted)| inserted)
    }
}

/// An iterator over references to the elements of a [`Treap`], in order.
pub struct Iter<'a, T> {
    pub(crate) head: NodeRef,
    pub(crate) tail: NodeRef,
    pub(crate) remaining: usize,
    pub(crate) arena: &'a Arena<T>,
}

impl<T> Clone for Iter<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            head: self.head,
            tail: self.tail,
            remaining: self.remaining,
            arena: self.arena,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let head = self.head;
        self.head = utils::next(&self.arena.links, head);
        Some(self.arena.value(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let tail = self.tail;
        self.tail = utils::prev(&self.arena.links, tail);
        Some(self.arena.value(tail))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// An iterator over mutable references to the elements of a [`Treap`], in order.
pub struct IterMut<'a, T> {
    head: NodeRef,
    tail: NodeRef,
    remaining: usize,
    links: &'a LinkTable,
    entries: NonNull<Entry<T>>,
    slots: usize,
    _marker: PhantomData<&'a mut [Entry<T>]>,
}

// Safety: IterMut behaves like a `&mut [T]`, it hands out unique references to distinct elements
unsafe impl<T: Send> Send for IterMut<'_, T> {}
// Safety: see above, shared access to the iterator gives no access to the elements
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(
        links: &'a LinkTable,
        entries: &'a mut [Entry<T>],
        head: NodeRef,
        tail: NodeRef,
        remaining: usize,
    ) -> Self {
        Self {
            head,
            tail,
            remaining,
            links,
            slots: entries.len(),
            entries: NonNull::from(entries).cast(),
            _marker: PhantomData,
        }
    }

    fn value_at(&mut self, node: NodeRef) -> &'a mut T {
        let slot = Arena::<T>::slot_index(node);
        assert!(slot < self.slots, "{node:?} is out of bounds");

        // Safety: `slot` is in bounds of the entry slice we exclusively borrow for 'a. The
        // `remaining` count stops both ends before they cross, so every in-order node (and
        // therefore every slot) is handed out at most once.
        let entry = unsafe { &mut *self.entries.as_ptr().add(slot) };
        match entry.value_mut() {
            Some(value) => value,
            None => unreachable!("iterated into vacant {node:?}"),
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let head = self.head;
        self.head = utils::next(self.links, head);
        Some(self.value_at(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let tail = self.tail;
        self.tail = utils::prev(self.links, tail);
        Some(self.value_at(tail))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

/// An owning iterator over the elements of a [`Treap`], in order.
pub struct IntoIter<T> {
    pub(crate) head: NodeRef,
    pub(crate) tail: NodeRef,
    pub(crate) remaining: usize,
    pub(crate) arena: Arena<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // the links stay intact while values are moved out, so navigation keeps working
        let head = self.head;
        self.head = utils::next(&self.arena.links, head);
        Some(self.arena.vacate(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let tail = self.tail;
        self.tail = utils::prev(&self.arena.links, tail);
        Some(self.arena.vacate(tail))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

/// An iterator over a sub-range of the elements of a [`Treap`], see [`Treap::range`].
pub struct Range<'a, T> {
    /// First element still to be yielded.
    front: NodeRef,
    /// One past the last element still to be yielded.
    back: NodeRef,
    arena: &'a Arena<T>,
}

impl<'a, T> Range<'a, T> {
    pub(crate) fn new(arena: &'a Arena<T>, front: NodeRef, back: NodeRef) -> Self {
        Self { front, back, arena }
    }

    pub(crate) fn empty(arena: &'a Arena<T>) -> Self {
        Self::new(arena, NodeRef::SENTINEL, NodeRef::SENTINEL)
    }
}

impl<T> Clone for Range<'_, T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            arena: self.arena,
        }
    }
}

impl<'a, T> Iterator for Range<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let front = self.front;
        self.front = utils::next(&self.arena.links, front);
        Some(self.arena.value(front))
    }
}

impl<T> DoubleEndedIterator for Range<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        self.back = utils::prev(&self.arena.links, self.back);
        Some(self.arena.value(self.back))
    }
}

impl<T> FusedIterator for Range<'_, T> {}

// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::arena::{LinkTable, NodeRef};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub(crate) fn find_lowest(links: &LinkTable, mut curr: NodeRef) -> NodeRef {
    while let Some(left) = links.left(curr) {
        curr = left;
    }

    curr
}

pub(crate) fn find_highest(links: &LinkTable, mut curr: NodeRef) -> NodeRef {
    while let Some(right) = links.right(curr) {
        curr = right;
    }

    curr
}

/// Returns the in-order successor of `node`.
///
/// The successor of the last node is the sentinel, and the successor of the sentinel is the first
/// node (or the sentinel again if the tree is empty).
pub(crate) fn next(links: &LinkTable, node: NodeRef) -> NodeRef {
    if node.is_sentinel() {
        return links.leftmost();
    }

    // If we have a right child, its least descendant is our next node
    if let Some(right) = links.right(node) {
        return find_lowest(links, right);
    }

    let mut curr = node;
    loop {
        let parent = links.parent(curr);

        // we climbed out of the root without finding a greater ancestor
        if parent.is_sentinel() {
            return NodeRef::SENTINEL;
        }

        // the first ancestor we reach from its left/lesser side is our next node
        if links.right(parent) != Some(curr) {
            return parent;
        }

        curr = parent;
    }
}

/// Returns the in-order predecessor of `node`, the mirror image of [`next`].
pub(crate) fn prev(links: &LinkTable, node: NodeRef) -> NodeRef {
    if node.is_sentinel() {
        return links.rightmost();
    }

    // If we have a left child, its greatest descendant is our previous node
    if let Some(left) = links.left(node) {
        return find_highest(links, left);
    }

    let mut curr = node;
    loop {
        let parent = links.parent(curr);

        if parent.is_sentinel() {
            return NodeRef::SENTINEL;
        }

        if links.left(parent) != Some(curr) {
            return parent;
        }

        curr = parent;
    }
}

// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use alloc::vec::Vec;
use core::fmt;

use crate::arena::{Arena, NodeRef};
use crate::utils::Side;

/// Graphviz rendering of a [`Treap`](crate::Treap), see [`Treap::dot`](crate::Treap::dot).
///
/// Every node is labelled with its value and priority.
pub struct Dot<'a, T> {
    pub(crate) arena: &'a Arena<T>,
}

impl<T> Dot<'_, T>
where
    T: fmt::Debug,
{
    /// Writes every node below `root` in pre-order, walking an explicit stack since degenerate
    /// priority sources produce trees as deep as they are long.
    fn nodes_fmt(&self, f: &mut fmt::Formatter, root: NodeRef) -> fmt::Result {
        let mut stack = Vec::new();
        stack.push(root);

        while let Some(node) = stack.pop() {
            let id = node.index();
            let links = self.arena.links.get(node);

            writeln!(
                f,
                r#"    {id} [label="{value:?} ({priority})"];"#,
                value = self.arena.value(node),
                priority = self.arena.priority(node),
            )?;

            for side in [Side::Left, Side::Right] {
                if let Some(child) = links.child(side) {
                    writeln!(f, r#"    {id} -> {} [label="{side}"];"#, child.index())?;
                }
            }

            // left subtree first
            stack.extend(links.right);
            stack.extend(links.left);
        }

        Ok(())
    }
}

impl<T> fmt::Display for Dot<'_, T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        if let Some(root) = self.arena.links.root() {
            self.nodes_fmt(f, root)?;
        }
        f.write_str("}")
    }
}

impl<T> fmt::Debug for Dot<'_, T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

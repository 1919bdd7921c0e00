// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// The heap key of a treap node.
pub type Priority = u32;

/// A source of node priorities for a [`Treap`].
///
/// Every inserted node draws exactly one priority. The expected height of the tree, and therefore
/// the cost of every operation, depends on these draws being independent and uniformly
/// distributed: a degenerate source (e.g. a counter) turns the tree into a linked list. That is an
/// accepted trade-off, not an error.
///
/// Any closure `FnMut() -> Priority` is a priority source, which is handy for deterministic
/// tests:
///
/// ```rust
/// use treap::{Natural, Treap};
///
/// let mut next: treap::Priority = 0;
/// let mut tree = Treap::with_parts(Natural, move || {
///     next += 1;
///     next
/// });
/// tree.extend(0..8);
/// // every new node outranks all older ones and climbs to the root
/// assert_eq!(tree.height(), 8);
/// ```
///
/// [`Treap`]: crate::Treap
pub trait PrioritySource {
    /// Draws the priority for a new node.
    fn next_priority(&mut self) -> Priority;
}

impl<F> PrioritySource for F
where
    F: FnMut() -> Priority,
{
    #[inline]
    fn next_priority(&mut self) -> Priority {
        self()
    }
}

/// The default priority source: a small, fast, non-cryptographic PRNG.
///
/// With the `std` feature enabled [`Default`] seeds it from the thread-local OS-seeded generator,
/// so every tree draws an independent sequence. Without `std` use [`DefaultPriority::from_seed`].
#[derive(Debug, Clone)]
pub struct DefaultPriority {
    rng: SmallRng,
}

impl DefaultPriority {
    /// Creates a reproducible priority source from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

#[cfg(feature = "std")]
impl Default for DefaultPriority {
    fn default() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }
}

impl PrioritySource for DefaultPriority {
    #[inline]
    fn next_priority(&mut self) -> Priority {
        self.rng.next_u32()
    }
}

/// Adapts any [`RngCore`] into a [`PrioritySource`] spanning the full [`Priority`] domain.
#[derive(Debug, Default, Clone)]
pub struct FromRng<R>(pub R);

impl<R: RngCore> PrioritySource for FromRng<R> {
    #[inline]
    fn next_priority(&mut self) -> Priority {
        self.0.next_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut a = DefaultPriority::from_seed(42);
        let mut b = DefaultPriority::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.next_priority(), b.next_priority());
        }
    }

    #[test]
    fn closures_are_sources() {
        let mut n: Priority = 10;
        let mut source = || {
            n -= 1;
            n
        };
        assert_eq!(source.next_priority(), 9);
        assert_eq!(source.next_priority(), 8);
    }

    #[test]
    fn rng_adapter() {
        let mut a = FromRng(SmallRng::seed_from_u64(7));
        let mut b = SmallRng::seed_from_u64(7);
        assert_eq!(a.next_priority(), b.next_u32());
    }
}

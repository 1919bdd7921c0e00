// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

/// A strict weak order over `T`, used to position and iterate elements of a [`Treap`].
///
/// Implementations must be irreflexive (`!less(a, a)`), asymmetric (`less(a, b)` implies
/// `!less(b, a)`) and transitive. Two elements are considered *equal* when neither is less than
/// the other; a [`Treap`] holds at most one element of every such equivalence class.
///
/// Violating these rules is a logic error. It will not cause memory unsafety, but the tree may
/// return unspecified results, including failing to find elements that were inserted.
///
/// Any closure `Fn(&T, &T) -> bool` is a comparator:
///
/// ```rust
/// use treap::Treap;
///
/// let mut tree = Treap::with_compare(|a: &i32, b: &i32| a > b);
/// tree.extend([1, 3, 2]);
/// assert!(tree.iter().copied().eq([3, 2, 1]));
/// ```
///
/// [`Treap`]: crate::Treap
pub trait Compare<T: ?Sized> {
    /// Returns `true` if `lhs` is ordered strictly before `rhs`.
    fn less(&self, lhs: &T, rhs: &T) -> bool;
}

/// The comparator used by default, ordering elements by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Natural;

impl<T: Ord + ?Sized> Compare<T> for Natural {
    #[inline]
    fn less(&self, lhs: &T, rhs: &T) -> bool {
        lhs < rhs
    }
}

impl<T, F> Compare<T> for F
where
    T: ?Sized,
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, lhs: &T, rhs: &T) -> bool {
        self(lhs, rhs)
    }
}

/// Reverses the order of another comparator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reverse<C>(pub C);

impl<T: ?Sized, C: Compare<T>> Compare<T> for Reverse<C> {
    #[inline]
    fn less(&self, lhs: &T, rhs: &T) -> bool {
        self.0.less(rhs, lhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_is_strict() {
        assert!(Natural.less(&1, &2));
        assert!(!Natural.less(&2, &2));
        assert!(!Natural.less(&3, &2));
        assert!(Natural.less("abc", "abd"));
    }

    #[test]
    fn reverse_flips() {
        let cmp = Reverse(Natural);
        assert!(cmp.less(&2, &1));
        assert!(!cmp.less(&1, &1));
    }

    #[test]
    fn closures_compare() {
        let by_len = |a: &&str, b: &&str| a.len() < b.len();
        assert!(by_len.less(&"a", &"bb"));
        // equal lengths are equivalent
        assert!(!by_len.less(&"aa", &"bb") && !by_len.less(&"bb", &"aa"));
    }
}

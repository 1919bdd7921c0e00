mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use treap::{DefaultPriority, Natural, Treap};

#[derive(Debug, Clone)]
enum Op {
    Insert(u16),
    InsertHint(u16, usize),
    Remove(u16),
    EraseNth(usize),
    PopFirst,
    PopLast,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u16>().prop_map(|v| Op::Insert(v % 512)),
        2 => (any::<u16>(), any::<usize>()).prop_map(|(v, n)| Op::InsertHint(v % 512, n)),
        3 => any::<u16>().prop_map(|v| Op::Remove(v % 512)),
        1 => any::<usize>().prop_map(Op::EraseNth),
        1 => Just(Op::PopFirst),
        1 => Just(Op::PopLast),
    ]
}

/// Position of the `n`th element (modulo length), or the end.
fn nth<T, C, G>(tree: &Treap<T, C, G>, n: usize) -> treap::Position {
    if tree.is_empty() {
        return tree.end();
    }
    let mut pos = tree.begin();
    for _ in 0..n % (tree.len() + 1) {
        pos = tree.successor(pos);
    }
    pos
}

proptest! {
    #[test]
    fn behaves_like_btreeset(seed in any::<u64>(), ops in proptest::collection::vec(op(), 0..200)) {
        common::init_tracing();

        let mut tree = Treap::with_parts(Natural, DefaultPriority::from_seed(seed));
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    prop_assert_eq!(tree.insert(v).1, model.insert(v));
                }
                Op::InsertHint(v, n) => {
                    let hint = nth(&tree, n);
                    let pos = tree.insert_hint(hint, v);
                    model.insert(v);
                    prop_assert_eq!(tree.get(pos), Some(&v));
                }
                Op::Remove(v) => {
                    prop_assert_eq!(tree.remove(&v), model.remove(&v));
                }
                Op::EraseNth(n) => {
                    let pos = nth(&tree, n);
                    if let Some(&v) = tree.get(pos) {
                        let next = tree.erase(pos);
                        model.remove(&v);
                        prop_assert_eq!(tree.get(next), model.range(v..).next());
                    }
                }
                Op::PopFirst => prop_assert_eq!(tree.pop_first(), model.pop_first()),
                Op::PopLast => prop_assert_eq!(tree.pop_last(), model.pop_last()),
            }
            tree.assert_valid();
            prop_assert_eq!(tree.len(), model.len());
        }

        prop_assert!(tree.iter().eq(model.iter()));
        prop_assert!(tree.iter().rev().eq(model.iter().rev()));
        prop_assert_eq!(tree.first(), model.first());
        prop_assert_eq!(tree.last(), model.last());
    }

    #[test]
    fn bounds_match_btreeset(values in proptest::collection::btree_set(0u32..1000, 0..100), probe in 0u32..1000) {
        let tree: Treap<u32> = values.iter().copied().collect();

        prop_assert_eq!(tree.get(tree.lower_bound(&probe)), values.range(probe..).next());
        prop_assert_eq!(tree.get(tree.upper_bound(&probe)), values.range(probe + 1..).next());
        prop_assert_eq!(tree.contains(&probe), values.contains(&probe));
        prop_assert!(tree.range(probe..probe + 50).eq(values.range(probe..probe + 50)));
        prop_assert!(tree.range(..=probe).rev().eq(values.range(..=probe).rev()));
    }

    #[test]
    fn clone_matches_shape(seed in any::<u64>(), values in proptest::collection::vec(any::<i32>(), 0..200)) {
        let mut tree = Treap::with_parts(Natural, DefaultPriority::from_seed(seed));
        tree.extend(values);
        let copy = tree.clone();
        copy.assert_valid();
        prop_assert_eq!(copy.height(), tree.height());
        prop_assert_eq!(&copy, &tree);
    }

    #[test]
    fn any_priorities_keep_invariants(
        entries in proptest::collection::vec((any::<u8>(), any::<u8>()), 0..100),
        removals in proptest::collection::vec(any::<u8>(), 0..100),
    ) {
        // low-entropy priorities produce lots of ties
        let priorities: Vec<u32> = entries.iter().map(|(_, p)| u32::from(*p % 4)).collect();
        let mut draws = priorities.into_iter();
        let mut tree = Treap::with_parts(Natural, move || draws.next().unwrap_or(0));

        for (value, _) in &entries {
            tree.insert(*value);
            tree.assert_valid();
        }
        for value in &removals {
            tree.remove(value);
            tree.assert_valid();
        }
    }
}

mod common;

use treap::{Natural, Position, Priority, Reverse, Treap};

use crate::common::{init_tracing, seeded};

#[test]
fn smoke() {
    init_tracing();

    let mut tree = seeded(1);
    for value in [5, 3, 8, 1, 4] {
        tracing::debug!("inserting {value}");
        assert!(tree.insert(value).1);
        tree.assert_valid();
    }
    assert_eq!(tree.len(), 5);
    assert!(tree.iter().copied().eq([1, 3, 4, 5, 8]));

    let next = tree.erase(tree.find(&3));
    assert_eq!(tree.get(next), Some(&4));
    tree.assert_valid();
    assert!(tree.iter().copied().eq([1, 4, 5, 8]));
    assert_eq!(tree.find(&3), tree.end());

    assert_eq!(tree.get(tree.lower_bound(&4)), Some(&4));
    assert_eq!(tree.get(tree.upper_bound(&4)), Some(&5));
    assert_eq!(tree.get(tree.lower_bound(&6)), Some(&8));
    assert_eq!(tree.upper_bound(&8), tree.end());
    assert_eq!(tree.get(tree.lower_bound(&0)), Some(&1));
}

#[test]
fn empty_tree() {
    let mut tree = seeded::<i32>(2);
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.begin(), tree.end());
    assert_eq!(tree.find(&1), tree.end());
    assert_eq!(tree.lower_bound(&1), tree.end());
    assert_eq!(tree.upper_bound(&1), tree.end());
    assert_eq!(tree.successor(tree.end()), tree.end());
    assert_eq!(tree.predecessor(tree.end()), tree.end());
    assert_eq!(tree.iter().next(), None);
    assert_eq!(tree.height(), 0);
    assert!(!tree.remove(&1));
    assert_eq!(tree.erase(tree.end()), tree.end());
    tree.assert_valid();
}

#[test]
fn single_element() {
    let mut tree = seeded(3);
    let (pos, inserted) = tree.insert(42);
    assert!(inserted);
    assert_eq!(tree.begin(), pos);
    assert_eq!(tree.successor(pos), tree.end());
    assert_eq!(tree.predecessor(pos), tree.end());
    assert_eq!(tree.successor(tree.end()), pos);
    assert_eq!(tree.predecessor(tree.end()), pos);
    assert_eq!(tree.height(), 1);

    assert_eq!(tree.erase(pos), tree.end());
    assert!(tree.is_empty());
    assert_eq!(tree.begin(), tree.end());
    tree.assert_valid();
}

#[test]
fn positions_walk_in_order() {
    let tree: Treap<u32> = (0..32).rev().collect();

    let mut pos = tree.begin();
    for expected in 0..32 {
        assert_eq!(tree.get(pos), Some(&expected));
        pos = tree.successor(pos);
    }
    assert!(pos.is_end());
    assert_eq!(pos, Position::END);

    for expected in (0..32).rev() {
        pos = tree.predecessor(pos);
        assert_eq!(tree.get(pos), Some(&expected));
    }
    assert_eq!(tree.predecessor(pos), tree.end());
}

#[test]
fn custom_orderings() {
    let mut tree = Treap::<&str, _>::with_compare(Reverse(Natural));
    tree.extend(["b", "c", "a"]);
    assert!(tree.iter().copied().eq(["c", "b", "a"]));
    assert_eq!(tree.get(tree.lower_bound(&"bb")), Some(&"b"));
    tree.assert_valid();

    // equivalence under the comparator, not equality, decides duplicates
    let mut by_len = Treap::<&str, _>::with_compare(|a: &&str, b: &&str| a.len() < b.len());
    assert!(by_len.insert("one").1);
    assert!(!by_len.insert("two").1);
    assert!(by_len.insert("three").1);
    assert_eq!(by_len.get(by_len.find(&"six")), Some(&"one"));
    by_len.assert_valid();
}

#[test]
fn fixed_priorities_give_fixed_shapes() {
    // every insert draws the next priority, so the shape is fully determined
    let priorities = [50, 90, 10, 70, 30];
    let mut source = priorities.into_iter().cycle();
    let mut tree = Treap::with_parts(Natural, move || -> Priority { source.next().unwrap_or(0) });
    tree.extend([3, 1, 4, 2, 5]);
    tree.assert_valid();

    // 1 (90) is the root, 2 (70) its right child, 3 (50) below that, 4 and 5 further down
    assert_eq!(tree.height(), 5);
    assert!(tree.iter().copied().eq(1..=5));

    tree.remove(&1);
    tree.assert_valid();
    assert_eq!(tree.height(), 4);
}

#[test]
fn equality_ignores_shape() {
    let a: Treap<u32> = (0..100).collect();
    let b: Treap<u32> = (0..100).rev().collect();
    assert_eq!(a, b);

    let mut c = b.clone();
    c.remove(&50);
    assert_ne!(a, c);
    c.insert(50);
    assert_eq!(a, c);

    assert_eq!(format!("{:?}", Treap::<u8>::from([2, 1])), "{1, 2}");
}

#[test]
fn extend_from_references() {
    let values = [3_u64, 1, 2, 3];
    let mut tree = seeded::<u64>(4);
    tree.extend(&values);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&3));
}

#[test]
fn swap_and_move_keep_positions() {
    let mut a = seeded(5);
    let mut b = seeded(6);
    let (pos, _) = a.insert(10);
    a.insert(20);
    b.insert(30);

    a.swap(&mut b);
    assert_eq!(b.get(pos), Some(&10));
    assert!(a.iter().copied().eq([30]));
    a.assert_valid();
    b.assert_valid();

    let moved = std::mem::take(&mut b);
    assert_eq!(moved.get(pos), Some(&10));
    assert!(b.is_empty());
    b.insert(1);
    b.assert_valid();
}

#[test]
fn clone_then_diverge() {
    let mut original = seeded(7);
    original.extend(0..64);
    let copy = original.clone();

    original.retain(|v| v % 2 == 0);
    original.assert_valid();
    copy.assert_valid();

    assert_eq!(copy.len(), 64);
    assert_eq!(original.len(), 32);
    assert!(copy.iter().copied().eq(0..64));
}

#[test]
fn try_operations_succeed() {
    let mut tree = seeded(8);
    let (pos, inserted) = tree.try_insert(1).unwrap();
    assert!(inserted);
    let hinted = tree.try_insert_hint(pos, 2).unwrap();
    assert_eq!(tree.get(hinted), Some(&2));
    let (_, inserted) = tree.try_emplace_with(|| 3).unwrap();
    assert!(inserted);
    let emplaced = tree.try_emplace_hint_with(tree.end(), || 4).unwrap();
    assert_eq!(tree.get(emplaced), Some(&4));
    // an equivalent element wins and the fresh node is discarded
    let existing = tree.try_emplace_hint_with(tree.begin(), || 2).unwrap();
    assert_eq!(existing, hinted);
    assert_eq!(tree.emplace_hint_with(tree.end(), || 5), tree.find(&5));
    tree.assert_valid();
    assert!(tree.iter().copied().eq(1..=5));
    let copy = tree.try_clone().unwrap();
    assert_eq!(copy, tree);
}

#[test]
fn alloc_error_messages() {
    assert_eq!(
        treap::AllocError::TooManyNodes.to_string(),
        "treap node index space exhausted"
    );
    assert_eq!(
        treap::AllocError::OutOfMemory.to_string(),
        "memory allocation failed"
    );
}

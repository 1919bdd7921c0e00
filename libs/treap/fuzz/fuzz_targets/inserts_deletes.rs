#![no_main]

use libfuzzer_sys::fuzz_target;
use treap::{DefaultPriority, Natural, Treap};

fuzz_target!(|input: (u64, Vec<u16>, Vec<u16>)| {
    let (seed, inserts, removals) = input;
    let mut tree = Treap::with_parts(Natural, DefaultPriority::from_seed(seed));
    let mut model = std::collections::BTreeSet::new();

    for i in inserts {
        assert_eq!(tree.insert(i).1, model.insert(i));
        tree.assert_valid();
    }

    for i in removals {
        assert_eq!(tree.remove(&i), model.remove(&i));
        tree.assert_valid();
    }

    assert!(tree.iter().eq(model.iter()));
});

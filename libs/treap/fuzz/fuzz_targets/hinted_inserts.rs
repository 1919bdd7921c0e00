#![no_main]

use libfuzzer_sys::fuzz_target;
use treap::{Natural, Treap};

// Priorities come straight from the input so the fuzzer controls the shape, including ties.
fuzz_target!(|input: (Vec<u8>, Vec<(u8, bool)>)| {
    let (priorities, ops) = input;
    let mut priorities = priorities.into_iter().cycle();
    let mut tree = Treap::with_parts(Natural, move || u32::from(priorities.next().unwrap_or(0)));

    let mut hint = tree.end();
    for (value, remove) in ops {
        if remove {
            hint = tree.erase(tree.lower_bound(&value));
        } else {
            hint = tree.insert_hint(hint, value);
            assert_eq!(tree.get(hint), Some(&value));
        }
        tree.assert_valid();
    }
});

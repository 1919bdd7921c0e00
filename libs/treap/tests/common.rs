#![allow(unused, reason = "not used by all tests")]

use treap::{DefaultPriority, Natural, Treap};

/// Installs a `tracing` subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A tree with reproducible priorities.
pub fn seeded<T: Ord>(seed: u64) -> Treap<T, Natural, DefaultPriority> {
    Treap::with_parts(Natural, DefaultPriority::from_seed(seed))
}

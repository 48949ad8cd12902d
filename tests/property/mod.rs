//! Property-based tests for the queueing core.
//!
//! Run with: cargo test --test property_tests


use proptest::prelude::*;
use waitroom_queue::Tier;

/// One step applied to a queue under test.
#[derive(Debug, Clone)]
pub enum Op {
    Enqueue(usize, Tier),
    Remove(usize),
}

pub fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Bypass), Just(Tier::Priority), Just(Tier::Normal)]
}

/// Operations over a pool of `clients` ids, enqueue-heavy.
pub fn ops(clients: usize, len: usize) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (0..clients, tier()).prop_map(|(c, t)| Op::Enqueue(c, t)),
        1 => (0..clients).prop_map(Op::Remove),
    ];
    prop::collection::vec(op, 1..len)
}

//! Waiting-area tests.
//!
//! Test organization:
//! - ordering.rs: tier priority and FIFO order
//! - stale.rs: lazy eviction of clients that left
//! - positions.rs: position lookups and cache consistency
//! - admin.rs: the read-only admin queries

mod ordering;

//! Dispatch tests.
//!
//! Test organization:
//! - queue_mode.rs: one attempt per destination per tick
//! - direct_mode.rs: one attempt per tick across the waiting area
//! - notifier.rs: periodic status messages
//! - lifecycle.rs: background tasks and the assembled waitroom

mod notifier;

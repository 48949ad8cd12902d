//! Reconnect protocol tests.
//!
//! Test organization:
//! - outcomes.rs: every outcome and the connecting flag
//! - issues.rs: ban and whitelist classification
//! - guard.rs: attempts that never start
//! - cancellation.rs: removal while a connect is in flight
//! - events.rs: event listeners
//! - logging.rs: log levels of the attempt lifecycle

mod events;
mod outcomes;

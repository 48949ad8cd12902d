//! Background tasks that keep a waiting area moving.
//!
//! - [`Dispatcher`] runs the reconnect protocol on a fixed interval. Ticks never
//!   overlap: a tick only decides who to attempt and spawns the attempts.
//! - [`QueueNotifier`] periodically tells waiting clients their queue position,
//!   that their destination is under maintenance, or (optionally) their policy
//!   issue again.
//!
//! Both own a tokio task started with `start`, aborted with `stop` or on drop.
//!
//! # Feature Flags
//!
//! - `tracing`: structured logging via the `tracing` crate
//! - `metrics`: dispatch tick counter via the `metrics` crate
//! - `serde`: (de)serialize [`DispatchConfig`]

mod config;
mod dispatcher;
mod notifier;

pub use config::{DispatchConfig, DispatchConfigBuilder};
pub use dispatcher::{Dispatched, Dispatcher};
pub use notifier::QueueNotifier;

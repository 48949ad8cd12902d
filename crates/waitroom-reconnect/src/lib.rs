//! Reconnect protocol for waitroom.
//!
//! Moves a waiting client to its destination in four steps: a guard that takes
//! the client's connecting flag, a capacity probe, a maintenance check and the
//! connect itself. The connect result is classified into one of four outcomes:
//!
//! - **Success**: the client reached the destination and leaves its queues
//! - **Transient skip**: nothing happens, the next dispatch tick retries
//! - **Soft issue**: the destination refused the client for a policy reason
//!   (ban, whitelist); the issue is recorded and the client leaves its queues
//! - **Hard error**: any other failure; the client is told the reason and
//!   stays queued
//!
//! The connect transport is any [`tower::Service`] taking
//! [`ConnectRequest`](waitroom_core::ConnectRequest)s.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waitroom_core::{BoxError, ConnectRequest, ConnectResult, ProbeReport};
//! use waitroom_queue::WaitingArea;
//! use waitroom_reconnect::{ReconnectConfig, ReconnectProtocol};
//! # use waitroom_core::{ClientDirectory, ClientId, SharedClient};
//! # struct Empty;
//! # impl ClientDirectory for Empty {
//! #     fn resolve(&self, _: ClientId) -> Option<SharedClient> { None }
//! #     fn waiting(&self) -> Vec<SharedClient> { Vec::new() }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let area = Arc::new(WaitingArea::builder().directory(Arc::new(Empty)).build()?);
//!
//! let probe = |_destination: &str| async { Ok(Some(ProbeReport::online(100, 3))) };
//! let connector = tower::service_fn(|_req: ConnectRequest| async {
//!     Ok::<_, BoxError>(ConnectResult::success())
//! });
//!
//! let config = ReconnectConfig::builder()
//!     .name("lobby")
//!     .on_success(|client, destination| println!("{client} -> {destination}"))
//!     .build()?;
//!
//! let protocol = ReconnectProtocol::new(area, probe, connector, config);
//! if let Ok(outcome) = protocol.reconnect(ClientId::random()).await {
//!     println!("{}", outcome.as_str());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `metrics`: attempt and outcome counters via the `metrics` crate
//! - `tracing`: structured logging via the `tracing` crate
//! - `serde`: (de)serialize [`ClassifierTerms`]

mod blocker;
mod classify;
mod config;
mod events;
mod outcome;
mod protocol;

pub use blocker::{InMemoryBlocker, DEFAULT_BLOCK_TTL};
pub use classify::{classify_failure, ClassifierTerms};
pub use config::{ReconnectConfig, ReconnectConfigBuilder};
pub use events::ReconnectEvent;
pub use outcome::{AttemptOutcome, GuardRejection, SkipReason};
pub use protocol::{PendingAttempt, ReconnectProtocol};

//! Core infrastructure for waitroom.
//!
//! This crate provides the shared vocabulary used by every waitroom crate:
//! - Client identifiers and the handle trait the host implements
//! - Capability traits for external collaborators (probe, maintenance, blocker, auth)
//! - Notification keys handed to the host's message sink
//! - Event system for observability
//! - Common error types

pub mod capability;
pub mod client;
pub mod error;
pub mod events;
pub mod notify;
pub mod probe;

pub use capability::{
    AuthGate, Capabilities, CapabilitiesBuilder, MaintenanceOracle, NoMaintenance, NoopAuthGate,
    NoopBlocker, ReconnectBlocker,
};
pub use client::{Client, ClientDirectory, ClientId, SharedClient};
pub use error::WaitroomError;
pub use events::{EventListener, EventListeners, WaitroomEvent};
pub use notify::{MessageKey, Notification, NotificationSink, ParamValue};
pub use probe::{
    BoxError, ConnectRequest, ConnectResult, ConnectStatus, DestinationProbe, ProbeError,
    ProbeReport,
};

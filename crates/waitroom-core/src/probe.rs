//! Result contracts of the destination probe and connect transport.
//!
//! Waitroom never pings a destination or performs a handshake itself. The host
//! provides a [`DestinationProbe`] and a tower `Service<ConnectRequest>`; this
//! module defines the narrow data both hand back.

use crate::ClientId;
use std::future::Future;

/// Boxed error type used by connect transports, following the tower convention.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Liveness and capacity snapshot of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    /// Whether the destination answered as online.
    pub online: bool,
    /// Maximum number of concurrent clients the destination accepts.
    pub max_slots: u32,
    /// Number of clients currently connected to the destination.
    pub used_slots: u32,
}

impl ProbeReport {
    /// Creates an online report with the given slot counts.
    pub fn online(max_slots: u32, used_slots: u32) -> Self {
        Self {
            online: true,
            max_slots,
            used_slots,
        }
    }

    /// Creates a report for a destination that is down.
    pub fn offline() -> Self {
        Self {
            online: false,
            max_slots: 0,
            used_slots: 0,
        }
    }

    /// Returns `true` if the destination is online and has a free slot.
    pub fn has_capacity(&self) -> bool {
        self.online && self.used_slots < self.max_slots
    }
}

/// Errors reported by a destination probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The destination could not be reached.
    #[error("destination unreachable: {0}")]
    Unreachable(String),
    /// The probe did not complete in time.
    #[error("probe timed out")]
    Timeout,
}

/// Trait for querying the liveness and capacity of a destination.
///
/// `Ok(None)` means the destination answered without slot data; callers treat
/// it like an error.
///
/// # Examples
///
/// Using a closure (via blanket impl):
///
/// ```rust
/// use waitroom_core::{DestinationProbe, ProbeError, ProbeReport};
///
/// let probe = |_destination: &str| async { Ok::<_, ProbeError>(Some(ProbeReport::online(100, 42))) };
/// ```
pub trait DestinationProbe: Send + Sync {
    /// Probes the named destination.
    fn probe(
        &self,
        destination: &str,
    ) -> impl Future<Output = Result<Option<ProbeReport>, ProbeError>> + Send;
}

impl<F, Fut> DestinationProbe for F
where
    F: Fn(&str) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<ProbeReport>, ProbeError>> + Send,
{
    fn probe(
        &self,
        destination: &str,
    ) -> impl Future<Output = Result<Option<ProbeReport>, ProbeError>> + Send {
        self(destination)
    }
}

/// Request handed to the connect transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// The client to move.
    pub client: ClientId,
    /// The destination to move it to.
    pub destination: String,
}

/// Status of a finished connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    /// The client was moved to the destination.
    Success,
    /// The client was already connected to the destination.
    AlreadyConnected,
    /// Another connect request for this client is still running.
    InProgress,
    /// The request was cancelled before completing.
    Cancelled,
    /// The destination refused the client.
    Denied,
}

impl ConnectStatus {
    /// Returns the status name used in logs and notification parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectStatus::Success => "success",
            ConnectStatus::AlreadyConnected => "already_connected",
            ConnectStatus::InProgress => "in_progress",
            ConnectStatus::Cancelled => "cancelled",
            ConnectStatus::Denied => "denied",
        }
    }
}

/// Outcome of a connect request as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResult {
    /// Final status of the request.
    pub status: ConnectStatus,
    /// Plain-text reason supplied by the destination when it refused the client.
    pub rejection: Option<String>,
}

impl ConnectResult {
    /// A successful connect.
    pub fn success() -> Self {
        Self {
            status: ConnectStatus::Success,
            rejection: None,
        }
    }

    /// A refused connect carrying the destination's reason.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            status: ConnectStatus::Denied,
            rejection: Some(reason.into()),
        }
    }

    /// A result with the given status and no reason text.
    pub fn with_status(status: ConnectStatus) -> Self {
        Self {
            status,
            rejection: None,
        }
    }

    /// Returns `true` if the client ended up on the destination.
    pub fn is_successful(&self) -> bool {
        matches!(
            self.status,
            ConnectStatus::Success | ConnectStatus::AlreadyConnected
        )
    }
}

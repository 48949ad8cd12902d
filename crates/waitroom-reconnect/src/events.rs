use crate::SkipReason;
use std::time::Instant;
use waitroom_core::{ClientId, WaitroomEvent};
use waitroom_queue::IssueKind;

/// Events emitted by the reconnect protocol.
#[derive(Debug, Clone)]
pub enum ReconnectEvent {
    /// The guard passed and the attempt is about to probe.
    AttemptStarted {
        source_name: String,
        timestamp: Instant,
        client: ClientId,
        destination: String,
    },
    /// The client reached its destination.
    Succeeded {
        source_name: String,
        timestamp: Instant,
        client: ClientId,
        destination: String,
    },
    /// The attempt ended silently and will be retried.
    Skipped {
        source_name: String,
        timestamp: Instant,
        client: ClientId,
        destination: String,
        reason: SkipReason,
    },
    /// The destination refused the client for a policy reason.
    SoftIssue {
        source_name: String,
        timestamp: Instant,
        client: ClientId,
        destination: String,
        issue: IssueKind,
    },
    /// The connect failed for any other reason.
    HardError {
        source_name: String,
        timestamp: Instant,
        client: ClientId,
        destination: String,
        reason: String,
    },
}

impl ReconnectEvent {
    /// The client the attempt was for.
    pub fn client(&self) -> ClientId {
        match self {
            ReconnectEvent::AttemptStarted { client, .. }
            | ReconnectEvent::Succeeded { client, .. }
            | ReconnectEvent::Skipped { client, .. }
            | ReconnectEvent::SoftIssue { client, .. }
            | ReconnectEvent::HardError { client, .. } => *client,
        }
    }

    /// The destination the attempt targeted.
    pub fn destination(&self) -> &str {
        match self {
            ReconnectEvent::AttemptStarted { destination, .. }
            | ReconnectEvent::Succeeded { destination, .. }
            | ReconnectEvent::Skipped { destination, .. }
            | ReconnectEvent::SoftIssue { destination, .. }
            | ReconnectEvent::HardError { destination, .. } => destination,
        }
    }
}

impl WaitroomEvent for ReconnectEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReconnectEvent::AttemptStarted { .. } => "AttemptStarted",
            ReconnectEvent::Succeeded { .. } => "Succeeded",
            ReconnectEvent::Skipped { .. } => "Skipped",
            ReconnectEvent::SoftIssue { .. } => "SoftIssue",
            ReconnectEvent::HardError { .. } => "HardError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ReconnectEvent::AttemptStarted { timestamp, .. }
            | ReconnectEvent::Succeeded { timestamp, .. }
            | ReconnectEvent::Skipped { timestamp, .. }
            | ReconnectEvent::SoftIssue { timestamp, .. }
            | ReconnectEvent::HardError { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ReconnectEvent::AttemptStarted { source_name, .. }
            | ReconnectEvent::Succeeded { source_name, .. }
            | ReconnectEvent::Skipped { source_name, .. }
            | ReconnectEvent::SoftIssue { source_name, .. }
            | ReconnectEvent::HardError { source_name, .. } => source_name,
        }
    }

    fn client(&self) -> Option<ClientId> {
        Some(ReconnectEvent::client(self))
    }

    fn destination(&self) -> Option<&str> {
        Some(ReconnectEvent::destination(self))
    }
}

//! Attempt outcomes and guard rejections.

use std::fmt;
use waitroom_queue::IssueKind;

/// Why an attempt ended without trying, or without effect.
///
/// Skips are retried on the next tick and are never surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The probe failed.
    Unreachable,
    /// The probe answered without slot data.
    NoData,
    /// The destination is offline or has no free slot.
    Full,
    /// The destination is under maintenance and the client holds no bypass.
    Maintenance,
    /// The transport reported another connect already running for the client.
    InProgress,
    /// The client was removed, or its record replaced, while the connect ran.
    Removed,
}

impl SkipReason {
    /// Returns the reason name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unreachable => "unreachable",
            SkipReason::NoData => "no_data",
            SkipReason::Full => "full",
            SkipReason::Maintenance => "maintenance",
            SkipReason::InProgress => "in_progress",
            SkipReason::Removed => "removed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a reconnect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The client reached its destination.
    Success,
    /// Nothing happened; try again next tick.
    TransientSkip(SkipReason),
    /// The destination refused the client for a policy reason. The client was
    /// notified once and left the queue.
    SoftIssue(IssueKind),
    /// The connect failed for another reason. The client was notified and
    /// stays queued.
    HardError(String),
}

impl AttemptOutcome {
    /// Returns the outcome name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransientSkip(_) => "skipped",
            AttemptOutcome::SoftIssue(_) => "soft_issue",
            AttemptOutcome::HardError(_) => "hard_error",
        }
    }

    /// Returns `true` for [`AttemptOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// Why the guard step refused to start an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    /// The client no longer resolves to an active handle.
    #[error("client is not connectable")]
    Inactive,
    /// The reconnect blocker forbids the client.
    #[error("client is blocked from reconnecting")]
    Blocked,
    /// The client has no destination on record.
    #[error("client has no destination on record")]
    NoDestination,
    /// An attempt for this client is already running.
    #[error("an attempt is already in flight for this client")]
    InFlight,
}

//! Common error types for waitroom.
//!
//! Reconnect attempts never surface errors to their caller: every failure is
//! folded into an attempt outcome. What remains here are the errors that stop
//! a host from assembling the service objects in the first place.

/// Errors raised while building waitroom components.
///
/// These are fatal for initialization: the host should surface them to the
/// operator and not start the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitroomError {
    /// A collaborator the component cannot work without was never supplied.
    #[error("missing required component: {0}")]
    MissingComponent(&'static str),

    /// A configuration value is out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl WaitroomError {
    /// Returns `true` if this error reports a missing collaborator.
    pub fn is_missing_component(&self) -> bool {
        matches!(self, WaitroomError::MissingComponent(_))
    }

    /// Returns `true` if this error reports a bad configuration value.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, WaitroomError::InvalidConfig { .. })
    }
}

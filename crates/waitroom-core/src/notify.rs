//! Semantic notification keys handed to the host's message sink.
//!
//! Waitroom never renders text. It hands the host a key and a few named
//! parameters; the host owns templates and delivery.

use crate::Client;
use std::fmt;

/// Message keys emitted by waitroom components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// The destination banned the client.
    IssueBanned,
    /// The client is not on the destination's whitelist.
    IssueNotWhitelisted,
    /// Periodic queue position update.
    QueuePosition,
    /// The client was just placed in a queue.
    QueueJoined,
    /// A connect attempt failed for a reason that is retried.
    ConnectFailed,
    /// The client's destination is under maintenance.
    MaintenanceActive,
}

impl MessageKey {
    /// Returns the dotted template key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::IssueBanned => "issue.banned",
            MessageKey::IssueNotWhitelisted => "issue.not_whitelisted",
            MessageKey::QueuePosition => "queue.position",
            MessageKey::QueueJoined => "queue.joined",
            MessageKey::ConnectFailed => "connect.failed",
            MessageKey::MaintenanceActive => "maintenance.active",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Numeric parameter such as a position.
    Int(i64),
    /// Text parameter such as a destination name or failure reason.
    Text(String),
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

/// A keyed message with named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    key: MessageKey,
    params: Vec<(&'static str, ParamValue)>,
}

impl Notification {
    /// Creates a notification without parameters.
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            params: Vec::new(),
        }
    }

    /// Adds a named parameter.
    pub fn with_param(mut self, name: &'static str, value: impl Into<ParamValue>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Returns the message key.
    pub fn key(&self) -> MessageKey {
        self.key
    }

    /// Returns all parameters in insertion order.
    pub fn params(&self) -> &[(&'static str, ParamValue)] {
        &self.params
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// Fire-and-forget message delivery to a client.
///
/// Implemented for closures taking `(&dyn Client, Notification)`.
pub trait NotificationSink: Send + Sync {
    /// Delivers a notification. Must not block.
    fn notify(&self, client: &dyn Client, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(&dyn Client, Notification) + Send + Sync,
{
    fn notify(&self, client: &dyn Client, notification: Notification) {
        self(client, notification)
    }
}

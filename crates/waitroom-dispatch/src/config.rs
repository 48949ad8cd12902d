//! Configuration for the dispatch loop and the queue notifier.

use std::time::Duration;
use waitroom_core::WaitroomError;

/// Configuration shared by [`Dispatcher`](crate::Dispatcher) and
/// [`QueueNotifier`](crate::QueueNotifier).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatchConfig {
    /// Name used in log output
    pub(crate) name: String,

    /// Interval between dispatch ticks
    pub(crate) interval: Duration,

    /// Interval between notifier rounds
    pub(crate) notify_interval: Duration,

    /// Whether the notifier repeats policy issue messages every round
    pub(crate) remind_issues: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            interval: Duration::from_secs(1),
            notify_interval: Duration::from_secs(15),
            remind_issues: false,
        }
    }
}

impl DispatchConfig {
    /// Create a new builder.
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::default()
    }

    /// Get the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the dispatch interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Get the notifier interval.
    pub fn notify_interval(&self) -> Duration {
        self.notify_interval
    }

    /// Whether policy issues are re-announced by the notifier.
    pub fn remind_issues(&self) -> bool {
        self.remind_issues
    }

    /// Checks the settings; deserialized configs skip the builder.
    pub fn validate(&self) -> Result<(), WaitroomError> {
        if self.interval.is_zero() {
            return Err(WaitroomError::InvalidConfig {
                field: "interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.notify_interval.is_zero() {
            return Err(WaitroomError::InvalidConfig {
                field: "notify_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `DispatchConfig`.
#[derive(Default)]
pub struct DispatchConfigBuilder {
    name: Option<String>,
    interval: Option<Duration>,
    notify_interval: Option<Duration>,
    remind_issues: Option<bool>,
}

impl DispatchConfigBuilder {
    /// Set the name used in log output.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the interval between dispatch ticks.
    ///
    /// Default: 1 second
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the interval between notifier rounds.
    ///
    /// Default: 15 seconds
    pub fn notify_interval(mut self, interval: Duration) -> Self {
        self.notify_interval = Some(interval);
        self
    }

    /// Repeat `issue.*` messages every notifier round instead of only once when
    /// the issue is recorded.
    ///
    /// Default: false
    pub fn remind_issues(mut self, remind: bool) -> Self {
        self.remind_issues = Some(remind);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<DispatchConfig, WaitroomError> {
        let default = DispatchConfig::default();
        let config = DispatchConfig {
            name: self.name.unwrap_or(default.name),
            interval: self.interval.unwrap_or(default.interval),
            notify_interval: self.notify_interval.unwrap_or(default.notify_interval),
            remind_issues: self.remind_issues.unwrap_or(default.remind_issues),
        };
        config.validate()?;
        Ok(config)
    }
}

use crate::classify::ClassifierTerms;
use crate::events::ReconnectEvent;
use crate::SkipReason;
use waitroom_core::events::EventListeners;
use waitroom_core::{ClientId, WaitroomError};
use waitroom_queue::IssueKind;

/// Configuration for the reconnect protocol.
pub struct ReconnectConfig {
    pub(crate) name: String,
    pub(crate) terms: ClassifierTerms,
    pub(crate) event_listeners: EventListeners<ReconnectEvent>,
}

impl ReconnectConfig {
    /// Creates a new builder.
    pub fn builder() -> ReconnectConfigBuilder {
        ReconnectConfigBuilder::new()
    }

    /// Name used as the event source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vocabulary used to classify connect failures.
    pub fn terms(&self) -> &ClassifierTerms {
        &self.terms
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            terms: ClassifierTerms::default(),
            event_listeners: EventListeners::new(),
        }
    }
}

impl std::fmt::Debug for ReconnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectConfig")
            .field("name", &self.name)
            .field("terms", &self.terms)
            .field("event_listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`ReconnectConfig`].
pub struct ReconnectConfigBuilder {
    name: String,
    terms: ClassifierTerms,
    event_listeners: EventListeners<ReconnectEvent>,
}

impl Default for ReconnectConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - ban terms: `["ban", "banned"]`
    /// - whitelist terms: `["whitelist", "not whitelisted"]`
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            terms: ClassifierTerms::default(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name reported as the source of every event.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the terms that classify a failure as a ban.
    pub fn ban_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.ban = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the terms that classify a failure as a missing whitelist entry.
    pub fn whitelist_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.whitelist = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the whole classifier vocabulary.
    pub fn terms(mut self, terms: ClassifierTerms) -> Self {
        self.terms = terms;
        self
    }

    /// Registers a callback when an attempt passes the guard.
    ///
    /// # Example
    /// ```rust
    /// use waitroom_reconnect::ReconnectConfig;
    ///
    /// let config = ReconnectConfig::builder()
    ///     .on_attempt_started(|client, destination| {
    ///         println!("moving {client} to {destination}");
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_attempt_started<F>(mut self, f: F) -> Self
    where
        F: Fn(ClientId, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &ReconnectEvent| {
            if let ReconnectEvent::AttemptStarted {
                client,
                destination,
                ..
            } = event
            {
                f(*client, destination);
            }
        });
        self
    }

    /// Registers a callback when a client reaches its destination.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(ClientId, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &ReconnectEvent| {
            if let ReconnectEvent::Succeeded {
                client,
                destination,
                ..
            } = event
            {
                f(*client, destination);
            }
        });
        self
    }

    /// Registers a callback when an attempt ends silently.
    pub fn on_skipped<F>(mut self, f: F) -> Self
    where
        F: Fn(ClientId, SkipReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &ReconnectEvent| {
            if let ReconnectEvent::Skipped { client, reason, .. } = event {
                f(*client, *reason);
            }
        });
        self
    }

    /// Registers a callback when a destination refuses a client for a policy
    /// reason.
    pub fn on_soft_issue<F>(mut self, f: F) -> Self
    where
        F: Fn(ClientId, IssueKind) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &ReconnectEvent| {
            if let ReconnectEvent::SoftIssue { client, issue, .. } = event {
                f(*client, *issue);
            }
        });
        self
    }

    /// Registers a callback when a connect fails for any other reason.
    pub fn on_hard_error<F>(mut self, f: F) -> Self
    where
        F: Fn(ClientId, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event: &ReconnectEvent| {
            if let ReconnectEvent::HardError { client, reason, .. } = event {
                f(*client, reason);
            }
        });
        self
    }

    /// Registers a callback for every event about one destination.
    pub fn on_destination_event<F>(mut self, destination: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ReconnectEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add_for_destination(destination, f);
        self
    }

    /// Builds the configuration.
    ///
    /// Fails if any classifier term is blank.
    pub fn build(self) -> Result<ReconnectConfig, WaitroomError> {
        if let Some(field) = self.terms.find_empty() {
            return Err(WaitroomError::InvalidConfig {
                field,
                reason: "terms must not be blank".to_string(),
            });
        }

        Ok(ReconnectConfig {
            name: self.name,
            terms: self.terms,
            event_listeners: self.event_listeners,
        })
    }
}

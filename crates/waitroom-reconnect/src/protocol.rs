//! The reconnect attempt state machine.
//!
//! ```text
//! Guard -> Probing -> MaintenanceCheck -> Connecting -> Success
//!   |         |              |                 |-----> TransientSkip
//!   v         v              v                 |-----> SoftIssue(kind)
//! rejected  TransientSkip  TransientSkip       '-----> HardError(reason)
//! ```
//!
//! The guard runs synchronously and takes the client's connecting flag; the
//! remaining steps are awaited in order by [`PendingAttempt::run`]. The flag is
//! released on every path, including when the attempt future is dropped.

use crate::classify::classify_failure;
use crate::config::ReconnectConfig;
use crate::events::ReconnectEvent;
use crate::{AttemptOutcome, GuardRejection, SkipReason};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower::{Service, ServiceExt};
use waitroom_core::{
    BoxError, ClientId, ConnectRequest, ConnectResult, DestinationProbe, MessageKey, Notification,
    SharedClient,
};
use waitroom_queue::{BeginError, ConnectingGuard, WaitingArea};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Moves waiting clients to their destination.
///
/// Generic over the destination probe `P` and the connect transport `C`, a
/// tower service taking [`ConnectRequest`]s. The transport is cloned for every
/// attempt, so attempts for different clients run independently.
pub struct ReconnectProtocol<P, C> {
    area: Arc<WaitingArea>,
    probe: Arc<P>,
    connector: C,
    config: Arc<ReconnectConfig>,
}

impl<P, C: Clone> Clone for ReconnectProtocol<P, C> {
    fn clone(&self) -> Self {
        Self {
            area: Arc::clone(&self.area),
            probe: Arc::clone(&self.probe),
            connector: self.connector.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P, C> ReconnectProtocol<P, C>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Clone + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    /// Creates a protocol over the waiting area.
    pub fn new(area: Arc<WaitingArea>, probe: P, connector: C, config: ReconnectConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "waitroom_reconnect_attempts_total",
                    "Total number of reconnect attempts that passed the guard"
                );
                describe_counter!(
                    "waitroom_reconnect_outcomes_total",
                    "Total number of finished reconnect attempts by outcome"
                );
            });
        }

        Self {
            area,
            probe: Arc::new(probe),
            connector,
            config: Arc::new(config),
        }
    }

    /// The waiting area this protocol serves.
    pub fn area(&self) -> &Arc<WaitingArea> {
        &self.area
    }

    /// The protocol configuration.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Runs the guard step and takes the client's connecting flag.
    ///
    /// The guard rejects clients that are no longer active, blocked, without a
    /// destination, or already mid-attempt.
    pub fn begin(&self, id: ClientId) -> Result<PendingAttempt<P, C>, GuardRejection> {
        let client = self
            .area
            .directory()
            .resolve_live(id)
            .ok_or(GuardRejection::Inactive)?;
        if self.area.capabilities().blocker().is_blocked(id) {
            return Err(GuardRejection::Blocked);
        }
        let guard = self
            .area
            .states()
            .try_begin_attempt(id)
            .map_err(|err| match err {
                BeginError::NotRegistered => GuardRejection::NoDestination,
                BeginError::InFlight => GuardRejection::InFlight,
            })?;

        #[cfg(feature = "tracing")]
        tracing::info!(client = %id, destination = guard.destination(), "reconnect attempt started");

        #[cfg(feature = "metrics")]
        counter!(
            "waitroom_reconnect_attempts_total",
            "destination" => guard.destination().to_string()
        )
        .increment(1);

        let destination = guard.destination().to_string();
        self.config.event_listeners.emit(&ReconnectEvent::AttemptStarted {
            source_name: self.config.name.clone(),
            timestamp: Instant::now(),
            client: id,
            destination: destination.clone(),
        });

        Ok(PendingAttempt {
            client,
            destination,
            guard: Some(guard),
            area: Arc::clone(&self.area),
            probe: Arc::clone(&self.probe),
            connector: self.connector.clone(),
            config: Arc::clone(&self.config),
        })
    }

    /// Runs a whole attempt for the client.
    pub async fn reconnect(&self, id: ClientId) -> Result<AttemptOutcome, GuardRejection> {
        Ok(self.begin(id)?.run().await)
    }
}

/// An attempt that passed the guard and holds the connecting flag.
pub struct PendingAttempt<P, C> {
    client: SharedClient,
    destination: String,
    guard: Option<ConnectingGuard>,
    area: Arc<WaitingArea>,
    probe: Arc<P>,
    connector: C,
    config: Arc<ReconnectConfig>,
}

impl<P, C> PendingAttempt<P, C>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    /// The client being moved.
    pub fn client(&self) -> ClientId {
        self.client.id()
    }

    /// The destination recorded when the guard passed.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Probes, checks maintenance, connects and classifies the result.
    pub fn run(mut self) -> impl Future<Output = AttemptOutcome> + Send + 'static {
        async move {
            let outcome = self.execute().await;
            self.release();
            self.report(&outcome);
            outcome
        }
    }

    async fn execute(&mut self) -> AttemptOutcome {
        match self.probe.probe(&self.destination).await {
            Ok(Some(report)) if report.has_capacity() => {}
            Ok(Some(_)) => return AttemptOutcome::TransientSkip(SkipReason::Full),
            Ok(None) => return AttemptOutcome::TransientSkip(SkipReason::NoData),
            Err(_) => return AttemptOutcome::TransientSkip(SkipReason::Unreachable),
        }

        let oracle = self.area.capabilities().maintenance();
        if oracle.is_under_maintenance(&self.destination) {
            if !oracle.is_bypass_eligible(&*self.client, &self.destination) {
                return AttemptOutcome::TransientSkip(SkipReason::Maintenance);
            }

            #[cfg(feature = "tracing")]
            tracing::info!(
                client = %self.client.id(),
                destination = %self.destination,
                "maintenance bypass"
            );
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            client = %self.client.id(),
            destination = %self.destination,
            "connecting"
        );

        let request = ConnectRequest {
            client: self.client.id(),
            destination: self.destination.clone(),
        };
        let result = (&mut self.connector)
            .oneshot(request)
            .await
            .map_err(Into::into);

        self.settle(result)
    }

    // Runs while the guard is still held, so a removal or a newer attempt
    // shows up as a guard that is no longer current.
    fn settle(&self, result: Result<ConnectResult, BoxError>) -> AttemptOutcome {
        let id = self.client.id();
        let states = self.area.states();

        if !self.guard.as_ref().is_some_and(ConnectingGuard::is_current) {
            #[cfg(feature = "tracing")]
            tracing::debug!(client = %id, destination = %self.destination, "client left during attempt");

            return AttemptOutcome::TransientSkip(SkipReason::Removed);
        }

        let (detail, result) = match result {
            Ok(result) if result.is_successful() => {
                states.clear_issue(id);
                self.area.remove_from_queues(id);
                return AttemptOutcome::Success;
            }
            Ok(result) => (String::new(), Some(result)),
            Err(err) => (err.to_string(), None),
        };

        if let Some(ConnectResult {
            status: waitroom_core::ConnectStatus::InProgress,
            ..
        }) = result
        {
            return AttemptOutcome::TransientSkip(SkipReason::InProgress);
        }

        let rejection = result
            .as_ref()
            .and_then(|r| r.rejection.clone())
            .unwrap_or_default();

        if let Some(issue) = classify_failure(&self.config.terms, &detail, &rejection) {
            states.mark_issue(id, issue);
            self.area.remove_from_queues(id);
            self.area.notify(
                &*self.client,
                Notification::new(issue.message_key())
                    .with_param("destination", self.destination.as_str()),
            );
            return AttemptOutcome::SoftIssue(issue);
        }

        let reason = if !detail.is_empty() {
            detail
        } else if !rejection.is_empty() {
            rejection
        } else {
            result
                .map(|r| r.status.as_str())
                .unwrap_or("failed")
                .to_string()
        };
        self.area.notify(
            &*self.client,
            Notification::new(MessageKey::ConnectFailed)
                .with_param("reason", reason.as_str())
                .with_param("destination", self.destination.as_str()),
        );
        AttemptOutcome::HardError(reason)
    }

    fn release(&mut self) {
        self.guard.take();
    }

    fn report(&self, outcome: &AttemptOutcome) {
        let id = self.client.id();
        let source_name = self.config.name.clone();
        let destination = self.destination.clone();
        let timestamp = Instant::now();

        #[cfg(feature = "metrics")]
        counter!(
            "waitroom_reconnect_outcomes_total",
            "destination" => destination.clone(),
            "outcome" => outcome.as_str()
        )
        .increment(1);

        let event = match outcome {
            AttemptOutcome::Success => {
                #[cfg(feature = "tracing")]
                tracing::info!(client = %id, destination = %destination, "reconnected");

                ReconnectEvent::Succeeded {
                    source_name,
                    timestamp,
                    client: id,
                    destination,
                }
            }
            AttemptOutcome::TransientSkip(reason) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(client = %id, destination = %destination, reason = %reason, "attempt skipped");

                ReconnectEvent::Skipped {
                    source_name,
                    timestamp,
                    client: id,
                    destination,
                    reason: *reason,
                }
            }
            AttemptOutcome::SoftIssue(issue) => {
                #[cfg(feature = "tracing")]
                tracing::info!(client = %id, destination = %destination, issue = %issue, "destination refused client");

                ReconnectEvent::SoftIssue {
                    source_name,
                    timestamp,
                    client: id,
                    destination,
                    issue: *issue,
                }
            }
            AttemptOutcome::HardError(reason) => {
                #[cfg(feature = "tracing")]
                tracing::info!(client = %id, destination = %destination, reason = %reason, "connect failed");

                ReconnectEvent::HardError {
                    source_name,
                    timestamp,
                    client: id,
                    destination,
                    reason: reason.clone(),
                }
            }
        };
        self.config.event_listeners.emit(&event);
    }
}

impl<P, C> std::fmt::Debug for PendingAttempt<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAttempt")
            .field("client", &self.client.id())
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

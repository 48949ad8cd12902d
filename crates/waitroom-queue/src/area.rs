//! The waiting area: per-destination queues, connection records, and the
//! read-only admin query surface over them.

use crate::{
    ConnectionStates, PositionCache, Positions, Tier, TierPolicy, TieredQueue,
    DEFAULT_POSITION_TTL,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use waitroom_core::{
    Capabilities, Client, ClientDirectory, ClientId, MaintenanceOracle, MessageKey, Notification,
    NotificationSink, SharedClient, WaitroomError,
};

#[cfg(feature = "metrics")]
use metrics::{describe_gauge, gauge};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// What [`WaitingArea::place`] did with a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The client already had a record; nothing changed.
    AlreadyRegistered,
    /// The reconnect blocker forbids the client; nothing changed.
    Blocked,
    /// Registered without a queue (direct mode).
    Registered,
    /// Registered and queued.
    Queued {
        /// Tier chosen by the tier policy.
        tier: Tier,
        /// Position right after joining, if the client resolved as live.
        position: Option<usize>,
    },
}

/// Read-only projection of a queued client for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedClientView {
    /// Client identifier.
    pub id: ClientId,
    /// Name reported by the client handle.
    pub display_name: String,
}

struct DiscardSink;

impl NotificationSink for DiscardSink {
    fn notify(&self, _client: &dyn Client, _notification: Notification) {}
}

/// Holding state for clients waiting to reach their destination.
///
/// Owns the per-destination [`TieredQueue`]s, the [`ConnectionStates`] table
/// and the [`PositionCache`]. Stale entries found by any scan are dropped from
/// both the queue and the state table.
pub struct WaitingArea {
    directory: Arc<dyn ClientDirectory>,
    capabilities: Capabilities,
    sink: Arc<dyn NotificationSink>,
    tier_policy: TierPolicy,
    queue_enabled: bool,
    queues: RwLock<BTreeMap<String, Arc<TieredQueue>>>,
    states: Arc<ConnectionStates>,
    positions: PositionCache,
}

impl WaitingArea {
    /// Creates a builder.
    pub fn builder() -> WaitingAreaBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_gauge!(
                    "waitroom_queued_clients",
                    "Number of clients queued across all destinations"
                );
            });
        }
        WaitingAreaBuilder::new()
    }

    /// Places a client in the waiting area for the destination.
    ///
    /// Registered clients are left alone, and so are clients the blocker
    /// currently forbids. In queue mode the client is queued in the tier its
    /// permissions resolve to and told its position.
    pub fn place(&self, client: &dyn Client, destination: &str) -> Placement {
        let id = client.id();
        if self.states.is_registered(id) {
            return Placement::AlreadyRegistered;
        }
        if self.capabilities.is_auth_blocked(id) {
            #[cfg(feature = "tracing")]
            tracing::debug!(client = %id, destination, "placement skipped, client is blocked");
            return Placement::Blocked;
        }
        if !self.states.register(id, destination) {
            return Placement::AlreadyRegistered;
        }
        if !self.queue_enabled {
            return Placement::Registered;
        }

        let tier = self.tier_policy.resolve(client, destination);
        if self.queue_or_create(destination).enqueue(id, tier) {
            self.positions.invalidate(destination);
        }
        self.record_queued();

        let position = self.positions(destination).get(&id).copied();
        let mut notification =
            Notification::new(MessageKey::QueueJoined).with_param("destination", destination);
        if let Some(position) = position {
            notification = notification.with_param("position", position);
        }
        self.sink.notify(client, notification);

        #[cfg(feature = "tracing")]
        tracing::info!(client = %id, destination, tier = %tier, ?position, "client queued");

        Placement::Queued { tier, position }
    }

    /// Removes every trace of a client: queue membership, connection record
    /// and any reconnect block.
    pub fn remove(&self, id: ClientId) -> bool {
        let dequeued = self.remove_from_queues(id);
        let forgotten = self.states.remove_all(id).is_some();
        self.capabilities.blocker().unblock(id);

        #[cfg(feature = "tracing")]
        {
            if dequeued || forgotten {
                tracing::debug!(client = %id, "client removed from waiting area");
            }
        }

        dequeued || forgotten
    }

    /// Removes a client from the queues but keeps its connection record.
    pub fn remove_from_queues(&self, id: ClientId) -> bool {
        let mut removed = false;
        for (destination, queue) in self.queues.read().iter() {
            if queue.remove(id) {
                self.positions.invalidate(destination);
                removed = true;
            }
        }
        if removed {
            self.record_queued();
        }
        removed
    }

    /// Returns the client's destination.
    pub fn destination(&self, id: ClientId) -> Option<String> {
        self.states.destination(id)
    }

    /// Returns the queue of a destination.
    pub fn queue(&self, destination: &str) -> Option<Arc<TieredQueue>> {
        self.queues.read().get(destination).cloned()
    }

    /// Names of every destination that ever had a queue, in lexical order.
    pub fn destinations(&self) -> Vec<String> {
        self.queues.read().keys().cloned().collect()
    }

    /// Selects the next live client of the destination's queue.
    ///
    /// The client stays queued.
    pub fn next_candidate(&self, destination: &str) -> Option<ClientId> {
        let queue = self.queue(destination)?;
        let mut stale = Vec::new();
        let candidate = queue.next_active(self.liveness(&mut stale));
        self.forget(destination, &stale);
        candidate
    }

    /// Selects the first live client allowed past maintenance.
    pub fn next_maintenance_candidate(
        &self,
        destination: &str,
        oracle: &dyn MaintenanceOracle,
    ) -> Option<ClientId> {
        let queue = self.queue(destination)?;
        let mut stale = Vec::new();
        let candidate = queue.find_first_matching(self.liveness(&mut stale), |id| {
            self.directory
                .resolve(id)
                .is_some_and(|client| oracle.is_bypass_eligible(&*client, destination))
        });
        self.forget(destination, &stale);
        candidate
    }

    /// Returns the client's 1-based queue position.
    ///
    /// `None` if the client is not registered, not queued, or no longer live.
    pub fn queue_position(&self, id: ClientId) -> Option<usize> {
        let destination = self.states.destination(id)?;
        self.positions(&destination).get(&id).copied()
    }

    /// Returns the destination's position listing.
    pub fn positions(&self, destination: &str) -> Positions {
        let Some(queue) = self.queue(destination) else {
            return Positions::default();
        };
        let mut stale = Vec::new();
        let positions = self
            .positions
            .positions(destination, &queue, self.liveness(&mut stale));
        self.forget(destination, &stale);
        positions
    }

    /// Drops stale entries from every queue and stale records from the state
    /// table. Returns how many queue entries were evicted.
    pub fn prune_inactive(&self) -> usize {
        let mut evicted = 0;
        for (destination, queue) in self.queues.read().iter() {
            let removed = queue.prune_inactive(|id| self.directory.is_live(id));
            if removed > 0 {
                self.positions.invalidate(destination);
                evicted += removed;
            }
        }
        let forgotten = self.states.prune(|id| self.directory.is_live(id));

        #[cfg(feature = "tracing")]
        {
            if evicted > 0 || forgotten > 0 {
                tracing::debug!(evicted, forgotten, "pruned stale clients");
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = forgotten;

        if evicted > 0 {
            self.record_queued();
        }
        evicted
    }

    /// Number of destinations with at least one queued client.
    pub fn queued_destination_count(&self) -> usize {
        self.prune_inactive();
        self.queues
            .read()
            .values()
            .filter(|queue| !queue.is_empty())
            .count()
    }

    /// Number of queued clients across all destinations.
    pub fn queued_client_count(&self) -> usize {
        self.prune_inactive();
        self.total_queued()
    }

    /// Queued client count per non-empty destination.
    pub fn queued_counts_by_destination(&self) -> BTreeMap<String, usize> {
        self.prune_inactive();
        self.queues
            .read()
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(destination, queue)| (destination.clone(), queue.len()))
            .collect()
    }

    /// Lists the destination's live queued clients in dequeue order.
    pub fn list_queue(&self, destination: &str) -> Vec<QueuedClientView> {
        let Some(queue) = self.queue(destination) else {
            return Vec::new();
        };
        let mut stale = Vec::new();
        let members = queue.live_members(self.liveness(&mut stale));
        self.forget(destination, &stale);

        members
            .into_iter()
            .filter_map(|id| self.directory.resolve(id))
            .map(|client| QueuedClientView {
                id: client.id(),
                display_name: client.display_name().to_string(),
            })
            .collect()
    }

    /// Clients currently in the waiting area, in arrival order.
    pub fn waiting(&self) -> Vec<SharedClient> {
        self.directory.waiting()
    }

    /// Delivers a notification through the configured sink.
    pub fn notify(&self, client: &dyn Client, notification: Notification) {
        self.sink.notify(client, notification);
    }

    /// The host's client directory.
    pub fn directory(&self) -> &Arc<dyn ClientDirectory> {
        &self.directory
    }

    /// The selected capability providers.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The per-client connection records.
    pub fn states(&self) -> &Arc<ConnectionStates> {
        &self.states
    }

    /// The position cache.
    pub fn position_cache(&self) -> &PositionCache {
        &self.positions
    }

    /// Returns `true` if clients are queued per destination.
    pub fn queue_enabled(&self) -> bool {
        self.queue_enabled
    }

    fn queue_or_create(&self, destination: &str) -> Arc<TieredQueue> {
        if let Some(queue) = self.queue(destination) {
            return queue;
        }
        Arc::clone(
            self.queues
                .write()
                .entry(destination.to_string())
                .or_default(),
        )
    }

    fn liveness<'a>(&'a self, stale: &'a mut Vec<ClientId>) -> impl FnMut(ClientId) -> bool + 'a {
        move |id| {
            let live = self.directory.is_live(id);
            if !live {
                stale.push(id);
            }
            live
        }
    }

    fn forget(&self, destination: &str, stale: &[ClientId]) {
        if stale.is_empty() {
            return;
        }
        for id in stale {
            self.states.remove_all(*id);
        }
        self.positions.invalidate(destination);
        self.record_queued();
    }

    fn total_queued(&self) -> usize {
        self.queues.read().values().map(|queue| queue.len()).sum()
    }

    fn record_queued(&self) {
        #[cfg(feature = "metrics")]
        gauge!("waitroom_queued_clients").set(self.total_queued() as f64);
    }
}

impl fmt::Debug for WaitingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitingArea")
            .field("queue_enabled", &self.queue_enabled)
            .field("destinations", &self.destinations())
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

/// Builder for [`WaitingArea`].
pub struct WaitingAreaBuilder {
    directory: Option<Arc<dyn ClientDirectory>>,
    capabilities: Capabilities,
    sink: Option<Arc<dyn NotificationSink>>,
    tier_policy: TierPolicy,
    queue_enabled: bool,
    position_ttl: Duration,
}

impl WaitingAreaBuilder {
    /// Creates a builder with defaults.
    pub fn new() -> Self {
        Self {
            directory: None,
            capabilities: Capabilities::default(),
            sink: None,
            tier_policy: TierPolicy::default(),
            queue_enabled: true,
            position_ttl: DEFAULT_POSITION_TTL,
        }
    }

    /// Sets the host's client directory. Required.
    pub fn directory(mut self, directory: Arc<dyn ClientDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the capability providers.
    ///
    /// Default: no maintenance, no blocker, no-op auth gate
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the notification sink.
    ///
    /// Default: notifications are discarded
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the tier policy.
    ///
    /// Default: [`TierPolicy::default`]
    pub fn tier_policy(mut self, policy: TierPolicy) -> Self {
        self.tier_policy = policy;
        self
    }

    /// Enables or disables per-destination queueing.
    ///
    /// With queueing off, clients are only registered and the dispatcher
    /// serves the waiting area in arrival order.
    ///
    /// Default: true
    pub fn queue_enabled(mut self, enabled: bool) -> Self {
        self.queue_enabled = enabled;
        self
    }

    /// Sets how long a position listing may be served from cache.
    ///
    /// Default: 1 second
    pub fn position_ttl(mut self, ttl: Duration) -> Self {
        self.position_ttl = ttl;
        self
    }

    /// Builds the waiting area.
    pub fn build(self) -> Result<WaitingArea, WaitroomError> {
        let directory = self
            .directory
            .ok_or(WaitroomError::MissingComponent("directory"))?;
        if self.position_ttl.is_zero() {
            return Err(WaitroomError::InvalidConfig {
                field: "position_ttl",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(WaitingArea {
            directory,
            capabilities: self.capabilities,
            sink: self.sink.unwrap_or_else(|| Arc::new(DiscardSink)),
            tier_policy: self.tier_policy,
            queue_enabled: self.queue_enabled,
            queues: RwLock::new(BTreeMap::new()),
            states: Arc::new(ConnectionStates::new()),
            positions: PositionCache::new(self.position_ttl),
        })
    }
}

impl Default for WaitingAreaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

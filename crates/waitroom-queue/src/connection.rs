//! Per-client connection lifecycle state.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use waitroom_core::{ClientId, MessageKey};

/// Policy issue recorded after a classified connect rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IssueKind {
    /// The destination banned the client.
    Banned,
    /// The client is not whitelisted on the destination.
    NotWhitelisted,
}

impl IssueKind {
    /// Returns the message key used to tell the client about the issue.
    pub fn message_key(&self) -> MessageKey {
        match self {
            IssueKind::Banned => MessageKey::IssueBanned,
            IssueKind::NotWhitelisted => MessageKey::IssueNotWhitelisted,
        }
    }

    /// Returns the lowercase issue name.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Banned => "banned",
            IssueKind::NotWhitelisted => "not_whitelisted",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state of one registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    destination: String,
    connecting: bool,
    issue: Option<IssueKind>,
    attempt: u64,
}

impl ConnectionRecord {
    fn new(destination: String) -> Self {
        Self {
            destination,
            connecting: false,
            issue: None,
            attempt: 0,
        }
    }

    /// Destination the client is waiting for.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether a reconnect attempt is in flight.
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    /// Recorded policy issue, if any.
    pub fn issue(&self) -> Option<IssueKind> {
        self.issue
    }
}

/// Why an attempt could not be started for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginError {
    /// The client has no connection record.
    NotRegistered,
    /// An attempt is already in flight.
    InFlight,
}

/// Connection records of every client in the waiting area.
///
/// Each operation takes the map lock for a single lookup or update, so calls
/// from the dispatch loop and from attempt completions never interleave within
/// a record. Updates to unregistered clients are no-ops.
///
/// Every attempt is stamped with a number unique to the table. A guard only
/// acts on a record still carrying its stamp, so an attempt that outlives its
/// client's removal never touches a later registration of the same client.
#[derive(Default)]
pub struct ConnectionStates {
    records: Mutex<HashMap<ClientId, ConnectionRecord>>,
    attempts: AtomicU64,
}

impl ConnectionStates {
    /// Creates an empty state table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the client for a destination.
    ///
    /// Returns `false` and leaves the record untouched if the client is
    /// already registered.
    pub fn register(&self, id: ClientId, destination: impl Into<String>) -> bool {
        let mut records = self.records.lock();
        if records.contains_key(&id) {
            return false;
        }
        records.insert(id, ConnectionRecord::new(destination.into()));
        true
    }

    /// Returns `true` if the client has a record.
    pub fn is_registered(&self, id: ClientId) -> bool {
        self.records.lock().contains_key(&id)
    }

    /// Returns the client's destination.
    pub fn destination(&self, id: ClientId) -> Option<String> {
        self.records
            .lock()
            .get(&id)
            .map(|record| record.destination.clone())
    }

    /// Returns a copy of the client's record.
    pub fn record(&self, id: ClientId) -> Option<ConnectionRecord> {
        self.records.lock().get(&id).cloned()
    }

    /// Sets the connecting flag.
    pub fn set_connecting(&self, id: ClientId, connecting: bool) {
        if let Some(record) = self.records.lock().get_mut(&id) {
            record.connecting = connecting;
        }
    }

    /// Returns `true` while an attempt is in flight for the client.
    pub fn is_connecting(&self, id: ClientId) -> bool {
        self.records
            .lock()
            .get(&id)
            .is_some_and(|record| record.connecting)
    }

    /// Atomically checks that no attempt is in flight and sets the flag.
    ///
    /// The returned guard clears the flag when dropped.
    pub fn try_begin_attempt(self: &Arc<Self>, id: ClientId) -> Result<ConnectingGuard, BeginError> {
        let mut records = self.records.lock();
        let record = records.get_mut(&id).ok_or(BeginError::NotRegistered)?;
        if record.connecting {
            return Err(BeginError::InFlight);
        }
        record.connecting = true;
        record.attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

        Ok(ConnectingGuard {
            states: Arc::clone(self),
            id,
            attempt: record.attempt,
            destination: record.destination.clone(),
        })
    }

    fn holds_attempt(&self, id: ClientId, attempt: u64) -> bool {
        self.records
            .lock()
            .get(&id)
            .is_some_and(|record| record.connecting && record.attempt == attempt)
    }

    fn finish_attempt(&self, id: ClientId, attempt: u64) {
        if let Some(record) = self.records.lock().get_mut(&id) {
            if record.attempt == attempt {
                record.connecting = false;
            }
        }
    }

    /// Records a policy issue.
    pub fn mark_issue(&self, id: ClientId, kind: IssueKind) {
        if let Some(record) = self.records.lock().get_mut(&id) {
            record.issue = Some(kind);
        }
    }

    /// Returns the client's policy issue.
    pub fn issue(&self, id: ClientId) -> Option<IssueKind> {
        self.records.lock().get(&id).and_then(|record| record.issue)
    }

    /// Clears the client's policy issue.
    pub fn clear_issue(&self, id: ClientId) {
        if let Some(record) = self.records.lock().get_mut(&id) {
            record.issue = None;
        }
    }

    /// Removes registration, connecting flag and issue in one step.
    pub fn remove_all(&self, id: ClientId) -> Option<ConnectionRecord> {
        self.records.lock().remove(&id)
    }

    /// Removes every record whose client fails `is_live`.
    pub fn prune(&self, mut is_live: impl FnMut(ClientId) -> bool) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|id, _| is_live(*id));
        before - records.len()
    }

    /// Identifiers of every registered client.
    pub fn ids(&self) -> Vec<ClientId> {
        self.records.lock().keys().copied().collect()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl fmt::Debug for ConnectionStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStates")
            .field("len", &self.len())
            .finish()
    }
}

/// Holds a client's connecting flag for the duration of an attempt.
///
/// Dropping the guard clears the flag. If the client was removed in the
/// meantime, or removed and registered again, the release is a no-op.
pub struct ConnectingGuard {
    states: Arc<ConnectionStates>,
    id: ClientId,
    attempt: u64,
    destination: String,
}

impl ConnectingGuard {
    /// The client holding the flag.
    pub fn client(&self) -> ClientId {
        self.id
    }

    /// The destination recorded when the attempt began.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The state table the flag lives in.
    pub fn states(&self) -> &Arc<ConnectionStates> {
        &self.states
    }

    /// Returns `true` while the client's record still belongs to this attempt.
    pub fn is_current(&self) -> bool {
        self.states.holds_attempt(self.id, self.attempt)
    }
}

impl Drop for ConnectingGuard {
    fn drop(&mut self) {
        self.states.finish_attempt(self.id, self.attempt);
    }
}

impl fmt::Debug for ConnectingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectingGuard")
            .field("client", &self.id)
            .field("attempt", &self.attempt)
            .field("destination", &self.destination)
            .finish()
    }
}

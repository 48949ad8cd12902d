//! In-memory reconnect blocker with lazy expiry.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use waitroom_core::{ClientId, ReconnectBlocker};

/// Default lifetime of a block placed through [`ReconnectBlocker::block`].
pub const DEFAULT_BLOCK_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct BlockEntry {
    // `None` when the lifetime does not fit in an `Instant`; such a block
    // lasts until it is lifted.
    until: Option<Instant>,
    reason: String,
}

/// Time-bounded reconnect blocks held in memory.
///
/// Expired blocks are dropped the next time they are looked at.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use waitroom_core::{ClientId, ReconnectBlocker};
/// use waitroom_reconnect::InMemoryBlocker;
///
/// let blocker = InMemoryBlocker::new();
/// let client = ClientId::random();
///
/// blocker.block(client, "auth");
/// assert!(blocker.is_blocked(client));
///
/// blocker.unblock(client);
/// assert!(!blocker.is_blocked(client));
/// ```
#[derive(Debug)]
pub struct InMemoryBlocker {
    default_ttl: Duration,
    entries: Mutex<HashMap<ClientId, BlockEntry>>,
}

impl InMemoryBlocker {
    /// Creates a blocker whose blocks last [`DEFAULT_BLOCK_TTL`].
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_BLOCK_TTL)
    }

    /// Creates a blocker with a custom default block lifetime.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks the client for `ttl`, replacing any existing block.
    ///
    /// A `ttl` too large to represent blocks until [`ReconnectBlocker::unblock`].
    pub fn block_for(&self, id: ClientId, reason: &str, ttl: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(client = %id, reason, ?ttl, "reconnect blocked");

        self.entries.lock().insert(
            id,
            BlockEntry {
                until: Instant::now().checked_add(ttl),
                reason: reason.to_string(),
            },
        );
    }

    /// Returns the reason of an active block.
    pub fn reason(&self, id: ClientId) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(&id) {
            Some(entry) if entry.until.map_or(true, |until| Instant::now() < until) => {
                Some(entry.reason.clone())
            }
            Some(_) => {
                entries.remove(&id);
                None
            }
            None => None,
        }
    }

    /// Number of stored blocks, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for InMemoryBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectBlocker for InMemoryBlocker {
    fn block(&self, id: ClientId, reason: &str) {
        self.block_for(id, reason, self.default_ttl);
    }

    fn unblock(&self, id: ClientId) {
        self.entries.lock().remove(&id);
    }

    fn is_blocked(&self, id: ClientId) -> bool {
        self.reason(id).is_some()
    }
}

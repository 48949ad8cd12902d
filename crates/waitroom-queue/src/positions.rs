//! Version-gated cache of per-destination position listings.

use crate::TieredQueue;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::collections::HashMap as PositionMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use waitroom_core::ClientId;

/// Shared position listing: client to 1-based position.
pub type Positions = Arc<PositionMap<ClientId, usize>>;

/// Default lifetime of a cached listing.
pub const DEFAULT_POSITION_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct CachedPositions {
    version: u64,
    expires_at: Instant,
    positions: Positions,
}

impl CachedPositions {
    fn is_valid(&self, version: u64, now: Instant) -> bool {
        self.version == version && now < self.expires_at
    }
}

/// Short-lived cache of full position listings, one entry per destination.
///
/// An entry is served only while its version matches the queue's current
/// version and its TTL has not run out; otherwise the listing is rebuilt.
#[derive(Debug)]
pub struct PositionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPositions>>,
}

impl PositionCache {
    /// Creates a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the position listing of the destination's queue.
    pub fn positions(
        &self,
        destination: &str,
        queue: &TieredQueue,
        is_live: impl FnMut(ClientId) -> bool,
    ) -> Positions {
        let now = Instant::now();
        if let Some(cached) = self.entries.lock().get(destination) {
            if cached.is_valid(queue.version(), now) {
                return Arc::clone(&cached.positions);
            }
        }

        // Built outside the cache lock. The version comes from the same scan
        // as the listing, so a mutation racing the build leaves an entry that
        // fails validation instead of one that looks current.
        let (version, map) = queue.versioned_position_map(is_live);
        let positions: Positions = Arc::new(map);

        let mut entries = self.entries.lock();
        let newer_cached = entries
            .get(destination)
            .is_some_and(|cached| cached.version > version);
        if !newer_cached {
            entries.insert(
                destination.to_string(),
                CachedPositions {
                    version,
                    expires_at: Instant::now() + self.ttl,
                    positions: Arc::clone(&positions),
                },
            );
        }

        positions
    }

    /// Drops the cached listing of a destination.
    pub fn invalidate(&self, destination: &str) {
        self.entries.lock().remove(destination);
    }

    /// Drops every cached listing.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of cached listings, valid or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for PositionCache {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION_TTL)
    }
}

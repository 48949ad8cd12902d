//! Per-destination queue with bypass, priority and normal tiers.

use crate::Tier;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap as PositionMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use waitroom_core::ClientId;

#[derive(Default)]
struct Lanes {
    tiers: [Vec<ClientId>; 3],
    index: HashMap<ClientId, Tier>,
}

impl Lanes {
    fn remove(&mut self, id: ClientId) -> Option<Tier> {
        let tier = self.index.remove(&id)?;
        let lane = &mut self.tiers[tier.index()];
        if let Some(pos) = lane.iter().position(|queued| *queued == id) {
            lane.remove(pos);
        }
        Some(tier)
    }

    fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.tiers.iter().flatten().copied()
    }
}

struct Scan {
    selected: Option<ClientId>,
    evicted: usize,
    // Version of the lanes as the scan left them, read under the scan's lock.
    version: u64,
}

/// Ordered membership of one destination's queue.
///
/// A client occupies at most one tier. Every structural change (enqueue,
/// remove, eviction of stale entries) bumps a monotonic version counter, which
/// lets callers detect changes without diffing.
///
/// Scans take an `is_live` predicate. Entries it rejects are stale: they are
/// evicted in place and skipped, so no separate reaper pass is needed.
///
/// # Example
///
/// ```rust
/// use waitroom_core::ClientId;
/// use waitroom_queue::{Tier, TieredQueue};
///
/// let queue = TieredQueue::new();
/// let normal = ClientId::random();
/// let vip = ClientId::random();
///
/// queue.enqueue(normal, Tier::Normal);
/// queue.enqueue(vip, Tier::Bypass);
///
/// assert_eq!(queue.next_active(|_| true), Some(vip));
/// ```
pub struct TieredQueue {
    lanes: RwLock<Lanes>,
    version: AtomicU64,
}

impl TieredQueue {
    /// Creates an empty queue at version 0.
    pub fn new() -> Self {
        Self {
            lanes: RwLock::new(Lanes::default()),
            version: AtomicU64::new(0),
        }
    }

    /// Adds the client to the tail of the tier.
    ///
    /// A client already queued in another tier is moved, losing its FIFO
    /// position. Returns `false` if the client already sits in this tier.
    pub fn enqueue(&self, id: ClientId, tier: Tier) -> bool {
        let mut lanes = self.lanes.write();
        match lanes.index.get(&id).copied() {
            Some(current) if current == tier => return false,
            Some(_) => {
                lanes.remove(id);
            }
            None => {}
        }

        lanes.tiers[tier.index()].push(id);
        lanes.index.insert(id, tier);
        self.bump();
        true
    }

    /// Removes the client from whichever tier holds it.
    pub fn remove(&self, id: ClientId) -> bool {
        let mut lanes = self.lanes.write();
        let removed = lanes.remove(id).is_some();
        if removed {
            self.bump();
        }
        removed
    }

    /// Returns the first live client in tier order, without removing it.
    pub fn next_active(&self, is_live: impl FnMut(ClientId) -> bool) -> Option<ClientId> {
        self.scan(is_live, |_| true).selected
    }

    /// Returns the first live client for which `predicate` holds.
    ///
    /// The predicate only sees live entries.
    pub fn find_first_matching(
        &self,
        is_live: impl FnMut(ClientId) -> bool,
        predicate: impl FnMut(ClientId) -> bool,
    ) -> Option<ClientId> {
        self.scan(is_live, predicate).selected
    }

    /// Returns every live client in tier order.
    pub fn live_members(&self, is_live: impl FnMut(ClientId) -> bool) -> Vec<ClientId> {
        self.versioned_members(is_live).1
    }

    fn versioned_members(&self, is_live: impl FnMut(ClientId) -> bool) -> (u64, Vec<ClientId>) {
        let mut members = Vec::new();
        let scan = self.scan(is_live, |id| {
            members.push(id);
            false
        });
        (scan.version, members)
    }

    /// Assigns 1-based positions to live clients, bypass tier first.
    pub fn build_position_map(
        &self,
        is_live: impl FnMut(ClientId) -> bool,
    ) -> PositionMap<ClientId, usize> {
        self.versioned_position_map(is_live).1
    }

    /// Like [`build_position_map`](Self::build_position_map), paired with the
    /// version the listing reflects.
    ///
    /// The version is read under the same lock as the scan, so a concurrent
    /// enqueue or removal always lands on a later version than the listing.
    pub fn versioned_position_map(
        &self,
        is_live: impl FnMut(ClientId) -> bool,
    ) -> (u64, PositionMap<ClientId, usize>) {
        let (version, members) = self.versioned_members(is_live);
        (version, members.into_iter().zip(1..).collect())
    }

    /// Evicts every stale entry and returns how many were removed.
    pub fn prune_inactive(&self, is_live: impl FnMut(ClientId) -> bool) -> usize {
        self.scan(is_live, |_| false).evicted
    }

    /// Returns the tier the client is queued in.
    pub fn tier_of(&self, id: ClientId) -> Option<Tier> {
        self.lanes.read().index.get(&id).copied()
    }

    /// Returns `true` if the client is queued.
    pub fn contains(&self, id: ClientId) -> bool {
        self.lanes.read().index.contains_key(&id)
    }

    /// Returns all entries in tier order, stale ones included.
    pub fn members(&self) -> Vec<(ClientId, Tier)> {
        let lanes = self.lanes.read();
        Tier::ALL
            .iter()
            .flat_map(|tier| lanes.tiers[tier.index()].iter().map(move |id| (*id, *tier)))
            .collect()
    }

    /// Number of queued clients.
    pub fn len(&self) -> usize {
        self.lanes.read().index.len()
    }

    /// Returns `true` if nobody is queued.
    pub fn is_empty(&self) -> bool {
        self.lanes.read().index.is_empty()
    }

    /// Current structural version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    // Walks tiers in order under an upgradable read; only takes the write lock
    // if stale entries were found, and bumps the version once for all of them.
    fn scan(
        &self,
        mut is_live: impl FnMut(ClientId) -> bool,
        mut select: impl FnMut(ClientId) -> bool,
    ) -> Scan {
        let lanes = self.lanes.upgradable_read();
        let mut stale = Vec::new();
        let mut selected = None;

        for id in lanes.iter() {
            if !is_live(id) {
                stale.push(id);
                continue;
            }
            if select(id) {
                selected = Some(id);
                break;
            }
        }

        let version = if stale.is_empty() {
            let version = self.version();
            drop(lanes);
            version
        } else {
            let mut lanes = RwLockUpgradableReadGuard::upgrade(lanes);
            for id in &stale {
                lanes.remove(*id);
            }
            self.bump();

            #[cfg(feature = "tracing")]
            tracing::trace!(evicted = stale.len(), "evicted stale queue entries");

            let version = self.version();
            drop(lanes);
            version
        };

        Scan {
            selected,
            evicted: stale.len(),
            version,
        }
    }
}

impl Default for TieredQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TieredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredQueue")
            .field("len", &self.len())
            .field("version", &self.version())
            .finish()
    }
}

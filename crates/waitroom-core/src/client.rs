//! Client identity and the host-side directory of connected clients.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable identifier of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientId(Uuid);

impl ClientId {
    /// Wraps an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ClientId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A connectable handle to a client, supplied by the host.
///
/// Implementations must be cheap to query; the queue calls these methods
/// while holding a per-destination lock.
pub trait Client: Send + Sync {
    /// Returns the client's stable identifier.
    fn id(&self) -> ClientId;

    /// Returns the name shown in queue listings.
    fn display_name(&self) -> &str;

    /// Returns `true` if the client holds the given permission node.
    fn has_permission(&self, permission: &str) -> bool;

    /// Returns `true` while the client's connection is still usable.
    fn is_active(&self) -> bool {
        true
    }
}

/// Shared client handle.
pub type SharedClient = Arc<dyn Client>;

impl fmt::Debug for dyn Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id())
            .field("display_name", &self.display_name())
            .finish()
    }
}

/// Identity and liveness directory of the host.
///
/// Every stale-pruning decision goes through [`ClientDirectory::resolve`]: a
/// client that no longer resolves, or resolves to an inactive handle, is
/// treated as gone.
pub trait ClientDirectory: Send + Sync {
    /// Looks up a connected client.
    fn resolve(&self, id: ClientId) -> Option<SharedClient>;

    /// Returns the clients currently sitting in the waiting area, in arrival order.
    fn waiting(&self) -> Vec<SharedClient>;

    /// Resolves a client and keeps it only if it is still active.
    fn resolve_live(&self, id: ClientId) -> Option<SharedClient> {
        self.resolve(id).filter(|client| client.is_active())
    }

    /// Returns `true` if the client resolves to an active handle.
    fn is_live(&self, id: ClientId) -> bool {
        self.resolve_live(id).is_some()
    }
}

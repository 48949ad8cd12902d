//! Capability interfaces for optional external providers.
//!
//! Hosts that run a maintenance system or an authentication layer plug them in
//! through these traits. Every capability has a no-op default, so a waitroom
//! assembled without any provider behaves as if nothing is ever under
//! maintenance and nobody is ever blocked.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waitroom_core::{Capabilities, MaintenanceOracle};
//!
//! struct Closed;
//!
//! impl MaintenanceOracle for Closed {
//!     fn is_under_maintenance(&self, destination: &str) -> bool {
//!         destination == "creative"
//!     }
//! }
//!
//! let caps = Capabilities::builder().maintenance(Arc::new(Closed)).build();
//! assert!(caps.maintenance().is_under_maintenance("creative"));
//! assert_eq!(caps.auth_gate().name(), "noop");
//! ```

use crate::{Client, ClientId};
use std::fmt;
use std::sync::Arc;

/// Reports whether a destination is closed for maintenance.
pub trait MaintenanceOracle: Send + Sync {
    /// Returns `true` if the destination is under maintenance.
    fn is_under_maintenance(&self, destination: &str) -> bool;

    /// Returns `true` if the client is on the maintenance allow-list.
    fn is_allow_listed(&self, _client: &dyn Client, _destination: &str) -> bool {
        false
    }

    /// Returns `true` if the client may join the destination during maintenance.
    ///
    /// The default accepts the `maintenance.admin`, `maintenance.bypass` and
    /// `maintenance.singleserver.bypass.<destination>` permissions, or
    /// allow-list membership.
    fn is_bypass_eligible(&self, client: &dyn Client, destination: &str) -> bool {
        client.has_permission("maintenance.admin")
            || client.has_permission("maintenance.bypass")
            || client.has_permission(&format!("maintenance.singleserver.bypass.{destination}"))
            || self.is_allow_listed(client, destination)
    }
}

/// Maintenance oracle used when no maintenance provider is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMaintenance;

impl MaintenanceOracle for NoMaintenance {
    fn is_under_maintenance(&self, _destination: &str) -> bool {
        false
    }
}

/// Gate that can forbid reconnect attempts for a client.
pub trait ReconnectBlocker: Send + Sync {
    /// Blocks reconnect attempts for the client.
    fn block(&self, id: ClientId, reason: &str);

    /// Lifts any block on the client.
    fn unblock(&self, id: ClientId);

    /// Returns `true` if reconnect attempts are currently forbidden.
    fn is_blocked(&self, id: ClientId) -> bool;
}

/// Blocker used when nothing ever blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBlocker;

impl ReconnectBlocker for NoopBlocker {
    fn block(&self, _id: ClientId, _reason: &str) {}

    fn unblock(&self, _id: ClientId) {}

    fn is_blocked(&self, _id: ClientId) -> bool {
        false
    }
}

/// Integration point for an authentication layer.
///
/// A gate usually blocks joining clients through a [`ReconnectBlocker`] and
/// unblocks them once they authenticate.
pub trait AuthGate: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns `true` if the backing provider was detected.
    fn is_active(&self) -> bool;

    /// Called when a client enters the waiting area.
    fn on_client_join(&self, client: &dyn Client);

    /// Releases provider resources.
    fn shutdown(&self) {}
}

/// Auth gate used when no provider is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthGate;

impl AuthGate for NoopAuthGate {
    fn name(&self) -> &str {
        "noop"
    }

    fn is_active(&self) -> bool {
        true
    }

    fn on_client_join(&self, _client: &dyn Client) {}
}

/// Registry of the capability providers selected at startup.
#[derive(Clone)]
pub struct Capabilities {
    maintenance: Arc<dyn MaintenanceOracle>,
    blocker: Arc<dyn ReconnectBlocker>,
    auth: Arc<dyn AuthGate>,
}

impl Capabilities {
    /// Creates a builder with no-op providers.
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Returns the maintenance oracle.
    pub fn maintenance(&self) -> &Arc<dyn MaintenanceOracle> {
        &self.maintenance
    }

    /// Returns the reconnect blocker.
    pub fn blocker(&self) -> &Arc<dyn ReconnectBlocker> {
        &self.blocker
    }

    /// Returns the selected auth gate.
    pub fn auth_gate(&self) -> &Arc<dyn AuthGate> {
        &self.auth
    }

    /// Forwards a joining client to the selected auth gate.
    pub fn on_client_join(&self, client: &dyn Client) {
        self.auth.on_client_join(client);
    }

    /// Returns `true` if the blocker currently forbids reconnecting the client.
    pub fn is_auth_blocked(&self, id: ClientId) -> bool {
        self.blocker.is_blocked(id)
    }

    /// Shuts down the selected auth gate.
    pub fn shutdown(&self) {
        self.auth.shutdown();
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("auth_gate", &self.auth.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Capabilities`].
#[derive(Default)]
pub struct CapabilitiesBuilder {
    maintenance: Option<Arc<dyn MaintenanceOracle>>,
    blocker: Option<Arc<dyn ReconnectBlocker>>,
    auth_candidates: Vec<Arc<dyn AuthGate>>,
}

impl CapabilitiesBuilder {
    /// Sets the maintenance oracle.
    ///
    /// Default: [`NoMaintenance`]
    pub fn maintenance(mut self, oracle: Arc<dyn MaintenanceOracle>) -> Self {
        self.maintenance = Some(oracle);
        self
    }

    /// Sets the reconnect blocker.
    ///
    /// Default: [`NoopBlocker`]
    pub fn blocker(mut self, blocker: Arc<dyn ReconnectBlocker>) -> Self {
        self.blocker = Some(blocker);
        self
    }

    /// Adds an auth gate candidate. Candidates are tried in registration order.
    pub fn auth_gate(mut self, gate: Arc<dyn AuthGate>) -> Self {
        self.auth_candidates.push(gate);
        self
    }

    /// Builds the registry, selecting the first active auth gate.
    pub fn build(self) -> Capabilities {
        let auth = self
            .auth_candidates
            .into_iter()
            .find(|gate| gate.is_active())
            .unwrap_or_else(|| Arc::new(NoopAuthGate));

        #[cfg(feature = "tracing")]
        tracing::info!(auth_gate = auth.name(), "capabilities selected");

        Capabilities {
            maintenance: self.maintenance.unwrap_or_else(|| Arc::new(NoMaintenance)),
            blocker: self.blocker.unwrap_or_else(|| Arc::new(NoopBlocker)),
            auth,
        }
    }
}

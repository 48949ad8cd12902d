//! A holding area that queues clients per destination and moves them back
//! once the destination can take them.
//!
//! Clients that land in the waiting area are queued for the destination they
//! came from, ordered by tier (bypass, priority, normal) and arrival. A
//! periodic dispatcher probes each destination and reconnects the head of its
//! queue; a notifier keeps waiting clients informed of their position.
//!
//! The host supplies the collaborators as trait objects or closures:
//!
//! - [`ClientDirectory`](core::ClientDirectory): who is connected and where
//! - [`DestinationProbe`](core::DestinationProbe): is the destination up and
//!   does it have room
//! - a [`tower::Service`] taking [`ConnectRequest`](core::ConnectRequest)s: the
//!   connect transport
//! - [`NotificationSink`](core::NotificationSink): message delivery
//! - optional [`Capabilities`](core::Capabilities): maintenance oracle,
//!   reconnect blocker and auth gate
//!
//! # Crates
//!
//! - [`core`]: identifiers, collaborator traits, events, errors
//! - [`queue`]: tiered queues, position cache, connection states, waiting area
//! - [`reconnect`]: the reconnect protocol
//! - [`dispatch`]: the dispatch loop and queue notifier
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waitroom::core::{BoxError, ConnectRequest, ConnectResult, ProbeReport};
//! use waitroom::dispatch::DispatchConfig;
//! use waitroom::queue::WaitingArea;
//! use waitroom::reconnect::ReconnectConfig;
//! use waitroom::Waitroom;
//! # use waitroom::core::{ClientDirectory, ClientId, SharedClient};
//! # struct Proxy;
//! # impl ClientDirectory for Proxy {
//! #     fn resolve(&self, _: ClientId) -> Option<SharedClient> { None }
//! #     fn waiting(&self) -> Vec<SharedClient> { Vec::new() }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let area = WaitingArea::builder().directory(Arc::new(Proxy)).build()?;
//!
//! let waitroom = Waitroom::new(
//!     area,
//!     |_destination: &str| async { Ok(Some(ProbeReport::online(100, 12))) },
//!     tower::service_fn(|_req: ConnectRequest| async {
//!         Ok::<_, BoxError>(ConnectResult::success())
//!     }),
//!     ReconnectConfig::default(),
//!     DispatchConfig::default(),
//! );
//!
//! waitroom.start().await;
//! // host event handlers call `client_joined` / `client_left`
//! waitroom.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tower::Service;
use waitroom_core::{BoxError, Client, ClientId, ConnectRequest, ConnectResult, DestinationProbe};
use waitroom_dispatch::{DispatchConfig, Dispatcher, QueueNotifier};
use waitroom_queue::{Placement, WaitingArea};
use waitroom_reconnect::{ReconnectConfig, ReconnectProtocol};

pub use waitroom_core as core;
pub use waitroom_dispatch as dispatch;
pub use waitroom_queue as queue;
pub use waitroom_reconnect as reconnect;

/// The assembled service objects, built once by the host.
pub struct Waitroom<P, C> {
    area: Arc<WaitingArea>,
    protocol: ReconnectProtocol<P, C>,
    dispatcher: Dispatcher<P, C>,
    notifier: QueueNotifier,
}

impl<P, C> Waitroom<P, C>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Clone + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    /// Wires the protocol, dispatcher and notifier around the waiting area.
    pub fn new(
        area: WaitingArea,
        probe: P,
        connector: C,
        reconnect: ReconnectConfig,
        dispatch: DispatchConfig,
    ) -> Self {
        let area = Arc::new(area);
        let protocol = ReconnectProtocol::new(Arc::clone(&area), probe, connector, reconnect);
        let dispatcher = Dispatcher::new(protocol.clone(), dispatch.clone());
        let notifier = QueueNotifier::new(Arc::clone(&area), dispatch);

        Self {
            area,
            protocol,
            dispatcher,
            notifier,
        }
    }

    /// A client entered the waiting area on its way back to `destination`.
    ///
    /// The auth gate sees the client first, so a gate that blocks joining
    /// clients makes this return [`Placement::Blocked`]; place the client again
    /// once the gate lets it through.
    pub fn client_joined(&self, client: &dyn Client, destination: &str) -> Placement {
        self.area.capabilities().on_client_join(client);
        self.area.place(client, destination)
    }

    /// A client left the waiting area.
    pub fn client_left(&self, id: ClientId) -> bool {
        self.area.remove(id)
    }

    /// Starts the dispatcher and the notifier.
    pub async fn start(&self) {
        self.dispatcher.start().await;
        self.notifier.start().await;
    }

    /// Stops the dispatcher and the notifier.
    pub async fn stop(&self) {
        self.dispatcher.stop().await;
        self.notifier.stop().await;
    }

    /// Stops both tasks and shuts the auth gate down.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.area.capabilities().shutdown();
    }

    /// The waiting area.
    pub fn area(&self) -> &Arc<WaitingArea> {
        &self.area
    }

    /// The reconnect protocol, for hosts that trigger attempts themselves.
    pub fn protocol(&self) -> &ReconnectProtocol<P, C> {
        &self.protocol
    }

    /// The dispatch loop.
    pub fn dispatcher(&self) -> &Dispatcher<P, C> {
        &self.dispatcher
    }

    /// The queue notifier.
    pub fn notifier(&self) -> &QueueNotifier {
        &self.notifier
    }
}

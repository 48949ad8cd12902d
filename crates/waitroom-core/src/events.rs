//! Observer hooks for waitroom components.
//!
//! Components report what they did as events. Listeners subscribe either to
//! everything a component emits or to one destination or one client, so a host
//! can watch a single backend without filtering every event itself.

use crate::ClientId;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a waitroom component.
pub trait WaitroomEvent: Send + Sync + fmt::Debug {
    /// Short name of the event kind, e.g. `"AttemptStarted"`.
    fn event_type(&self) -> &'static str;

    /// When the event happened.
    fn timestamp(&self) -> Instant;

    /// Name of the component instance that emitted the event.
    fn source_name(&self) -> &str;

    /// The client the event concerns.
    fn client(&self) -> Option<ClientId> {
        None
    }

    /// The destination the event concerns.
    fn destination(&self) -> Option<&str> {
        None
    }
}

/// Receives events. Implemented for every `Fn(&E)` closure.
pub trait EventListener<E: WaitroomEvent>: Send + Sync {
    /// Called once per matching event.
    fn on_event(&self, event: &E);
}

impl<E, F> EventListener<E> for F
where
    E: WaitroomEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    All,
    Destination(String),
    Client(ClientId),
}

impl Scope {
    fn matches<E: WaitroomEvent>(&self, event: &E) -> bool {
        match self {
            Scope::All => true,
            Scope::Destination(name) => event.destination() == Some(name.as_str()),
            Scope::Client(id) => event.client() == Some(*id),
        }
    }
}

struct Subscription<E: WaitroomEvent> {
    scope: Scope,
    listener: Arc<dyn EventListener<E>>,
}

impl<E: WaitroomEvent> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Scoped listener registrations for one event type.
///
/// # Example
///
/// ```rust
/// use std::time::Instant;
/// use waitroom_core::{EventListeners, WaitroomEvent};
///
/// #[derive(Debug)]
/// struct Moved(&'static str);
///
/// impl WaitroomEvent for Moved {
///     fn event_type(&self) -> &'static str { "Moved" }
///     fn timestamp(&self) -> Instant { Instant::now() }
///     fn source_name(&self) -> &str { "lobby" }
///     fn destination(&self) -> Option<&str> { Some(self.0) }
/// }
///
/// let mut listeners = EventListeners::new();
/// listeners.add_for_destination("survival", |e: &Moved| println!("{e:?}"));
///
/// assert_eq!(listeners.emit(&Moved("survival")), 0);
/// ```
pub struct EventListeners<E: WaitroomEvent> {
    subscriptions: Vec<Subscription<E>>,
}

impl<E: WaitroomEvent> EventListeners<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Subscribes to every event.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Scope::All, listener);
    }

    /// Subscribes to events about one destination.
    pub fn add_for_destination<L>(&mut self, destination: impl Into<String>, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Scope::Destination(destination.into()), listener);
    }

    /// Subscribes to events about one client.
    pub fn add_for_client<L>(&mut self, client: ClientId, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Scope::Client(client), listener);
    }

    fn subscribe<L>(&mut self, scope: Scope, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscriptions.push(Subscription {
            scope,
            listener: Arc::new(listener),
        });
    }

    /// Delivers the event to every matching listener, in registration order.
    ///
    /// A listener that panics is skipped; the others still run. Returns how
    /// many listeners panicked.
    pub fn emit(&self, event: &E) -> usize {
        let mut panicked = 0;
        for subscription in self.subscriptions.iter().filter(|s| s.scope.matches(event)) {
            let delivered = catch_unwind(AssertUnwindSafe(|| subscription.listener.on_event(event)));
            if delivered.is_err() {
                panicked += 1;

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    source = event.source_name(),
                    event = event.event_type(),
                    "event listener panicked"
                );
            }
        }
        panicked
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<E: WaitroomEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
        }
    }
}

impl<E: WaitroomEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: WaitroomEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scopes: Vec<&Scope> = self.subscriptions.iter().map(|s| &s.scope).collect();
        f.debug_struct("EventListeners")
            .field("scopes", &scopes)
            .finish()
    }
}

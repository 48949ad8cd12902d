//! Shared fixtures for the integration tests: an in-memory proxy directory,
//! a recording notification sink, a switchable maintenance oracle, and
//! scripted probe/connect transports.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Ready;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tower::util::BoxCloneService;
use waitroom_core::{
    BoxError, Capabilities, Client, ClientDirectory, ClientId, ConnectRequest, ConnectResult,
    MaintenanceOracle, MessageKey, Notification, ProbeError, ProbeReport, ReconnectBlocker,
    SharedClient,
};
use waitroom_queue::WaitingArea;
use waitroom_reconnect::InMemoryBlocker;

pub type Probe = fn(&str) -> Ready<Result<Option<ProbeReport>, ProbeError>>;
pub type Connector = BoxCloneService<ConnectRequest, ConnectResult, BoxError>;

/// A connected player.
pub struct TestClient {
    id: ClientId,
    name: String,
    perms: Vec<String>,
    active: AtomicBool,
}

impl TestClient {
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl Client for TestClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.perms.iter().any(|p| p == permission)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Clients currently sitting in the waiting area, in arrival order.
#[derive(Default)]
pub struct Directory {
    clients: Mutex<Vec<Arc<TestClient>>>,
}

impl Directory {
    pub fn join(&self, name: &str, perms: &[&str]) -> Arc<TestClient> {
        let client = Arc::new(TestClient {
            id: ClientId::random(),
            name: name.to_string(),
            perms: perms.iter().map(|p| p.to_string()).collect(),
            active: AtomicBool::new(true),
        });
        self.clients.lock().push(Arc::clone(&client));
        client
    }

    pub fn leave(&self, id: ClientId) {
        self.clients.lock().retain(|c| c.id() != id);
    }
}

impl ClientDirectory for Directory {
    fn resolve(&self, id: ClientId) -> Option<SharedClient> {
        self.clients
            .lock()
            .iter()
            .find(|c| c.id() == id)
            .map(|c| Arc::clone(c) as SharedClient)
    }

    fn waiting(&self) -> Vec<SharedClient> {
        self.clients
            .lock()
            .iter()
            .map(|c| Arc::clone(c) as SharedClient)
            .collect()
    }
}

/// Records every notification handed to the sink.
#[derive(Clone, Default)]
pub struct Inbox {
    sent: Arc<Mutex<Vec<(ClientId, Notification)>>>,
}

impl Inbox {
    pub fn record(&self, id: ClientId, notification: Notification) {
        self.sent.lock().push((id, notification));
    }

    pub fn all(&self) -> Vec<(ClientId, Notification)> {
        self.sent.lock().clone()
    }

    pub fn for_client(&self, id: ClientId) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn count(&self, id: ClientId, key: MessageKey) -> usize {
        self.for_client(id).iter().filter(|n| n.key() == key).count()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

/// Maintenance oracle whose closed set can change at runtime.
#[derive(Default)]
pub struct Maintenance {
    closed: Mutex<HashSet<String>>,
    allow_listed: Mutex<HashSet<ClientId>>,
    queries: AtomicUsize,
}

impl Maintenance {
    pub fn close(&self, destination: &str) {
        self.closed.lock().insert(destination.to_string());
    }

    pub fn open(&self, destination: &str) {
        self.closed.lock().remove(destination);
    }

    pub fn allow(&self, id: ClientId) {
        self.allow_listed.lock().insert(id);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl MaintenanceOracle for Maintenance {
    fn is_under_maintenance(&self, destination: &str) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.closed.lock().contains(destination)
    }

    fn is_allow_listed(&self, client: &dyn Client, _destination: &str) -> bool {
        self.allow_listed.lock().contains(&client.id())
    }
}

/// Everything a test needs around one waiting area.
pub struct Fixture {
    pub directory: Arc<Directory>,
    pub inbox: Inbox,
    pub maintenance: Arc<Maintenance>,
    pub blocker: Arc<InMemoryBlocker>,
    pub area: Arc<WaitingArea>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_queue(true)
    }

    pub fn direct() -> Self {
        Self::with_queue(false)
    }

    fn with_queue(queue_enabled: bool) -> Self {
        let directory = Arc::new(Directory::default());
        let inbox = Inbox::default();
        let maintenance = Arc::new(Maintenance::default());
        let blocker = Arc::new(InMemoryBlocker::new());

        let sink = inbox.clone();
        let area = WaitingArea::builder()
            .directory(directory.clone())
            .capabilities(
                Capabilities::builder()
                    .maintenance(maintenance.clone())
                    .blocker(blocker.clone())
                    .build(),
            )
            .sink(Arc::new(move |client: &dyn Client, n: Notification| {
                sink.record(client.id(), n);
            }))
            .queue_enabled(queue_enabled)
            .build()
            .expect("fixture area");

        Self {
            directory,
            inbox,
            maintenance,
            blocker,
            area: Arc::new(area),
        }
    }

    /// Joins a client and places it in the waiting area for `destination`.
    pub fn arrive(&self, name: &str, perms: &[&str], destination: &str) -> Arc<TestClient> {
        let client = self.directory.join(name, perms);
        self.area.place(&*client, destination);
        client
    }

    pub fn block(&self, id: ClientId) {
        self.blocker.block(id, "test");
    }
}

pub fn open_probe(_destination: &str) -> Ready<Result<Option<ProbeReport>, ProbeError>> {
    std::future::ready(Ok(Some(ProbeReport::online(100, 10))))
}

pub fn full_probe(_destination: &str) -> Ready<Result<Option<ProbeReport>, ProbeError>> {
    std::future::ready(Ok(Some(ProbeReport::online(10, 10))))
}

pub fn down_probe(_destination: &str) -> Ready<Result<Option<ProbeReport>, ProbeError>> {
    std::future::ready(Err(ProbeError::Unreachable("connection refused".to_string())))
}

pub fn silent_probe(_destination: &str) -> Ready<Result<Option<ProbeReport>, ProbeError>> {
    std::future::ready(Ok(None))
}

/// Connector that answers every request with `result`, counting calls.
pub fn answering(result: ConnectResult, calls: Arc<AtomicUsize>) -> Connector {
    BoxCloneService::new(tower::service_fn(move |_req: ConnectRequest| {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok::<_, BoxError>(result.clone()))
    }))
}

/// Connector whose transport fails with `message`.
pub fn failing(message: &'static str) -> Connector {
    BoxCloneService::new(tower::service_fn(move |_req: ConnectRequest| {
        std::future::ready(Err::<ConnectResult, BoxError>(message.into()))
    }))
}

/// Connector that always succeeds.
pub fn accepting() -> Connector {
    answering(ConnectResult::success(), Arc::new(AtomicUsize::new(0)))
}

/// Connector that records every request it sees.
pub fn recording(seen: Arc<Mutex<Vec<ConnectRequest>>>) -> Connector {
    BoxCloneService::new(tower::service_fn(move |req: ConnectRequest| {
        seen.lock().push(req);
        std::future::ready(Ok::<_, BoxError>(ConnectResult::success()))
    }))
}

/// Connector that holds every request until `gate` is notified, then answers
/// with `result`.
pub fn gated(gate: Arc<Notify>, result: ConnectResult) -> Connector {
    BoxCloneService::new(tower::service_fn(move |_req: ConnectRequest| {
        let gate = Arc::clone(&gate);
        let result = result.clone();
        async move {
            gate.notified().await;
            Ok::<_, BoxError>(result)
        }
    }))
}

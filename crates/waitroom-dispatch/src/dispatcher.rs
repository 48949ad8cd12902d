//! The periodic dispatch loop.

use crate::DispatchConfig;
use hashbrown::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower::Service;
use waitroom_core::{BoxError, ClientId, ConnectRequest, ConnectResult, DestinationProbe};
use waitroom_queue::WaitingArea;
use waitroom_reconnect::{AttemptOutcome, ReconnectProtocol};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// An attempt started by a dispatch tick.
#[derive(Debug)]
pub struct Dispatched {
    /// The client being moved.
    pub client: ClientId,
    /// Its destination.
    pub destination: String,
    /// The spawned attempt.
    pub handle: JoinHandle<AttemptOutcome>,
}

/// Drives the reconnect protocol on a fixed interval.
///
/// In queue mode every destination gets at most one attempt per tick, chosen
/// by tier and arrival order. In direct mode a single client is attempted per
/// tick, the first waiting client that is eligible.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use waitroom_core::{BoxError, ConnectRequest, ConnectResult, ProbeReport};
/// use waitroom_dispatch::{DispatchConfig, Dispatcher};
/// use waitroom_queue::WaitingArea;
/// use waitroom_reconnect::{ReconnectConfig, ReconnectProtocol};
/// # use waitroom_core::{ClientDirectory, ClientId, SharedClient};
/// # struct Empty;
/// # impl ClientDirectory for Empty {
/// #     fn resolve(&self, _: ClientId) -> Option<SharedClient> { None }
/// #     fn waiting(&self) -> Vec<SharedClient> { Vec::new() }
/// # }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let area = Arc::new(WaitingArea::builder().directory(Arc::new(Empty)).build()?);
/// let protocol = ReconnectProtocol::new(
///     area,
///     |_: &str| async { Ok(Some(ProbeReport::online(100, 0))) },
///     tower::service_fn(|_: ConnectRequest| async { Ok::<_, BoxError>(ConnectResult::success()) }),
///     ReconnectConfig::default(),
/// );
///
/// let dispatcher = Dispatcher::new(protocol, DispatchConfig::default());
/// dispatcher.start().await;
/// // ...
/// dispatcher.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<P, C> {
    protocol: ReconnectProtocol<P, C>,
    config: Arc<DispatchConfig>,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl<P, C> Dispatcher<P, C>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Clone + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    /// Creates a dispatcher. Nothing runs until [`start`](Self::start).
    pub fn new(protocol: ReconnectProtocol<P, C>, config: DispatchConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "waitroom_dispatch_ticks_total",
                    "Total number of dispatch ticks that found waiting clients"
                );
            });
        }

        Self {
            protocol,
            config: Arc::new(config),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// The waiting area being dispatched.
    pub fn area(&self) -> &Arc<WaitingArea> {
        self.protocol.area()
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs one dispatch tick and returns the attempts it spawned.
    ///
    /// Must be called from within a tokio runtime. The tick itself never waits
    /// on an attempt.
    pub fn tick(&self) -> Vec<Dispatched> {
        run_tick(&self.protocol)
    }

    /// Start the background dispatch loop.
    ///
    /// Calling `start` while the loop is running has no effect.
    pub async fn start(&self) {
        let mut task_lock = self.task.write().await;
        if task_lock.is_some() {
            return;
        }

        let protocol = self.protocol.clone();
        let config = Arc::clone(&self.config);

        #[cfg(feature = "tracing")]
        tracing::info!(name = %config.name, interval = ?config.interval, "dispatcher started");

        *task_lock = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                run_tick(&protocol);
            }
        }));
    }

    /// Stop the background dispatch loop. Attempts already spawned finish on
    /// their own.
    pub async fn stop(&self) {
        let mut task_lock = self.task.write().await;
        if let Some(task) = task_lock.take() {
            task.abort();

            #[cfg(feature = "tracing")]
            tracing::info!(name = %self.config.name, "dispatcher stopped");
        }
    }

    /// Returns `true` while the background loop is running.
    pub async fn is_running(&self) -> bool {
        self.task.read().await.is_some()
    }
}

impl<P, C> Drop for Dispatcher<P, C> {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .try_write()
            .ok()
            .and_then(|mut guard| guard.take())
        {
            task.abort();
        }
    }
}

fn run_tick<P, C>(protocol: &ReconnectProtocol<P, C>) -> Vec<Dispatched>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Clone + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    let area = protocol.area();
    let waiting = area.waiting();
    if waiting.is_empty() {
        return Vec::new();
    }

    #[cfg(feature = "metrics")]
    counter!("waitroom_dispatch_ticks_total").increment(1);

    area.prune_inactive();

    let oracle = area.capabilities().maintenance();
    let mut maintenance: HashMap<String, bool> = HashMap::new();
    let mut under_maintenance = |destination: &str| -> bool {
        if let Some(flag) = maintenance.get(destination) {
            return *flag;
        }
        let flag = oracle.is_under_maintenance(destination);
        maintenance.insert(destination.to_string(), flag);
        flag
    };

    let mut dispatched = Vec::new();

    if area.queue_enabled() {
        for destination in area.destinations() {
            let Some(queue) = area.queue(&destination) else {
                continue;
            };
            if queue.is_empty() {
                continue;
            }

            let candidate = if under_maintenance(&destination) {
                area.next_maintenance_candidate(&destination, &**oracle)
            } else {
                area.next_candidate(&destination)
            };

            if let Some(attempt) = candidate.and_then(|id| launch(protocol, id)) {
                dispatched.push(attempt);
            }
        }
    } else {
        let states = area.states();
        for client in waiting {
            let id = client.id();
            if states.issue(id).is_some() || states.is_connecting(id) {
                continue;
            }
            let Some(destination) = states.destination(id) else {
                continue;
            };
            if under_maintenance(&destination) && !oracle.is_bypass_eligible(&*client, &destination)
            {
                continue;
            }
            if let Some(attempt) = launch(protocol, id) {
                dispatched.push(attempt);
                break;
            }
        }
    }

    dispatched
}

fn launch<P, C>(protocol: &ReconnectProtocol<P, C>, id: ClientId) -> Option<Dispatched>
where
    P: DestinationProbe + 'static,
    C: Service<ConnectRequest, Response = ConnectResult> + Clone + Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send,
{
    match protocol.begin(id) {
        Ok(pending) => {
            let destination = pending.destination().to_string();
            Some(Dispatched {
                client: id,
                destination,
                handle: tokio::spawn(pending.run()),
            })
        }
        Err(_rejection) => {
            #[cfg(feature = "tracing")]
            tracing::trace!(client = %id, rejection = %_rejection, "attempt not started");

            None
        }
    }
}

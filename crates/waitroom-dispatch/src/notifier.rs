//! Periodic status messages for waiting clients.

use crate::DispatchConfig;
use hashbrown::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use waitroom_core::{MessageKey, Notification};
use waitroom_queue::WaitingArea;

/// Tells every waiting client where it stands.
///
/// Each round, per client, the first matching message wins:
/// 1. a recorded policy issue (only when `remind_issues` is on; a client with
///    an issue never gets the other messages)
/// 2. `maintenance.active` when its destination is under maintenance
/// 3. `queue.position` in queue mode, when the client has a position
pub struct QueueNotifier {
    area: Arc<WaitingArea>,
    config: Arc<DispatchConfig>,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl QueueNotifier {
    /// Creates a notifier. Nothing runs until [`start`](Self::start).
    pub fn new(area: Arc<WaitingArea>, config: DispatchConfig) -> Self {
        Self {
            area,
            config: Arc::new(config),
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Runs one notification round. Returns how many notifications were sent.
    pub fn notify_once(&self) -> usize {
        run_round(&self.area, &self.config)
    }

    /// Start the background notifier.
    ///
    /// The first round runs one full interval after starting.
    pub async fn start(&self) {
        let mut task_lock = self.task.write().await;
        if task_lock.is_some() {
            return;
        }

        let area = Arc::clone(&self.area);
        let config = Arc::clone(&self.config);

        *task_lock = Some(tokio::spawn(async move {
            let period = config.notify_interval;
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let _sent = run_round(&area, &config);

                #[cfg(feature = "tracing")]
                tracing::trace!(name = %config.name, sent = _sent, "notifier round");
            }
        }));
    }

    /// Stop the background notifier.
    pub async fn stop(&self) {
        let mut task_lock = self.task.write().await;
        if let Some(task) = task_lock.take() {
            task.abort();
        }
    }

    /// Returns `true` while the background notifier is running.
    pub async fn is_running(&self) -> bool {
        self.task.read().await.is_some()
    }
}

impl Drop for QueueNotifier {
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

fn run_round(area: &WaitingArea, config: &DispatchConfig) -> usize {
    let states = area.states();
    let oracle = area.capabilities().maintenance();
    let mut maintenance: HashMap<String, bool> = HashMap::new();
    let mut sent = 0;

    for client in area.waiting() {
        let id = client.id();

        if let Some(issue) = states.issue(id) {
            if config.remind_issues {
                let mut notification = Notification::new(issue.message_key());
                if let Some(destination) = states.destination(id) {
                    notification = notification.with_param("destination", destination);
                }
                area.notify(&*client, notification);
                sent += 1;
            }
            continue;
        }

        let Some(destination) = states.destination(id) else {
            continue;
        };

        let closed = *maintenance
            .entry(destination.clone())
            .or_insert_with(|| oracle.is_under_maintenance(&destination));
        if closed {
            area.notify(
                &*client,
                Notification::new(MessageKey::MaintenanceActive).with_param("destination", destination),
            );
            sent += 1;
            continue;
        }

        if !area.queue_enabled() {
            continue;
        }
        if let Some(position) = area.queue_position(id) {
            area.notify(
                &*client,
                Notification::new(MessageKey::QueuePosition)
                    .with_param("position", position)
                    .with_param("destination", destination),
            );
            sent += 1;
        }
    }

    sent
}

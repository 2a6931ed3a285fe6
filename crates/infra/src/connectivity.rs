//! Connectivity tracking and reconnect-driven queue replay
//!
//! - `ConnectivityMonitor`: owns the online flag and publishes transitions
//! - `ReconnectWatcher`: replays the offline queue on every offline→online
//!   transition
//! - `HealthPoller`: optional worker that derives the flag from `/health`
//!
//! Both workers follow the same lifecycle: spawned with a join handle,
//! stopped through a cancellation token.

use std::sync::Arc;
use std::time::Duration;

use agrilink_core::ConnectivityStatus;
use agrilink_domain::{AgriLinkError, ClientEvent, Result};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::events::publish;
use crate::api::{ApiCommands, RequestExecutor};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConnectivityMonitor {
    online: watch::Sender<bool>,
    events: broadcast::Sender<ClientEvent>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool, events: broadcast::Sender<ClientEvent>) -> Self {
        Self { online: watch::channel(initially_online).0, events }
    }

    /// Record the current state. Only real transitions are published.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });

        if changed {
            info!(online, "connectivity changed");
            publish(&self.events, ClientEvent::ConnectivityChanged { online });
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl ConnectivityStatus for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.online.borrow()
    }
}

/// Replays the offline queue whenever connectivity comes back
pub struct ReconnectWatcher {
    task_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl ReconnectWatcher {
    pub fn spawn(monitor: &ConnectivityMonitor, executor: Arc<RequestExecutor>) -> Self {
        let cancellation = CancellationToken::new();
        let mut receiver = monitor.subscribe();
        let was_online = *receiver.borrow_and_update();
        let cancel = cancellation.clone();

        let handle = tokio::spawn(async move {
            reconnect_worker(receiver, was_online, executor, cancel).await;
        });

        Self { task_handle: Some(handle), cancellation }
    }

    pub async fn stop(&mut self) -> Result<()> {
        stop_task(&self.cancellation, self.task_handle.take()).await?;
        info!("reconnect watcher stopped");
        Ok(())
    }
}

async fn reconnect_worker(
    mut receiver: watch::Receiver<bool>,
    mut was_online: bool,
    executor: Arc<RequestExecutor>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    debug!("connectivity monitor dropped");
                    break;
                }
                let online = *receiver.borrow_and_update();
                if online && !was_online {
                    replay(&executor).await;
                }
                was_online = online;
            }
        }
    }
}

async fn replay(executor: &RequestExecutor) {
    match executor.process_offline_queue().await {
        Ok(Some(report)) => {
            debug!(succeeded = report.succeeded, remaining = report.remaining, "reconnect replay done");
        }
        Ok(None) => debug!("replay skipped; another pass is running"),
        Err(err) => warn!(error = %err, "offline queue replay failed"),
    }
}

/// Periodic `/health` probe feeding a [`ConnectivityMonitor`]
pub struct HealthPoller {
    task_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl HealthPoller {
    pub fn spawn(
        commands: Arc<ApiCommands>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Duration,
    ) -> Self {
        let cancellation = CancellationToken::new();
        let cancel = cancellation.clone();

        info!(interval_secs = interval.as_secs(), "starting health poller");
        let handle = tokio::spawn(async move {
            health_worker(commands, monitor, interval, cancel).await;
        });

        Self { task_handle: Some(handle), cancellation }
    }

    pub async fn stop(&mut self) -> Result<()> {
        stop_task(&self.cancellation, self.task_handle.take()).await?;
        info!("health poller stopped");
        Ok(())
    }
}

async fn health_worker(
    commands: Arc<ApiCommands>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                let healthy = commands.health().await;
                monitor.set_online(healthy);
            }
        }
    }
}

async fn stop_task(cancellation: &CancellationToken, handle: Option<JoinHandle<()>>) -> Result<()> {
    cancellation.cancel();

    if let Some(handle) = handle {
        tokio::time::timeout(STOP_TIMEOUT, handle)
            .await
            .map_err(|_| AgriLinkError::Internal("worker shutdown timeout".to_string()))?
            .map_err(|e| AgriLinkError::Internal(format!("Task join failed: {e}")))?;
    }
    Ok(())
}

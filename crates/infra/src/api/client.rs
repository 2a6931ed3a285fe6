//! Assembled client
//!
//! [`ApiClient`] wires storage, transport, authentication, the executor and
//! connectivity tracking from one [`Config`]. Background workers are only
//! started by [`ApiClient::start`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agrilink_common::resilience::RetryConfig;
use agrilink_core::{EndpointRegistry, KeyValueStore, OfflineQueue};
use agrilink_domain::{ClientEvent, Config};
use tokio::sync::broadcast;
use tracing::info;

use super::auth::{AuthHeaderProvider, TokenStore};
use super::commands::ApiCommands;
use super::errors::ApiError;
use super::events;
use super::executor::RequestExecutor;
use crate::connectivity::{ConnectivityMonitor, HealthPoller, ReconnectWatcher};
use crate::http::HttpClient;
use crate::storage::{FileKeyValueStore, SettingsStore};

pub struct ApiClient {
    config: Config,
    commands: Arc<ApiCommands>,
    executor: Arc<RequestExecutor>,
    monitor: Arc<ConnectivityMonitor>,
    settings: SettingsStore,
    events: broadcast::Sender<ClientEvent>,
    reconnect: Option<ReconnectWatcher>,
    health: Option<HealthPoller>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn commands(&self) -> &Arc<ApiCommands> {
        &self.commands
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Spawn the reconnect watcher, plus the health poller when
    /// `api.health_poll_secs` is set. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.reconnect.is_none() {
            self.reconnect = Some(ReconnectWatcher::spawn(&self.monitor, self.executor.clone()));
        }
        if self.health.is_none() {
            if let Some(secs) = self.config.api.health_poll_secs.filter(|secs| *secs > 0) {
                self.health = Some(HealthPoller::spawn(
                    self.commands.clone(),
                    self.monitor.clone(),
                    Duration::from_secs(secs),
                ));
            }
        }
    }

    /// Stop background workers.
    pub async fn shutdown(&mut self) -> agrilink_domain::Result<()> {
        if let Some(mut poller) = self.health.take() {
            poller.stop().await?;
        }
        if let Some(mut watcher) = self.reconnect.take() {
            watcher.stop().await?;
        }
        info!("client shut down");
        Ok(())
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn KeyValueStore>>,
    initially_online: Option<bool>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `store` instead of the file store under `storage.path`
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Connectivity assumed before the first probe (default: online)
    pub fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = Some(online);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns error if the base address cannot be resolved or the transport
    /// cannot be created
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let store = self.store.unwrap_or_else(|| {
            Arc::new(FileKeyValueStore::new(PathBuf::from(&config.storage.path)))
        });

        let registry = EndpointRegistry::from_config(&config.api)?;
        let http = HttpClient::builder().timeout(config.api.request_timeout()).build()?;
        let events = events::channel();

        let auth = Arc::new(AuthHeaderProvider::new(
            http,
            registry,
            TokenStore::new(store.clone()),
            events.clone(),
        ));
        let monitor =
            Arc::new(ConnectivityMonitor::new(self.initially_online.unwrap_or(true), events.clone()));
        let queue = Arc::new(OfflineQueue::new(store.clone()));
        let retry = RetryConfig::fixed(config.retry.max_attempts, config.retry.delay());

        let executor = Arc::new(RequestExecutor::new(auth.clone(), queue, monitor.clone(), retry));
        let commands = Arc::new(ApiCommands::new(executor.clone(), &config));

        info!(base_url = %auth.registry().base_url(), "client ready");

        Ok(ApiClient {
            config,
            commands,
            executor,
            monitor,
            settings: SettingsStore::new(store),
            events,
            reconnect: None,
            health: None,
        })
    }
}

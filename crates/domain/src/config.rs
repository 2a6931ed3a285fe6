//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BACKEND_PORT, DEFAULT_CHAT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_MS, FRONTEND_PORT, HEALTH_TIMEOUT_SECS, LOCAL_DEV_BASE_URL,
};
use crate::types::SplitMode;

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub stream: StreamConfig,
}

/// Backend addressing and timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin the client is served from (e.g. `https://farm.example:3000`).
    /// The backend address is inferred from it unless `base_url` is set.
    pub origin: Option<String>,
    /// Explicit backend address; skips inference when present
    pub base_url: Option<String>,
    pub local_dev_base_url: String,
    pub frontend_port: u16,
    pub backend_port: u16,
    pub request_timeout_secs: u64,
    pub chat_timeout_secs: u64,
    pub health_timeout_secs: u64,
    /// Poll `/health` at this interval to drive connectivity; disabled when unset
    pub health_poll_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: None,
            base_url: None,
            local_dev_base_url: LOCAL_DEV_BASE_URL.to_string(),
            frontend_port: FRONTEND_PORT,
            backend_port: BACKEND_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            chat_timeout_secs: DEFAULT_CHAT_TIMEOUT_SECS,
            health_timeout_secs: HEALTH_TIMEOUT_SECS,
            health_poll_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

/// Fixed-interval retry bounds for the request executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay_ms: DEFAULT_RETRY_DELAY_MS }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Durable key-value storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: "agrilink-data".to_string() }
    }
}

/// Stream decoding behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub split_mode: SplitMode,
}

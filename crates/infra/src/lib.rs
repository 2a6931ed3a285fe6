//! # AgriLink Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP transport and the authenticated, retrying request executor
//! - Streamed answer reading on top of the core NDJSON decoder
//! - File-backed and in-memory key-value storage
//! - Connectivity tracking and reconnect-driven queue replay
//! - Configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `agrilink-core`
//! - Depends on `agrilink-common`, `agrilink-domain` and `agrilink-core`
//! - Contains all "impure" code (network, filesystem, background tasks)

pub mod api;
pub mod config;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;
pub mod streaming;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiCommands, ApiError, ApiErrorCategory, AuthHeaderProvider,
    ReplayReport, RequestExecutor, TokenStore,
};
pub use connectivity::{ConnectivityMonitor, HealthPoller, ReconnectWatcher};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use storage::{FileKeyValueStore, MemoryKeyValueStore, SettingsStore};
pub use streaming::{read_stream, StreamedAnswer};

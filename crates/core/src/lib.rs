//! # AgriLink Core
//!
//! Pure request-pipeline logic - no HTTP, no filesystem.
//!
//! This crate contains:
//! - Endpoint registry and base address inference
//! - NDJSON stream decoding into answer events
//! - The persisted offline request queue
//! - Port interfaces (traits) for storage and connectivity
//!
//! ## Architecture Principles
//! - Only depends on `agrilink-domain`
//! - All external effects go through the ports
//! - Pure, testable business logic

pub mod endpoints;
pub mod queue;
pub mod streaming;

// Infrastructure ports
pub mod connectivity_ports;
pub mod storage_ports;

pub use connectivity_ports::{ConnectivityStatus, StaticConnectivity};
pub use endpoints::{infer_base_url, EndpointRegistry, Route};
pub use queue::{OfflineQueue, QueueError, QueueResult};
pub use storage_ports::KeyValueStore;
pub use streaming::{parse_envelopes, StreamDecoder};

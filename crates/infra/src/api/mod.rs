//! Backend API client for AgriLink
//!
//! This module turns logical request descriptors into authenticated HTTP
//! calls and keeps them alive across flaky connectivity.
//!
//! # Architecture
//!
//! - `auth`: bearer headers and the single-shot `401` refresh
//! - `executor`: fixed-interval retries, offline queueing and replay
//! - `commands`: typed operations over the executor
//! - `client`: wiring of all of the above from one `Config`

pub mod auth;
pub mod client;
pub mod commands;
pub mod errors;
pub mod events;
pub mod executor;

pub use auth::{AuthHeaderProvider, TokenStore};
pub use client::{ApiClient, ApiClientBuilder};
pub use commands::ApiCommands;
pub use errors::{ApiError, ApiErrorCategory};
pub use executor::{ApiRetryPolicy, ReplayReport, RequestExecutor};

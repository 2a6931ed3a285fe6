//! # AgriLink Domain
//!
//! Business domain types and models for the AgriLink client.
//!
//! This crate contains:
//! - Request, token, queue and stream data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Persisted-key and protocol constants
//!
//! ## Architecture
//! - No dependencies on other AgriLink crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

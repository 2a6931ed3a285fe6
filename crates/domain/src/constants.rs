//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! client: persisted storage keys, protocol defaults and retry bounds.

// Persisted storage keys (fixed; the queue payload carries its own version)
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const OFFLINE_QUEUE_KEY: &str = "offline_queue";
pub const SETTINGS_KEY: &str = "settings";

/// Version written alongside the persisted offline queue
pub const OFFLINE_QUEUE_VERSION: u32 = 1;

// Base address inference
pub const LOCAL_DEV_BASE_URL: &str = "http://localhost:8000";
pub const FRONTEND_PORT: u16 = 3000;
pub const BACKEND_PORT: u16 = 8000;
pub const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

// Retry defaults (fixed interval, no jitter)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// Timeouts
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;
pub const HEALTH_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_HEALTH_POLL_SECS: u64 = 30;

// Stream protocol
pub const STATUS_COMPLETE: &str = "complete";
pub const STATUS_ERROR: &str = "error";
/// Longest NDJSON line the buffered decoder will hold before dropping it
pub const MAX_STREAM_LINE_BYTES: usize = 1024 * 1024;

// Headers
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const BEARER_PREFIX: &str = "Bearer ";

// Languages the backend can answer and translate between
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "hi", "te"];
pub const DEFAULT_LANGUAGE: &str = "en";

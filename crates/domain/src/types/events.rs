//! Client lifecycle events
//!
//! Published on a broadcast channel for collaborators outside the request
//! pipeline (status indicators, login redirects, sync badges).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::Operation;

/// A scheduled retry, emitted before the delay starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryRecord {
    pub endpoint: Operation,
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    ConnectivityChanged { online: bool },
    RetryScheduled(RetryRecord),
    RequestQueued { entry_id: Uuid, endpoint: Operation },
    QueueReplayed { succeeded: usize, failed: usize, remaining: usize },
    /// Tokens were discarded; the user must sign in again
    ReauthenticationRequired,
}

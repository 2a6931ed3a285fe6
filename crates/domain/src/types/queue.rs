//! Offline queue entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{Operation, RequestDescriptor, RequestOptions};

/// A request parked while the client was offline
///
/// Entries are never deduplicated; the same logical request may be queued
/// more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueEntry {
    /// Identifies the entry for removal only
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub endpoint: Operation,
    pub options: RequestOptions,
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl OfflineQueueEntry {
    #[must_use]
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: descriptor.endpoint,
            options: descriptor.options,
            enqueued_at: Utc::now(),
        }
    }

    /// Rebuild the descriptor for replay
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor { endpoint: self.endpoint, options: self.options.clone() }
    }
}

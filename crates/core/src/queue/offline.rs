//! Offline queue over the key-value storage port
//!
//! The whole queue is one JSON document under a single key. Every mutation
//! reads the document, changes it and writes it back while holding an async
//! mutex, so concurrent callers in one process never lose each other's
//! writes. Entries keep insertion order.

use std::sync::Arc;

use agrilink_domain::constants::{OFFLINE_QUEUE_KEY, OFFLINE_QUEUE_VERSION};
use agrilink_domain::{OfflineQueueEntry, RequestDescriptor};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::errors::{QueueError, QueueResult};
use crate::storage_ports::KeyValueStore;

/// On-disk shape of the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedQueue {
    pub version: u32,
    pub entries: Vec<OfflineQueueEntry>,
}

/// Accepts both the versioned document and a bare legacy array
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredQueue {
    Versioned(PersistedQueue),
    Legacy(Vec<OfflineQueueEntry>),
}

pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
    lock: Mutex<()>,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue").field("key", &self.key).finish_non_exhaustive()
    }
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, OFFLINE_QUEUE_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into(), lock: Mutex::new(()) }
    }

    /// Append a request and persist the queue.
    #[instrument(skip(self, descriptor), fields(endpoint = %descriptor.endpoint))]
    pub async fn enqueue(&self, descriptor: RequestDescriptor) -> QueueResult<OfflineQueueEntry> {
        let entry = OfflineQueueEntry::new(descriptor);
        let _guard = self.lock.lock().await;

        let mut entries = self.read().await?;
        entries.push(entry.clone());
        self.write(&entries).await?;

        info!(entry_id = %entry.id, queued = entries.len(), "request queued for replay");
        Ok(entry)
    }

    /// Remove one entry by id. Returns `false` if it was already gone.
    pub async fn remove(&self, id: Uuid) -> QueueResult<bool> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            debug!(entry_id = %id, "queue entry already removed");
            return Ok(false);
        }
        self.write(&entries).await?;

        info!(entry_id = %id, remaining = entries.len(), "queue entry removed");
        Ok(true)
    }

    /// Current entries in insertion order
    pub async fn snapshot(&self) -> QueueResult<Vec<OfflineQueueEntry>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn len(&self) -> QueueResult<usize> {
        Ok(self.snapshot().await?.len())
    }

    pub async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> QueueResult<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(&self.key).await?;
        info!("offline queue cleared");
        Ok(())
    }

    async fn read(&self) -> QueueResult<Vec<OfflineQueueEntry>> {
        let Some(text) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<StoredQueue>(&text) {
            Ok(StoredQueue::Versioned(queue)) if queue.version > OFFLINE_QUEUE_VERSION => {
                Err(QueueError::UnsupportedVersion {
                    found: queue.version,
                    supported: OFFLINE_QUEUE_VERSION,
                })
            }
            Ok(StoredQueue::Versioned(queue)) => Ok(queue.entries),
            Ok(StoredQueue::Legacy(entries)) => {
                debug!(count = entries.len(), "loaded legacy unversioned queue");
                Ok(entries)
            }
            Err(e) => Err(QueueError::Corrupt(e)),
        }
    }

    async fn write(&self, entries: &[OfflineQueueEntry]) -> QueueResult<()> {
        let document = PersistedQueue { version: OFFLINE_QUEUE_VERSION, entries: entries.to_vec() };
        let text = serde_json::to_string(&document).map_err(QueueError::Serialize)?;
        self.store.set(&self.key, &text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use agrilink_domain::{Operation, Result};
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        values: std::sync::Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn queue() -> (Arc<MemoryStore>, OfflineQueue) {
        let store = Arc::new(MemoryStore::default());
        let queue = OfflineQueue::new(store.clone());
        (store, queue)
    }

    #[tokio::test]
    async fn enqueue_persists_versioned_document() {
        let (store, queue) = queue();
        let entry = queue.enqueue(RequestDescriptor::get(Operation::Profile)).await.unwrap();

        let raw = store.get(OFFLINE_QUEUE_KEY).await.unwrap().unwrap();
        let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(document["version"], 1);
        assert_eq!(document["entries"][0]["id"], entry.id.to_string());
    }

    #[tokio::test]
    async fn entries_keep_insertion_order() {
        let (_, queue) = queue();
        for op in [Operation::Vote, Operation::Query, Operation::Health] {
            queue.enqueue(RequestDescriptor::post(op)).await.unwrap();
        }
        let endpoints: Vec<_> =
            queue.snapshot().await.unwrap().into_iter().map(|e| e.endpoint).collect();
        assert_eq!(endpoints, vec![Operation::Vote, Operation::Query, Operation::Health]);
    }

    #[tokio::test]
    async fn remove_is_exactly_once() {
        let (_, queue) = queue();
        let entry = queue.enqueue(RequestDescriptor::get(Operation::Profile)).await.unwrap();
        assert!(queue.remove(entry.id).await.unwrap());
        assert!(!queue.remove(entry.id).await.unwrap());
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn loads_legacy_array() {
        let (store, queue) = queue();
        let legacy = serde_json::to_string(&vec![OfflineQueueEntry::new(
            RequestDescriptor::get(Operation::Health),
        )])
        .unwrap();
        store.set(OFFLINE_QUEUE_KEY, &legacy).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_newer_version() {
        let (store, queue) = queue();
        store.set(OFFLINE_QUEUE_KEY, r#"{"version":9,"entries":[]}"#).await.unwrap();
        assert!(matches!(
            queue.snapshot().await,
            Err(QueueError::UnsupportedVersion { found: 9, supported: 1 })
        ));
    }

    #[tokio::test]
    async fn multipart_upload_round_trips_through_the_store() {
        let (_, queue) = queue();
        let descriptor = RequestDescriptor::post(Operation::SubmitDetection).multipart(vec![
            agrilink_domain::FormPart::file("image", "leaf.jpg", None, vec![0xff, 0xd8]),
            agrilink_domain::FormPart::text("farm_id", "farm-7"),
        ]);

        let entry = queue.enqueue(descriptor.clone()).await.unwrap();

        let entries = queue.snapshot().await.unwrap();
        assert_eq!(entries, vec![entry]);
        assert_eq!(entries[0].descriptor(), descriptor);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let (store, queue) = queue();
        store.set(OFFLINE_QUEUE_KEY, "{not json").await.unwrap();
        assert!(matches!(queue.snapshot().await, Err(QueueError::Corrupt(_))));
    }

    #[tokio::test]
    async fn concurrent_enqueues_are_all_kept() {
        let (_, queue) = queue();
        let queue = Arc::new(queue);
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    queue
                        .enqueue(RequestDescriptor::get(Operation::CommunityQuestion(i)))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(queue.len().await.unwrap(), 10);
    }
}

//! Mock storage implementations for testing
//!
//! In-memory stand-ins for the storage port so queue tests run without a
//! filesystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use agrilink_core::KeyValueStore;
use agrilink_domain::{AgriLinkError, Result as DomainResult};
use async_trait::async_trait;

/// In-memory mock for `KeyValueStore`.
///
/// Writes can be made to fail on demand to exercise storage error paths.
#[derive(Default)]
pub struct MockKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MockKeyValueStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MockKeyValueStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AgriLinkError::Storage("disk full".into()));
        }
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

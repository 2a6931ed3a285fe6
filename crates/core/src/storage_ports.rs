//! Durable key-value storage port.
//!
//! Tokens, the offline queue and settings are persisted as JSON text under
//! fixed keys (see `agrilink_domain::constants`). Adapters decide where the
//! text lives; callers always write the full value.

use agrilink_domain::Result;
use async_trait::async_trait;

/// String-keyed storage of JSON text
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

//! Persisted offline request queue

pub mod errors;
pub mod offline;

pub use errors::{QueueError, QueueResult};
pub use offline::{OfflineQueue, PersistedQueue};

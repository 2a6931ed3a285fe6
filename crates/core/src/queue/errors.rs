use agrilink_domain::AgriLinkError;
use thiserror::Error;

/// Offline queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue storage failed: {0}")]
    Storage(#[from] AgriLinkError),

    #[error("persisted queue is unreadable: {0}")]
    Corrupt(serde_json::Error),

    #[error("queue could not be serialized: {0}")]
    Serialize(serde_json::Error),

    #[error("persisted queue version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

pub type QueueResult<T> = Result<T, QueueError>;

impl From<QueueError> for AgriLinkError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Storage(inner) => inner,
            QueueError::Corrupt(e) | QueueError::Serialize(e) => Self::Serialization(e.to_string()),
            other @ QueueError::UnsupportedVersion { .. } => Self::Storage(other.to_string()),
        }
    }
}

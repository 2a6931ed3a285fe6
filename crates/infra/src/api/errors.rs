//! API-specific error types
//!
//! Provides error classification for API operations with retry metadata.

use std::time::Duration;

use agrilink_core::QueueError;
use agrilink_domain::AgriLinkError;
use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401/403 and failed re-authentication - handled by the refresh flow
    Authentication,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Connection failures and timeouts - retryable
    Network,
    /// Request parked in the offline queue
    Deferred,
    /// Malformed or failed response bodies
    Protocol,
    /// Local storage and configuration problems - non-retryable
    Local,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {message}")]
    Network { message: String, connect: bool },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} {status_text}")]
    Http { status: u16, status_text: String, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Session expired; sign in again")]
    ReauthenticationRequired,

    #[error("Offline; request queued as {entry_id}")]
    Queued { entry_id: Uuid },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build an HTTP error from a non-success status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        Self::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
            body,
        }
    }

    /// Classify a transport failure. `timeout` is the deadline that applied to
    /// the call and is reported if the transport gave up because of it.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }
        if err.is_builder() {
            return Self::Config(format!("invalid request: {err}"));
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_status(status, String::new());
        }
        Self::Network { message: err.to_string(), connect: err.is_connect() }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Network { .. } | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Http { status: 401 | 403, .. } | Self::Auth(_) | Self::ReauthenticationRequired => {
                ApiErrorCategory::Authentication
            }
            Self::Http { status: 500..=599, .. } => ApiErrorCategory::Server,
            Self::Http { .. } => ApiErrorCategory::Client,
            Self::Queued { .. } => ApiErrorCategory::Deferred,
            Self::Stream(_) | Self::Decode(_) => ApiErrorCategory::Protocol,
            Self::Storage(_) | Self::Config(_) => ApiErrorCategory::Local,
        }
    }

    /// Transport failures, timeouts and 5xx responses are worth another try.
    pub fn should_retry(&self) -> bool {
        matches!(self.category(), ApiErrorCategory::Network | ApiErrorCategory::Server)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<AgriLinkError> for ApiError {
    fn from(err: AgriLinkError) -> Self {
        match err {
            AgriLinkError::Config(msg) | AgriLinkError::InvalidInput(msg) => Self::Config(msg),
            AgriLinkError::Network(msg) => Self::Network { message: msg, connect: false },
            AgriLinkError::Auth(msg) => Self::Auth(msg),
            AgriLinkError::Storage(msg) | AgriLinkError::NotFound(msg) => Self::Storage(msg),
            AgriLinkError::Serialization(msg) => Self::Decode(msg),
            AgriLinkError::Internal(msg) => Self::Config(msg),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ApiError> for AgriLinkError {
    fn from(err: ApiError) -> Self {
        match err.category() {
            ApiErrorCategory::Authentication => Self::Auth(err.to_string()),
            ApiErrorCategory::Network | ApiErrorCategory::Server | ApiErrorCategory::Deferred => {
                Self::Network(err.to_string())
            }
            ApiErrorCategory::Client => match err {
                ApiError::Http { status: 404, .. } => Self::NotFound(err.to_string()),
                other => Self::InvalidInput(other.to_string()),
            },
            ApiErrorCategory::Protocol => Self::Serialization(err.to_string()),
            ApiErrorCategory::Local => match err {
                ApiError::Storage(msg) => Self::Storage(msg),
                other => Self::Config(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> ApiError {
        ApiError::from_status(StatusCode::from_u16(status).unwrap(), String::new())
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(http(401).category(), ApiErrorCategory::Authentication);
        assert_eq!(http(503).category(), ApiErrorCategory::Server);
        assert_eq!(http(404).category(), ApiErrorCategory::Client);
        assert_eq!(
            ApiError::Network { message: "refused".into(), connect: true }.category(),
            ApiErrorCategory::Network
        );
        assert_eq!(
            ApiError::Queued { entry_id: Uuid::new_v4() }.category(),
            ApiErrorCategory::Deferred
        );
    }

    #[test]
    fn test_should_retry() {
        assert!(http(500).should_retry());
        assert!(http(599).should_retry());
        assert!(ApiError::Timeout(Duration::from_secs(1)).should_retry());
        assert!(ApiError::Network { message: "reset".into(), connect: false }.should_retry());

        assert!(!http(400).should_retry());
        assert!(!http(401).should_retry());
        assert!(!http(429).should_retry());
        assert!(!ApiError::ReauthenticationRequired.should_retry());
        assert!(!ApiError::Queued { entry_id: Uuid::new_v4() }.should_retry());
        assert!(!ApiError::Stream("boom".into()).should_retry());
    }

    #[test]
    fn status_text_comes_from_canonical_reason() {
        match http(503) {
            ApiError::Http { status, status_text, .. } => {
                assert_eq!(status, 503);
                assert_eq!(status_text, "Service Unavailable");
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[test]
    fn queued_is_distinguishable() {
        let err = ApiError::Queued { entry_id: Uuid::new_v4() };
        assert!(err.is_queued());
        assert!(!http(500).is_queued());
    }

    #[test]
    fn converts_into_domain_error() {
        assert!(matches!(AgriLinkError::from(http(404)), AgriLinkError::NotFound(_)));
        assert!(matches!(
            AgriLinkError::from(ApiError::ReauthenticationRequired),
            AgriLinkError::Auth(_)
        ));
        assert!(matches!(
            AgriLinkError::from(ApiError::Storage("disk".into())),
            AgriLinkError::Storage(msg) if msg == "disk"
        ));
    }
}

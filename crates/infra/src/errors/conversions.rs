//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use agrilink_domain::AgriLinkError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AgriLinkError);

impl From<InfraError> for AgriLinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AgriLinkError> for InfraError {
    fn from(value: AgriLinkError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAgriLinkError {
    fn into_agrilink(self) -> AgriLinkError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → AgriLinkError */
/* -------------------------------------------------------------------------- */

impl IntoAgriLinkError for IoError {
    fn into_agrilink(self) -> AgriLinkError {
        match self.kind() {
            ErrorKind::NotFound => AgriLinkError::NotFound(format!("storage entry missing: {self}")),
            ErrorKind::PermissionDenied => {
                AgriLinkError::Storage(format!("storage permission denied: {self}"))
            }
            ErrorKind::InvalidData => {
                AgriLinkError::Serialization(format!("stored value is not valid text: {self}"))
            }
            _ => AgriLinkError::Storage(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_agrilink())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → AgriLinkError */
/* -------------------------------------------------------------------------- */

impl IntoAgriLinkError for JsonError {
    fn into_agrilink(self) -> AgriLinkError {
        AgriLinkError::Serialization(format!(
            "invalid JSON at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_agrilink())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AgriLinkError */
/* -------------------------------------------------------------------------- */

impl IntoAgriLinkError for HttpError {
    fn into_agrilink(self) -> AgriLinkError {
        if self.is_timeout() {
            return AgriLinkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return AgriLinkError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return AgriLinkError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => AgriLinkError::Auth(message),
                404 => AgriLinkError::NotFound(message),
                400..=499 => AgriLinkError::InvalidInput(message),
                _ => AgriLinkError::Network(message),
            };
        }

        if self.is_decode() {
            return AgriLinkError::Serialization(self.to_string());
        }

        AgriLinkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_agrilink())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

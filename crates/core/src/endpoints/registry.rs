//! Endpoint registry
//!
//! Immutable table of backend routes. Paths are relative to the base address
//! the registry was built with.

use std::borrow::Cow;

use agrilink_domain::{AgriLinkError, ApiConfig, HttpMethod, Operation, Result};
use url::Url;

use super::base_url::resolve_base_url;

/// Method and path of a logical operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Method used when the caller does not pick one
    pub method: HttpMethod,
    pub path: Cow<'static, str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistry {
    base_url: String,
}

impl EndpointRegistry {
    /// # Errors
    /// Returns [`AgriLinkError::Config`] if `base_url` is not an absolute URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| AgriLinkError::Config(format!("invalid base url '{base_url}': {e}")))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(resolve_base_url(config)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Static route table
    pub fn route(operation: Operation) -> Route {
        let (method, path): (HttpMethod, Cow<'static, str>) = match operation {
            Operation::Register => (HttpMethod::Post, "/register".into()),
            Operation::Login => (HttpMethod::Post, "/token".into()),
            Operation::RefreshToken => (HttpMethod::Post, "/auth/refresh".into()),
            Operation::Profile => (HttpMethod::Get, "/users/me".into()),
            Operation::SubmitDetection => (HttpMethod::Post, "/detection/submit".into()),
            Operation::Query => (HttpMethod::Post, "/query".into()),
            Operation::StreamQuery => (HttpMethod::Post, "/stream-query".into()),
            Operation::CommunityQuestions => (HttpMethod::Get, "/community/questions".into()),
            Operation::CommunityQuestion(id) => {
                (HttpMethod::Get, format!("/community/questions/{id}").into())
            }
            Operation::Vote => (HttpMethod::Post, "/community/vote".into()),
            Operation::ChatMessage => (HttpMethod::Post, "/chatbot/message".into()),
            Operation::Health => (HttpMethod::Get, "/health".into()),
        };
        Route { method, path }
    }

    /// Absolute URL of `operation`
    ///
    /// # Errors
    /// Returns [`AgriLinkError::Config`] if the joined URL does not parse.
    pub fn resolve(&self, operation: Operation) -> Result<Url> {
        let route = Self::route(operation);
        let raw = format!("{}{}", self.base_url, route.path);
        Url::parse(&raw).map_err(|e| AgriLinkError::Config(format!("invalid url '{raw}': {e}")))
    }
}

//! Request descriptors
//!
//! A [`RequestDescriptor`] is built fresh for every call and never mutated
//! afterwards. It is fully serializable so a failed request can be parked in
//! the offline queue and replayed after a restart.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::serde::{base64_bytes, optional_duration_millis};

/// Logical operations understood by the backend
///
/// Parameterized operations carry their path parameter so that the
/// descriptor stays serializable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "operation", content = "id", rename_all = "snake_case")]
pub enum Operation {
    Register,
    Login,
    RefreshToken,
    Profile,
    SubmitDetection,
    Query,
    StreamQuery,
    CommunityQuestions,
    CommunityQuestion(u64),
    Vote,
    ChatMessage,
    Health,
}

impl Operation {
    /// Stable label for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::RefreshToken => "refresh_token",
            Self::Profile => "profile",
            Self::SubmitDetection => "submit_detection",
            Self::Query => "query",
            Self::StreamQuery => "stream_query",
            Self::CommunityQuestions => "community_questions",
            Self::CommunityQuestion(_) => "community_question",
            Self::Vote => "vote",
            Self::ChatMessage => "chat_message",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// One named field of a multipart form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: FormValue::Text { value: value.into() } }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File { filename: filename.into(), content_type, bytes },
        }
    }
}

/// Persisted as `{"type": "text", "value": ..}` or
/// `{"type": "file", "filename": .., "bytes": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormValue {
    Text { value: String },
    File {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

/// Everything about a request except its logical endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default)]
    pub streaming: bool,
    /// Caller-supplied abort timeout for the transport call
    #[serde(default, with = "optional_duration_millis", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// A logical request: which operation and how to issue it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub endpoint: Operation,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn new(endpoint: Operation, method: HttpMethod) -> Self {
        Self { endpoint, options: RequestOptions { method, ..RequestOptions::default() } }
    }

    pub fn get(endpoint: Operation) -> Self {
        Self::new(endpoint, HttpMethod::Get)
    }

    pub fn post(endpoint: Operation) -> Self {
        Self::new(endpoint, HttpMethod::Post)
    }

    pub fn delete(endpoint: Operation) -> Self {
        Self::new(endpoint, HttpMethod::Delete)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.options.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.options.body = Some(RequestBody::Multipart(parts));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    pub fn streaming(mut self) -> Self {
        self.options.streaming = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.options.method
    }

    pub fn is_streaming(&self) -> bool {
        self.options.streaming
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parameterized_operation_serializes_its_id() {
        let json = serde_json::to_value(Operation::CommunityQuestion(42)).unwrap();
        assert_eq!(json, json!({ "operation": "community_question", "id": 42 }));

        let plain = serde_json::to_value(Operation::Vote).unwrap();
        assert_eq!(plain, json!({ "operation": "vote" }));
    }

    #[test]
    fn descriptor_survives_persistence_with_multipart_bytes() {
        let descriptor = RequestDescriptor::post(Operation::SubmitDetection)
            .multipart(vec![
                FormPart::file("image", "leaf.jpg", Some("image/jpeg".into()), vec![0xff, 0xd8]),
                FormPart::text("farm_id", "farm-7"),
            ])
            .timeout(Duration::from_secs(5));

        let text = serde_json::to_string(&descriptor).unwrap();
        let restored: RequestDescriptor = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, descriptor);
    }

    #[test]
    fn form_parts_persist_with_a_type_tag() {
        let parts = vec![
            FormPart::text("farm_id", "farm-7"),
            FormPart::file("image", "leaf.jpg", None, vec![1, 2]),
        ];
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0], json!({ "name": "farm_id", "value": { "type": "text", "value": "farm-7" } }));
        assert_eq!(json[1]["value"]["type"], "file");

        let legacy: FormPart = serde_json::from_value(json!({
            "name": "image",
            "value": { "type": "file", "filename": "leaf.jpg", "bytes": "AQI=" }
        }))
        .unwrap();
        assert_eq!(legacy, parts[1]);
    }

    #[test]
    fn builder_sets_streaming_and_headers() {
        let descriptor = RequestDescriptor::post(Operation::ChatMessage)
            .json(&json!({ "message": "hi" }))
            .unwrap()
            .header("X-Session", "s1")
            .streaming();

        assert!(descriptor.is_streaming());
        assert_eq!(descriptor.method(), HttpMethod::Post);
        assert_eq!(descriptor.options.headers.get("X-Session").map(String::as_str), Some("s1"));
        assert!(matches!(descriptor.options.body, Some(RequestBody::Json(_))));
    }
}

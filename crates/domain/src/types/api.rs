//! Request and response payloads of the backend API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_LANGUAGE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Body of `/query` and `/stream-query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_to: Option<String>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), lang: DEFAULT_LANGUAGE.to_string(), translate_to: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    pub user_id: String,
    pub session_id: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_to: Option<String>,
}

/// Up or down vote on a question or answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub user_id: String,
    /// `question` or `answer`
    pub target_type: String,
    pub target_id: u64,
    /// `up` or `down`
    pub vote_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub user_name: String,
    pub question: String,
    pub category: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityQuestion {
    pub id: u64,
    pub user_id: String,
    pub user_name: String,
    pub question: String,
    pub category: String,
    pub language: String,
    pub image_data: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile returned by `GET /users/me`; unknown fields are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Crop image upload for `POST /detection/submit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionSubmission {
    pub image: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
    pub farm_id: String,
    /// Free-form JSON text forwarded as the `metadata` field
    pub metadata: Option<String>,
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<u64>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

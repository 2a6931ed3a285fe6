//! Line-level envelope parsing
//!
//! Each stream line is one JSON object whose shape is only known by which
//! fields are present. [`parse_envelopes`] turns a line into the ordered list
//! of [`StreamEnvelope`]s it carries.

use agrilink_domain::constants::{STATUS_COMPLETE, STATUS_ERROR};
use agrilink_domain::StreamEnvelope;
use serde::Deserialize;
use serde_json::Value;

/// Fields the backend may put on a stream line
#[derive(Debug, Default, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    response_lang: Option<String>,
    #[serde(default, rename = "originalLanguage")]
    original_language: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    response_chunk: Option<String>,
    #[serde(default)]
    generated_answer_chunk: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    generated_answer: Option<String>,
}

/// Parse one line into its envelopes, in dispatch order.
///
/// An error line yields a single [`StreamEnvelope::Error`] and nothing else.
/// Otherwise the order is language, status, chunk, completion. A valid object
/// with no recognized field yields an empty list.
///
/// # Errors
/// Returns the JSON error if the line is not a JSON object of the expected
/// shape.
pub fn parse_envelopes(line: &str) -> Result<Vec<StreamEnvelope>, serde_json::Error> {
    let raw: RawEnvelope = serde_json::from_str(line)?;
    Ok(classify(raw))
}

fn classify(raw: RawEnvelope) -> Vec<StreamEnvelope> {
    if let Some(error) = raw.error.filter(|e| !e.is_null()) {
        let message = match error {
            Value::String(text) => text,
            other => other.to_string(),
        };
        return vec![StreamEnvelope::Error(message)];
    }
    if raw.status.as_deref() == Some(STATUS_ERROR) {
        let message = raw.message.unwrap_or_else(|| "stream reported an error".to_string());
        return vec![StreamEnvelope::Error(message)];
    }

    let mut envelopes = Vec::new();

    if let Some(language) = non_empty(raw.response_lang).or_else(|| non_empty(raw.original_language))
    {
        envelopes.push(StreamEnvelope::Language(language));
    }

    let complete = raw.status.as_deref() == Some(STATUS_COMPLETE);
    if let Some(status) = raw.status.filter(|s| s != STATUS_COMPLETE && !s.is_empty()) {
        envelopes.push(StreamEnvelope::Status(status));
    }

    if let Some(chunk) = raw.response_chunk.or(raw.generated_answer_chunk) {
        envelopes.push(StreamEnvelope::Chunk(chunk));
    }

    let final_answer = non_empty(raw.generated_answer).or_else(|| non_empty(raw.response));
    if complete || final_answer.is_some() {
        envelopes.push(StreamEnvelope::Complete(final_answer));
    }

    envelopes
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

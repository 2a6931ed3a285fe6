//! Streamed answer types
//!
//! A streamed response body is a sequence of newline-delimited JSON objects.
//! Each line decodes into zero or more [`StreamEnvelope`]s, which drive an
//! [`AnswerAccumulator`] and surface to the caller as [`StreamEvent`]s.

use serde::{Deserialize, Serialize};

/// How a response body is split into lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Carry a partial trailing line into the next chunk and flush it when
    /// the body ends
    #[default]
    Buffered,
    /// Split every chunk on its own; a line cut by a chunk boundary is lost
    PerChunk,
}

/// One semantic unit extracted from a stream line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StreamEnvelope {
    /// Server-reported failure; ends the stream
    Error(String),
    /// Language the answer was originally produced in
    Language(String),
    /// Progress marker, never part of the answer
    Status(String),
    /// Incremental answer text
    Chunk(String),
    /// Terminal marker, optionally carrying the full answer
    Complete(Option<String>),
}

/// Event delivered to the caller's sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status { status: String },
    Language { language: String },
    /// `text` is the accumulated answer including `chunk`
    Delta { chunk: String, text: String },
    Completed { text: String, original_language: Option<String> },
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

/// Cumulative answer for one in-flight stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerAccumulator {
    text: String,
    original_language: Option<String>,
    complete: bool,
    failed: bool,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original_language(&self) -> Option<&str> {
        self.original_language.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether further envelopes can still change the answer
    pub fn is_open(&self) -> bool {
        !self.complete && !self.failed
    }

    /// Append a chunk and return the updated text, or `None` once closed.
    pub fn push_chunk(&mut self, chunk: &str) -> Option<&str> {
        if !self.is_open() {
            return None;
        }
        self.text.push_str(chunk);
        Some(&self.text)
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.original_language = Some(language.into());
    }

    /// Mark the answer complete.
    ///
    /// A final answer replaces the text only when it extends what has been
    /// accumulated so far, so the text never shrinks. Returns `true` on the
    /// first call only.
    pub fn finalize(&mut self, final_answer: Option<&str>) -> bool {
        if !self.is_open() {
            return false;
        }
        if let Some(answer) = final_answer {
            if answer.len() > self.text.len() && answer.starts_with(self.text.as_str()) {
                self.text = answer.to_string();
            }
        }
        self.complete = true;
        true
    }

    /// Stop accumulating after a server error
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

//! Drives a streamed response body through the NDJSON decoder

use agrilink_core::StreamDecoder;
use agrilink_domain::{SplitMode, StreamEvent};
use futures::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::api::ApiError;

/// What a finished stream produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedAnswer {
    pub text: String,
    pub original_language: Option<String>,
    /// False when the body ended without a completion marker
    pub complete: bool,
    pub skipped_lines: usize,
}

/// Read `response` to the end, forwarding every decoded event to `sink`.
///
/// Reading stops early when the server reports an error or the receiving
/// side of `sink` is dropped.
///
/// # Errors
/// [`ApiError::Stream`] for a server error envelope, or a transport error if
/// the body could not be read.
#[instrument(skip_all, fields(mode = ?mode))]
pub async fn read_stream(
    response: Response,
    mode: SplitMode,
    sink: mpsc::Sender<StreamEvent>,
) -> Result<StreamedAnswer, ApiError> {
    let mut decoder = StreamDecoder::new(mode);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let bytes = chunk.map_err(|e| ApiError::Stream(format!("stream interrupted: {e}")))?;
        if !forward(&sink, decoder.feed(&bytes)).await {
            debug!("stream receiver dropped; abandoning body");
            return Ok(finished(&decoder));
        }
        if decoder.is_closed() {
            break;
        }
    }

    forward(&sink, decoder.finish()).await;

    if let Some(message) = decoder.error() {
        warn!(error = message, "server reported a stream error");
        return Err(ApiError::Stream(message.to_string()));
    }

    let answer = finished(&decoder);
    if !answer.complete {
        debug!(len = answer.text.len(), "stream ended without completion marker");
    }
    Ok(answer)
}

/// Returns false once the receiver is gone.
async fn forward(sink: &mpsc::Sender<StreamEvent>, events: Vec<StreamEvent>) -> bool {
    for event in events {
        if sink.send(event).await.is_err() {
            return false;
        }
    }
    true
}

fn finished(decoder: &StreamDecoder) -> StreamedAnswer {
    let answer = decoder.answer();
    StreamedAnswer {
        text: answer.text().to_string(),
        original_language: answer.original_language().map(str::to_string),
        complete: answer.is_complete(),
        skipped_lines: decoder.skipped_lines(),
    }
}

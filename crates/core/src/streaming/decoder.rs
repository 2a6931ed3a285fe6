//! Incremental NDJSON decoder
//!
//! [`StreamDecoder`] is fed raw body chunks as they arrive and returns the
//! events each chunk produced. It owns the answer accumulator for exactly one
//! stream and never performs I/O itself.

use agrilink_domain::constants::MAX_STREAM_LINE_BYTES;
use agrilink_domain::{AnswerAccumulator, SplitMode, StreamEnvelope, StreamEvent};
use tracing::{debug, warn};

use super::envelope::parse_envelopes;

#[derive(Debug, Default)]
pub struct StreamDecoder {
    mode: SplitMode,
    /// Bytes after the last newline, only used in buffered mode; never holds a newline
    pending: Vec<u8>,
    /// Set while the rest of an overlong line is being dropped
    discarding: bool,
    answer: AnswerAccumulator,
    error: Option<String>,
    skipped_lines: usize,
}

impl StreamDecoder {
    pub fn new(mode: SplitMode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn answer(&self) -> &AnswerAccumulator {
        &self.answer
    }

    /// Server error that closed the stream, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Lines that failed to parse and were dropped
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// True once a server error was seen; the rest of the body is ignored
    pub fn is_closed(&self) -> bool {
        self.error.is_some()
    }

    /// Decode one body chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.is_closed() {
            return events;
        }

        match self.mode {
            SplitMode::PerChunk => {
                let text = String::from_utf8_lossy(chunk);
                for line in text.split('\n') {
                    if self.is_closed() {
                        break;
                    }
                    self.process_line(line, &mut events);
                }
            }
            SplitMode::Buffered => self.feed_buffered(chunk, &mut events),
        }

        events
    }

    /// Only the new chunk is scanned for newlines; `pending` is known to hold none.
    fn feed_buffered(&mut self, chunk: &[u8], events: &mut Vec<StreamEvent>) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.len() + head.len() > MAX_STREAM_LINE_BYTES {
                self.drop_overlong_line(self.pending.len() + head.len());
                continue;
            }

            self.pending.extend_from_slice(head);
            let line = std::mem::take(&mut self.pending);
            self.process_line(&String::from_utf8_lossy(&line), events);
            if self.is_closed() {
                return;
            }
        }

        if self.discarding {
            return;
        }
        if self.pending.len() + rest.len() > MAX_STREAM_LINE_BYTES {
            self.drop_overlong_line(self.pending.len() + rest.len());
            self.discarding = true;
            return;
        }
        self.pending.extend_from_slice(rest);
    }

    fn drop_overlong_line(&mut self, line_len: usize) {
        self.pending.clear();
        self.skipped_lines += 1;
        warn!(line_len, limit = MAX_STREAM_LINE_BYTES, "dropping overlong stream line");
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.is_closed() || self.pending.is_empty() {
            return events;
        }
        let rest = std::mem::take(&mut self.pending);
        self.process_line(&String::from_utf8_lossy(&rest), &mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let envelopes = match parse_envelopes(line) {
            Ok(envelopes) => envelopes,
            Err(e) => {
                self.skipped_lines += 1;
                warn!(error = %e, line_len = line.len(), "skipping malformed stream line");
                return;
            }
        };

        if envelopes.is_empty() {
            debug!("stream line carried no recognized field");
        }

        for envelope in envelopes {
            self.apply(envelope, events);
        }
    }

    fn apply(&mut self, envelope: StreamEnvelope, events: &mut Vec<StreamEvent>) {
        match envelope {
            StreamEnvelope::Error(message) => {
                self.answer.fail();
                self.error = Some(message.clone());
                events.push(StreamEvent::Error { message });
            }
            StreamEnvelope::Language(language) => {
                self.answer.set_language(language.clone());
                events.push(StreamEvent::Language { language });
            }
            StreamEnvelope::Status(status) => events.push(StreamEvent::Status { status }),
            StreamEnvelope::Chunk(chunk) => {
                if let Some(text) = self.answer.push_chunk(&chunk) {
                    let text = text.to_string();
                    events.push(StreamEvent::Delta { chunk, text });
                }
            }
            StreamEnvelope::Complete(final_answer) => {
                if self.answer.finalize(final_answer.as_deref()) {
                    events.push(StreamEvent::Completed {
                        text: self.answer.text().to_string(),
                        original_language: self.answer.original_language().map(str::to_string),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(mode: SplitMode, chunks: &[&str]) -> (StreamDecoder, Vec<StreamEvent>) {
        let mut decoder = StreamDecoder::new(mode);
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk.as_bytes()));
        }
        events.extend(decoder.finish());
        (decoder, events)
    }

    fn completions(events: &[StreamEvent]) -> usize {
        events.iter().filter(|e| matches!(e, StreamEvent::Completed { .. })).count()
    }

    const SAMPLE: [&str; 3] = [
        "{\"status\":\"thinking\"}\n",
        "{\"generated_answer_chunk\":\"Hello \"}\n{\"generated_answer_chunk\":\"world\"}\n",
        "{\"status\":\"complete\",\"generated_answer\":\"Hello world\"}\n",
    ];

    #[test]
    fn sample_stream_in_both_modes() {
        for mode in [SplitMode::Buffered, SplitMode::PerChunk] {
            let (decoder, events) = decode_all(mode, &SAMPLE);
            assert_eq!(decoder.answer().text(), "Hello world", "{mode:?}");
            assert_eq!(completions(&events), 1, "{mode:?}");
            assert_eq!(events[0], StreamEvent::Status { status: "thinking".into() });
        }
    }

    #[test]
    fn buffered_mode_joins_lines_split_across_chunks() {
        let (decoder, events) = decode_all(
            SplitMode::Buffered,
            &["{\"response_chunk\":\"Hel", "lo\"}\n{\"status\":\"com", "plete\"}"],
        );
        assert_eq!(decoder.answer().text(), "Hello");
        assert_eq!(completions(&events), 1);
        assert_eq!(decoder.skipped_lines(), 0);
    }

    #[test]
    fn per_chunk_mode_drops_split_lines() {
        let (decoder, _) =
            decode_all(SplitMode::PerChunk, &["{\"response_chunk\":\"Hel", "lo\"}\n"]);
        assert_eq!(decoder.answer().text(), "");
        assert_eq!(decoder.skipped_lines(), 2);
    }

    #[test]
    fn buffered_mode_handles_multibyte_split() {
        let text = "{\"response_chunk\":\"नमस्ते\"}\n";
        let bytes = text.as_bytes();
        let mut decoder = StreamDecoder::new(SplitMode::Buffered);
        let mut events = decoder.feed(&bytes[..21]);
        events.extend(decoder.feed(&bytes[21..]));
        assert_eq!(decoder.answer().text(), "नमस्ते");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn error_line_stops_decoding() {
        let (decoder, events) = decode_all(
            SplitMode::Buffered,
            &[
                "{\"response_chunk\":\"partial\"}\n{\"error\":\"Retrieval failed\",\"status\":\"error\"}\n",
                "{\"response_chunk\":\" ignored\"}\n",
            ],
        );
        assert_eq!(decoder.error(), Some("Retrieval failed"));
        assert_eq!(decoder.answer().text(), "partial");
        assert_eq!(events.last(), Some(&StreamEvent::Error { message: "Retrieval failed".into() }));
        assert_eq!(completions(&events), 0);
    }

    #[test]
    fn delta_carries_accumulated_text() {
        let (_, events) =
            decode_all(SplitMode::Buffered, &["{\"response_chunk\":\"a\"}\n{\"response_chunk\":\"b\"}\n"]);
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta { chunk: "a".into(), text: "a".into() },
                StreamEvent::Delta { chunk: "b".into(), text: "ab".into() },
            ]
        );
    }

    #[test]
    fn overlong_line_is_dropped_and_decoding_resumes() {
        let mut decoder = StreamDecoder::new(SplitMode::Buffered);
        let filler = vec![b'x'; MAX_STREAM_LINE_BYTES / 2 + 1];

        let mut events = decoder.feed(b"{\"response_chunk\":\"");
        events.extend(decoder.feed(&filler));
        events.extend(decoder.feed(&filler));
        events.extend(decoder.feed(&filler));
        assert!(decoder.pending.is_empty());
        assert_eq!(decoder.skipped_lines(), 1);

        events.extend(decoder.feed(b"\"}\n{\"response_chunk\":\"ok\"}\n"));
        events.extend(decoder.finish());

        assert_eq!(decoder.answer().text(), "ok");
        assert_eq!(decoder.skipped_lines(), 1);
        assert_eq!(events, vec![StreamEvent::Delta { chunk: "ok".into(), text: "ok".into() }]);
    }

    #[test]
    fn line_spread_over_many_chunks_is_reassembled() {
        let line = "{\"response_chunk\":\"steady\"}\n";
        let mut decoder = StreamDecoder::new(SplitMode::Buffered);
        let mut events = Vec::new();
        for byte in line.as_bytes() {
            events.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(decoder.answer().text(), "steady");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let (decoder, _) =
            decode_all(SplitMode::PerChunk, &["{\"response_chunk\":\"x\"}\r\n\r\n"]);
        assert_eq!(decoder.answer().text(), "x");
        assert_eq!(decoder.skipped_lines(), 0);
    }
}

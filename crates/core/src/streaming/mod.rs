//! Streamed answer decoding

pub mod decoder;
pub mod envelope;

pub use decoder::StreamDecoder;
pub use envelope::parse_envelopes;

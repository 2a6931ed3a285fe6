//! Streamed answer transport

pub mod reader;

pub use reader::{read_stream, StreamedAnswer};

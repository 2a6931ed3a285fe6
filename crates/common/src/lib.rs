//! Generic building blocks shared across AgriLink crates.
//!
//! Currently hosts the fixed-interval retry executor used by the request
//! pipeline. Nothing in here knows about HTTP or the backend API.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;

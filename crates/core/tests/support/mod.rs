//! Shared test helpers for `agrilink-core` integration tests.

pub mod repositories;

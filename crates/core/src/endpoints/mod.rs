//! Logical operation to URL mapping

pub mod base_url;
pub mod registry;

pub use base_url::{infer_base_url, resolve_base_url};
pub use registry::{EndpointRegistry, Route};

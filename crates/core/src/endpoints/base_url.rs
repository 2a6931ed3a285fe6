//! Backend base address inference
//!
//! The backend is addressed relative to wherever the client runs. Loopback
//! origins talk to the local development server; any other origin keeps its
//! scheme and host and swaps the front-end port for the backend port.

use agrilink_domain::constants::LOOPBACK_HOSTS;
use agrilink_domain::{AgriLinkError, ApiConfig, Result};
use url::Url;

/// Pick the backend base address for `origin`.
///
/// # Errors
/// Returns [`AgriLinkError::Config`] if `origin` is not an absolute URL.
pub fn infer_base_url(
    origin: &str,
    frontend_port: u16,
    backend_port: u16,
    local_dev_base_url: &str,
) -> Result<String> {
    let mut url = Url::parse(origin)
        .map_err(|e| AgriLinkError::Config(format!("invalid origin '{origin}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| AgriLinkError::Config(format!("origin '{origin}' has no host")))?;

    if LOOPBACK_HOSTS.contains(&host) {
        return Ok(trim_trailing_slash(local_dev_base_url).to_string());
    }

    if url.port() == Some(frontend_port) {
        url.set_port(Some(backend_port))
            .map_err(|()| AgriLinkError::Config(format!("origin '{origin}' cannot carry a port")))?;
    }

    Ok(url.origin().ascii_serialization())
}

/// Resolve the base address from configuration.
///
/// An explicit `base_url` wins; otherwise the address is inferred from
/// `origin`, and with neither set the local development address is used.
pub fn resolve_base_url(config: &ApiConfig) -> Result<String> {
    if let Some(base) = config.base_url.as_deref().filter(|b| !b.trim().is_empty()) {
        Url::parse(base)
            .map_err(|e| AgriLinkError::Config(format!("invalid base_url '{base}': {e}")))?;
        return Ok(trim_trailing_slash(base).to_string());
    }

    match config.origin.as_deref().filter(|o| !o.trim().is_empty()) {
        Some(origin) => infer_base_url(
            origin,
            config.frontend_port,
            config.backend_port,
            &config.local_dev_base_url,
        ),
        None => Ok(trim_trailing_slash(&config.local_dev_base_url).to_string()),
    }
}

fn trim_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}

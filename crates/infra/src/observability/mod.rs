//! Logging setup
//!
//! Everything in the workspace logs through `tracing`. Binaries and tools
//! embedding the client call [`init_tracing`] once at startup; libraries never
//! install a subscriber themselves.

use agrilink_domain::{AgriLinkError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable checked before `RUST_LOG`
pub const LOG_ENV_VAR: &str = "AGRILINK_LOG";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Filter from `AGRILINK_LOG`, then `RUST_LOG`, then `info`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `AgriLinkError::Config` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_current_span(true)).try_init()
        }
    };

    installed.map_err(|e| AgriLinkError::Config(format!("tracing already initialized: {e}")))
}

/// Quiet subscriber for tests; repeated calls are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

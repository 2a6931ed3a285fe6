//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If no backend address is set there, falls back to a config file
//! 4. Probes multiple paths for config files (JSON or TOML)
//! 5. Without any file, uses the defaults (local development backend)
//!
//! ## Environment Variables
//! One of `AGRILINK_BASE_URL` or `AGRILINK_ORIGIN` is required; the rest are
//! optional.
//! - `AGRILINK_BASE_URL`: Explicit backend address
//! - `AGRILINK_ORIGIN`: Origin the client runs under, used for inference
//! - `AGRILINK_REQUEST_TIMEOUT_SECS`: Default request timeout
//! - `AGRILINK_CHAT_TIMEOUT_SECS`: Chat message timeout
//! - `AGRILINK_HEALTH_POLL_SECS`: Health probe interval (unset disables)
//! - `AGRILINK_RETRY_MAX_ATTEMPTS`: Attempts per request including the first
//! - `AGRILINK_RETRY_DELAY_MS`: Pause between attempts
//! - `AGRILINK_STORAGE_PATH`: Directory of the persisted key-value files
//! - `AGRILINK_STREAM_SPLIT_MODE`: `buffered` or `per_chunk`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./agrilink.toml` or `./agrilink.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. `../config.toml` or `../config.json` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use agrilink_domain::{AgriLinkError, Config, Result, SplitMode};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AgriLinkError::Config` if an environment value or the probed file
/// is invalid.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    if env_opt("AGRILINK_BASE_URL").is_some() || env_opt("AGRILINK_ORIGIN").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("No backend address in environment, trying file");
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No configuration found; using defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `AgriLinkError::Config` if neither `AGRILINK_BASE_URL` nor
/// `AGRILINK_ORIGIN` is set, or a value does not parse.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_opt("AGRILINK_BASE_URL");
    let origin = env_opt("AGRILINK_ORIGIN");
    if base_url.is_none() && origin.is_none() {
        return Err(AgriLinkError::Config(
            "Missing required environment variable: AGRILINK_BASE_URL or AGRILINK_ORIGIN".into(),
        ));
    }

    let mut config = Config::default();
    config.api.base_url = base_url;
    config.api.origin = origin;

    if let Some(secs) = env_parse::<u64>("AGRILINK_REQUEST_TIMEOUT_SECS")? {
        config.api.request_timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("AGRILINK_CHAT_TIMEOUT_SECS")? {
        config.api.chat_timeout_secs = secs;
    }
    config.api.health_poll_secs = env_parse::<u64>("AGRILINK_HEALTH_POLL_SECS")?;

    if let Some(attempts) = env_parse::<u32>("AGRILINK_RETRY_MAX_ATTEMPTS")? {
        config.retry.max_attempts = attempts;
    }
    if let Some(delay_ms) = env_parse::<u64>("AGRILINK_RETRY_DELAY_MS")? {
        config.retry.delay_ms = delay_ms;
    }

    if let Some(path) = env_opt("AGRILINK_STORAGE_PATH") {
        config.storage.path = path;
    }
    if let Some(mode) = env_opt("AGRILINK_STREAM_SPLIT_MODE") {
        config.stream.split_mode = parse_split_mode(&mode)?;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AgriLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AgriLinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AgriLinkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AgriLinkError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AgriLinkError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AgriLinkError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AgriLinkError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["agrilink.toml", "agrilink.json", "config.toml", "config.json"];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
        candidates.push(cwd.join("../config.toml"));
        candidates.push(cwd.join("../config.json"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `AgriLinkError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AgriLinkError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

fn parse_split_mode(raw: &str) -> Result<SplitMode> {
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "buffered" => Ok(SplitMode::Buffered),
        "per_chunk" => Ok(SplitMode::PerChunk),
        other => Err(AgriLinkError::Config(format!("Invalid stream split mode: {other}"))),
    }
}

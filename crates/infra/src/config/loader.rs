//! Configuration loader
//!
//! Builds the kit configuration from a probed config file with
//! environment overrides applied on top, so a deployment can pin
//! everything in `idport.toml` and still flip single values per
//! environment.
//!
//! ## Environment Variables
//! - `IDPORT_RP_URL`: Provider RP API base URL
//! - `IDPORT_RP_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `IDPORT_CLIENT_IDENTITY_PEM`: Path to the RP client certificate PEM
//! - `IDPORT_CA_PEM`: Path to the provider CA root PEM
//! - `IDPORT_API_KEY`: Shared boundary API key
//! - `IDPORT_COLLECT_INTERVAL_MS`: Collect poll interval
//! - `IDPORT_QR_REFRESH_INTERVAL_MS`: QR refresh interval
//! - `IDPORT_SESSION_TIMEOUT_MS`: Overall session deadline
//! - `IDPORT_INITIATION_ATTEMPTS`: Initiation retry budget
//! - `IDPORT_INITIATION_RETRY_DELAY_MS`: Delay between initiation attempts
//!
//! ## File Locations
//! The loader probes, in order: `./idport.toml`, `./idport.json`,
//! `./config.toml`, `./config.json`. A missing file is not an error -
//! defaults target the provider's public test environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use idport_domain::{Config, SecretString};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

const PROBE_PATHS: &[&str] = &["idport.toml", "idport.json", "config.toml", "config.json"];

/// Load configuration: probed file as the base, environment on top
///
/// # Errors
///
/// Returns `ConfigError` if a found file cannot be read/parsed or an
/// environment variable holds an unparseable value.
pub fn load() -> Result<Config, ConfigError> {
    let mut config = load_from_file(None)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// With `path = None`, probes the well-known locations and falls back to
/// defaults when nothing is found.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, is in an
/// unsupported format, or fails to parse.
pub fn load_from_file(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match PROBE_PATHS.iter().copied().map(PathBuf::from).find(|p| p.exists()) {
            Some(found) => found,
            None => {
                debug!("No config file found; using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|source| ConfigError::Io { path: path.clone(), source })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| ConfigError::Parse { path: path.clone(), message: err.to_string() })?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|err| ConfigError::Parse { path: path.clone(), message: err.to_string() })?,
        _ => return Err(ConfigError::UnsupportedFormat(path)),
    };

    info!(path = %path.display(), "Configuration loaded from file");
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var("IDPORT_RP_URL") {
        config.provider.base_url = url;
    }
    if let Some(timeout) = env_parsed("IDPORT_RP_TIMEOUT_SECS")? {
        config.provider.request_timeout_secs = timeout;
    }
    if let Ok(path) = std::env::var("IDPORT_CLIENT_IDENTITY_PEM") {
        config.provider.client_identity_pem = Some(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("IDPORT_CA_PEM") {
        config.provider.ca_pem = Some(PathBuf::from(path));
    }
    if let Ok(key) = std::env::var("IDPORT_API_KEY") {
        config.provider.api_key = Some(SecretString::new(key));
    }

    if let Some(interval) = env_parsed("IDPORT_COLLECT_INTERVAL_MS")? {
        config.session.collect_interval_ms = interval;
    }
    if let Some(interval) = env_parsed("IDPORT_QR_REFRESH_INTERVAL_MS")? {
        config.session.qr_refresh_interval_ms = interval;
    }
    if let Some(timeout) = env_parsed("IDPORT_SESSION_TIMEOUT_MS")? {
        config.session.session_timeout_ms = timeout;
    }
    if let Some(attempts) = env_parsed("IDPORT_INITIATION_ATTEMPTS")? {
        config.session.initiation_attempts = attempts;
    }
    if let Some(delay) = env_parsed("IDPORT_INITIATION_RETRY_DELAY_MS")? {
        config.session.initiation_retry_delay_ms = delay;
    }

    Ok(())
}

fn env_parsed<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::InvalidValue { name, message: err.to_string() }),
        Err(_) => Ok(None),
    }
}

//! Configuration structures
//!
//! Deserializable config consumed by the infra loader. Durations are kept
//! as integer fields so TOML/JSON files stay flat; accessors convert to
//! `Duration` for the runtime.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    COLLECT_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RP_BASE_URL,
    INITIATION_MAX_ATTEMPTS, INITIATION_RETRY_DELAY_MS, QR_REFRESH_INTERVAL_MS, SESSION_TIMEOUT_MS,
};
use crate::secret::SecretString;

/// Connection settings for the identity provider's RP API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the RP API (e.g. "https://appapi2.test.bankid.com/rp/v6.0")
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Path to a PEM bundle holding the RP client certificate and key
    pub client_identity_pem: Option<PathBuf>,
    /// Path to an extra CA root (the provider's test CA) in PEM form
    pub ca_pem: Option<PathBuf>,
    /// Shared key authorizing calls into the orchestrator's own boundary
    pub api_key: Option<SecretString>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RP_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            client_identity_pem: None,
            ca_pem: None,
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Cadence and budget settings for one session attempt
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between `collect` polls, in milliseconds
    pub collect_interval_ms: u64,
    /// Interval between rotating-code refreshes, in milliseconds
    pub qr_refresh_interval_ms: u64,
    /// Overall deadline for an outstanding order, in milliseconds
    pub session_timeout_ms: u64,
    /// Maximum initiation attempts before giving up
    pub initiation_attempts: u32,
    /// Fixed delay between initiation attempts, in milliseconds
    pub initiation_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collect_interval_ms: COLLECT_INTERVAL_MS,
            qr_refresh_interval_ms: QR_REFRESH_INTERVAL_MS,
            session_timeout_ms: SESSION_TIMEOUT_MS,
            initiation_attempts: INITIATION_MAX_ATTEMPTS,
            initiation_retry_delay_ms: INITIATION_RETRY_DELAY_MS,
        }
    }
}

impl SessionConfig {
    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.collect_interval_ms)
    }

    pub fn qr_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.qr_refresh_interval_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn initiation_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initiation_retry_delay_ms)
    }
}

/// Top-level configuration for the orchestration kit
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub session: SessionConfig,
}

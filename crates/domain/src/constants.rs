//! Protocol and scheduling constants
//!
//! Centralized location for the provider-defined values the orchestrator
//! must not drift from.

// Provider endpoints
pub const DEFAULT_RP_BASE_URL: &str = "https://appapi2.test.bankid.com/rp/v6.0";

// Rotating-code protocol
pub const QR_CODE_PREFIX: &str = "bankid";
pub const AUTOSTART_URL_SCHEME: &str = "bankid:///";

// Signing payload format accepted by the provider
pub const VISIBLE_DATA_FORMAT: &str = "simpleMarkdownV1";

// Session cadence
pub const COLLECT_INTERVAL_MS: u64 = 2_000;
pub const QR_REFRESH_INTERVAL_MS: u64 = 2_000;
pub const SESSION_TIMEOUT_MS: u64 = 30_000;

// Initiation retry budget
pub const INITIATION_MAX_ATTEMPTS: u32 = 5;
pub const INITIATION_RETRY_DELAY_MS: u64 = 1_000;

// Boundary authorization
pub const API_KEY_HEADER: &str = "x-api-key";

// Outbound request ceiling for a single provider call
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

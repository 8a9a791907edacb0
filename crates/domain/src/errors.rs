//! Error types used throughout the orchestration kit

use thiserror::Error;

/// Errors returned by the relying-party gateway
///
/// Transport and protocol failures are kept apart so the orchestrator can
/// log "service unreachable" differently from "provider answered with a
/// shape we do not understand"; both still resolve the session to the
/// `Error` terminal state.
#[derive(Debug, Clone, Error)]
pub enum RpError {
    /// Network/HTTP failure reaching the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with an error body (`errorCode`/`details`)
    #[error("Provider error {error_code}: {details}")]
    Provider { error_code: String, details: String },

    /// Response was readable but missing expected fields
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request rejected locally before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Cause attached to the `Error` terminal state, for logging
#[derive(Debug, Clone, Error)]
pub enum SessionFault {
    #[error("Initiation failed after {attempts} attempt(s): {source}")]
    Initiation {
        attempts: u32,
        #[source]
        source: RpError,
    },

    #[error("Collect failed: {0}")]
    Collect(#[source] RpError),

    /// A `complete` status without a verifiable subject identifier is not
    /// trustworthy and must not surface as success
    #[error("Completion lacked a verifiable subject identifier: {0}")]
    IncompleteCompletion(String),
}

/// Orchestrator operation errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Start options rejected before initiation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session tasks did not stop within the join deadline
    #[error("Session tasks did not stop within {seconds}s")]
    JoinTimeout { seconds: u64 },
}

/// Result type alias for orchestrator operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

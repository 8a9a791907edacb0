//! Boundary authorization
//!
//! The deploying application fronts the orchestrator with a shared API
//! key (`x-api-key`). Verification is constant time, and a missing key
//! fails identically to a wrong one so callers cannot probe; the two
//! cases stay distinguishable in logs only.

use idport_domain::SecretString;
use thiserror::Error;
use tracing::warn;

/// Boundary authorization errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("Unauthorized")]
    Unauthorized,
}

/// Verify the shared API key presented at the orchestrator's boundary
///
/// # Errors
///
/// Returns `BoundaryError::Unauthorized` when the key is missing or does
/// not match.
pub fn verify_api_key(
    expected: &SecretString,
    presented: Option<&str>,
) -> Result<(), BoundaryError> {
    match presented {
        Some(candidate) if expected.constant_time_eq(candidate) => Ok(()),
        Some(_) => {
            warn!("Rejected boundary call: API key mismatch");
            Err(BoundaryError::Unauthorized)
        }
        None => {
            warn!("Rejected boundary call: API key missing");
            Err(BoundaryError::Unauthorized)
        }
    }
}

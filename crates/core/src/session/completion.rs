//! Completion handling
//!
//! Validates the provider's completion payload and derives the one-time
//! application secret handed to the caller. A `complete` status without a
//! verifiable subject identifier must not surface as success.

use chrono::{DateTime, Utc};
use idport_domain::{CompletionData, Identification, SessionFault};
use sha2::{Digest, Sha256};

/// Validate a completion payload and build the caller-facing result
///
/// The subject identifier is the numeric personal number inside
/// `completionData.user`; a missing or non-numeric value resolves the
/// session to `Error` instead of `Complete`.
pub fn build_identification(
    order_ref: &str,
    completion: Option<CompletionData>,
    completed_at: DateTime<Utc>,
) -> Result<Identification, SessionFault> {
    let completion = completion.ok_or_else(|| {
        SessionFault::IncompleteCompletion("completionData missing from response".to_string())
    })?;

    let personal_number: i64 = completion.user.personal_number.trim().parse().map_err(|_| {
        SessionFault::IncompleteCompletion("personalNumber is not numeric".to_string())
    })?;
    if personal_number <= 0 {
        return Err(SessionFault::IncompleteCompletion(
            "personalNumber is not a valid subject identifier".to_string(),
        ));
    }

    Ok(Identification {
        order_ref: order_ref.to_string(),
        personal_number,
        one_time_secret: derive_one_time_secret(order_ref, completed_at),
        completion,
        completed_at,
    })
}

/// One-time secret: lowercase hex SHA-256 of `<orderRef>-<millis>`
///
/// Derived once at completion and returned to the caller; the
/// orchestrator keeps no copy.
fn derive_one_time_secret(order_ref: &str, completed_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}-{}", order_ref, completed_at.timestamp_millis()).as_bytes());
    hex::encode(hasher.finalize())
}

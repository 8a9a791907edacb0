//! Observable session state
//!
//! A cloneable snapshot published through a watch channel; callers poll
//! or subscribe, they never block on the orchestrator.

use chrono::{DateTime, Utc};
use idport_domain::{Identification, SessionFault, SessionStatus};

use crate::qr;

/// Point-in-time view of the current session
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// Provider-assigned order identifier, set once initiation succeeds
    pub order_ref: Option<String>,
    /// Token for the provider's native-app deep link
    pub auto_start_token: Option<String>,
    /// Wall-clock order creation time
    pub started_at: Option<DateTime<Utc>>,
    /// Current rotating-code payload for QR display
    pub qr_data: Option<String>,
    /// Encoded QR image, present when an encoder is installed
    pub qr_image: Option<Vec<u8>>,
    /// Provider diagnostic from the latest collect response
    pub hint_code: Option<String>,
    /// Completion result, present only on `Complete`
    pub identification: Option<Identification>,
    /// Cause recorded on the `Error` state, for logging
    pub fault: Option<SessionFault>,
}

impl SessionSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_timed_out(&self) -> bool {
        self.status == SessionStatus::TimedOut
    }

    pub fn has_error(&self) -> bool {
        self.status == SessionStatus::Error
    }

    /// Deep link for opening the provider app on the same device
    pub fn autostart_url(&self) -> Option<String> {
        self.auto_start_token.as_deref().map(qr::autostart_url)
    }
}

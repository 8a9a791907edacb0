//! Common data types used throughout the orchestration flow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

/// Kind of order placed at the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Auth,
    Sign,
}

/// Request data for placing a new order
///
/// `end_user_ip` is a provider requirement and must be non-empty.
/// `visible_data` is plain text; it is base64-encoded at the wire and
/// only transmitted for `Sign` orders.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub end_user_ip: String,
    pub visible_data: Option<String>,
}

impl InitiateRequest {
    pub fn new(end_user_ip: impl Into<String>) -> Self {
        Self { end_user_ip: end_user_ip.into(), visible_data: None }
    }

    pub fn with_visible_data(mut self, data: impl Into<String>) -> Self {
        self.visible_data = Some(data.into());
        self
    }
}

/// Provider response to a successful `auth`/`sign` call
#[derive(Debug, Clone)]
pub struct InitiatedOrder {
    pub order_ref: String,
    pub qr_start_token: String,
    pub auto_start_token: String,
    pub qr_start_secret: SecretString,
}

/// Provider-level order status reported by `collect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectStatus {
    Pending,
    Failed,
    Complete,
}

/// Provider response to a `collect` call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub status: CollectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_data: Option<CompletionData>,
}

/// Completion payload delivered by the provider on a completed order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub user: CompletionUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocsp_response: Option<String>,
}

/// Identified end user inside the completion payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionUser {
    pub personal_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

/// Caller-facing result of a completed session
///
/// `one_time_secret` is handed to the caller exactly once; it is derived
/// at completion and never stored by the orchestrator.
#[derive(Debug, Clone)]
pub struct Identification {
    pub order_ref: String,
    pub personal_number: i64,
    pub completion: CompletionData,
    pub one_time_secret: String,
    pub completed_at: DateTime<Utc>,
}

/// Orchestrator-level session status
///
/// Provider-level `collect` statuses fold into this: `pending` keeps the
/// session `Outstanding`, `failed`/`complete` resolve it. `TimedOut` and
/// `Error` are orchestrator-local terminal states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Initiating,
    Outstanding,
    Complete,
    Failed,
    TimedOut,
    Error,
}

impl SessionStatus {
    /// Terminal statuses are sticky until an explicit `start()`/`reset()`
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::TimedOut | Self::Error)
    }

    /// A live session is one the polling loops are still driving
    pub fn is_live(self) -> bool {
        matches!(self, Self::Initiating | Self::Outstanding)
    }
}

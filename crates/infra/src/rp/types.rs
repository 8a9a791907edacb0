//! Wire-level payloads for the provider's RP API
//!
//! Request bodies mirror the provider schema (camelCase). Success bodies
//! are deserialized into option-heavy structs so a missing field can be
//! reported as a precise protocol error instead of a generic parse
//! failure.

use idport_domain::{InitiatedOrder, RpError, SecretString};
use serde::{Deserialize, Serialize};

/// Body of `POST {base}/auth`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload<'a> {
    pub end_user_ip: &'a str,
}

/// Body of `POST {base}/sign`
///
/// `user_visible_data` is base64 over the UTF-8 bytes of the display
/// text; the format marker tells the provider app how to render it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPayload<'a> {
    pub end_user_ip: &'a str,
    pub user_visible_data: String,
    pub user_visible_data_format: &'a str,
}

/// Body of `POST {base}/collect`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectPayload<'a> {
    pub order_ref: &'a str,
}

/// Success body of `auth`/`sign`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWire {
    pub order_ref: Option<String>,
    pub qr_start_token: Option<String>,
    pub qr_start_secret: Option<String>,
    pub auto_start_token: Option<String>,
}

impl OrderWire {
    /// Promote to a domain order, rejecting incomplete responses
    ///
    /// Continuing to poll with incomplete order data would hide the real
    /// failure, so every field is mandatory.
    pub fn into_order(self) -> Result<InitiatedOrder, RpError> {
        let order_ref = require(self.order_ref, "orderRef")?;
        let qr_start_token = require(self.qr_start_token, "qrStartToken")?;
        let qr_start_secret = require(self.qr_start_secret, "qrStartSecret")?;
        let auto_start_token = require(self.auto_start_token, "autoStartToken")?;

        Ok(InitiatedOrder {
            order_ref,
            qr_start_token,
            auto_start_token,
            qr_start_secret: SecretString::new(qr_start_secret),
        })
    }
}

fn require(field: Option<String>, name: &str) -> Result<String, RpError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RpError::Protocol(format!("response is missing {name}"))),
    }
}

/// Error body the provider attaches to non-2xx answers
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorWire {
    pub error_code: String,
    #[serde(default)]
    pub details: String,
}

//! Ports implemented by infrastructure
//!
//! The orchestrator talks to the outside world exclusively through these
//! traits, which keeps the state machine testable with scripted fakes.

use async_trait::async_trait;
use idport_domain::{CollectResponse, InitiateRequest, InitiatedOrder, OrderKind, RpError};

/// Remote call gateway to the identity provider's RP API
///
/// Implementations must not retry internally: the orchestrator owns the
/// retry and polling discipline so timeout accounting stays centralized.
#[async_trait]
pub trait RelyingPartyGateway: Send + Sync {
    /// Place a new order via `auth` or `sign`
    ///
    /// `request.visible_data` is only transmitted for [`OrderKind::Sign`];
    /// the provider's `auth` operation has no such field.
    async fn initiate(
        &self,
        kind: OrderKind,
        request: &InitiateRequest,
    ) -> Result<InitiatedOrder, RpError>;

    /// Ask the provider for the current status of an order
    async fn collect(&self, order_ref: &str) -> Result<CollectResponse, RpError>;
}

/// External QR encoder, consumed as a pure function payload -> image bytes
///
/// Rendering is out of core scope; when no encoder is installed the
/// orchestrator still publishes the raw rotating-code payload. Encoding
/// failures yield "no image", never a session error.
pub trait QrImageEncoder: Send + Sync {
    fn encode(&self, data: &str) -> Result<Vec<u8>, String>;
}

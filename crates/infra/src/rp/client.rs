//! Relying-party HTTP client
//!
//! Implements the `RelyingPartyGateway` port with reqwest. The provider
//! authenticates relying parties with a client TLS certificate; the PEM
//! material comes from `ProviderConfig` and is loaded once at
//! construction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use idport_core::RelyingPartyGateway;
use idport_domain::constants::VISIBLE_DATA_FORMAT;
use idport_domain::{
    CollectResponse, InitiateRequest, InitiatedOrder, OrderKind, ProviderConfig, RpError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::types::{AuthPayload, CollectPayload, ErrorWire, OrderWire, SignPayload};

/// Errors constructing the client (TLS material, reqwest setup)
#[derive(Debug, Error)]
pub enum RpClientBuildError {
    #[error("Failed to read TLS material {path}: {source}")]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP gateway to the provider's RP API
pub struct RpClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpClient {
    /// Build a client from provider configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configured TLS material cannot be read or the
    /// underlying HTTP client cannot be constructed.
    pub fn new(config: &ProviderConfig) -> Result<Self, RpClientBuildError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout());

        if let Some(path) = &config.client_identity_pem {
            let pem = read_pem(path)?;
            builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
        }

        if let Some(path) = &config.ca_pem {
            let pem = read_pem(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self { http: builder.build()?, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    async fn call<B, T>(&self, operation: &str, body: &B) -> Result<T, RpError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, operation);
        debug!(operation, "Calling provider RP API");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| RpError::Transport(format!("{operation}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The provider reports errors as {errorCode, details}; anything
            // else is treated as a plain transport-level failure.
            return match serde_json::from_str::<ErrorWire>(&body) {
                Ok(wire) => {
                    warn!(operation, error_code = %wire.error_code, "Provider rejected call");
                    Err(RpError::Provider { error_code: wire.error_code, details: wire.details })
                }
                Err(_) => Err(RpError::Transport(format!(
                    "{operation} returned status {status}"
                ))),
            };
        }

        response
            .json::<T>()
            .await
            .map_err(|err| RpError::Protocol(format!("{operation}: {err}")))
    }
}

#[async_trait]
impl RelyingPartyGateway for RpClient {
    #[instrument(skip(self, request), fields(kind = ?kind))]
    async fn initiate(
        &self,
        kind: OrderKind,
        request: &InitiateRequest,
    ) -> Result<InitiatedOrder, RpError> {
        if request.end_user_ip.trim().is_empty() {
            return Err(RpError::InvalidInput("endUserIp must be a non-empty string".to_string()));
        }

        let wire: OrderWire = match kind {
            OrderKind::Auth => {
                self.call("auth", &AuthPayload { end_user_ip: &request.end_user_ip }).await?
            }
            OrderKind::Sign => {
                let visible = request.visible_data.as_deref().unwrap_or_default();
                let payload = SignPayload {
                    end_user_ip: &request.end_user_ip,
                    user_visible_data: BASE64.encode(visible.as_bytes()),
                    user_visible_data_format: VISIBLE_DATA_FORMAT,
                };
                self.call("sign", &payload).await?
            }
        };

        wire.into_order()
    }

    #[instrument(skip(self))]
    async fn collect(&self, order_ref: &str) -> Result<CollectResponse, RpError> {
        self.call("collect", &CollectPayload { order_ref }).await
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, RpClientBuildError> {
    std::fs::read(path)
        .map_err(|source| RpClientBuildError::TlsMaterial { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use idport_domain::CollectStatus;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: String) -> RpClient {
        let config = ProviderConfig { base_url, ..ProviderConfig::default() };
        RpClient::new(&config).unwrap()
    }

    fn order_body() -> serde_json::Value {
        serde_json::json!({
            "orderRef": "o1",
            "qrStartToken": "t1",
            "qrStartSecret": "s1",
            "autoStartToken": "ast1"
        })
    }

    #[tokio::test]
    async fn test_auth_sends_end_user_ip() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth"))
            .and(body_json(serde_json::json!({"endUserIp": "192.0.2.10"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(server.uri());
        let order = client
            .initiate(OrderKind::Auth, &InitiateRequest::new("192.0.2.10"))
            .await
            .unwrap();

        assert_eq!(order.order_ref, "o1");
        assert_eq!(order.qr_start_token, "t1");
        assert_eq!(order.qr_start_secret.expose(), "s1");
    }

    #[tokio::test]
    async fn test_sign_encodes_visible_data() {
        let server = MockServer::start().await;

        // "Hej då" as base64 over UTF-8 bytes
        Mock::given(method("POST"))
            .and(path("/sign"))
            .and(body_json(serde_json::json!({
                "endUserIp": "192.0.2.10",
                "userVisibleData": "SGVqIGTDpQ==",
                "userVisibleDataFormat": "simpleMarkdownV1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(server.uri());
        let request = InitiateRequest::new("192.0.2.10").with_visible_data("Hej då");

        client.initiate(OrderKind::Sign, &request).await.unwrap();
    }

    #[tokio::test]
    async fn test_sign_without_visible_data_sends_empty_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sign"))
            .and(body_json(serde_json::json!({
                "endUserIp": "192.0.2.10",
                "userVisibleData": "",
                "userVisibleDataFormat": "simpleMarkdownV1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_body()))
            .mount(&server)
            .await;

        let client = client(server.uri());
        client.initiate(OrderKind::Sign, &InitiateRequest::new("192.0.2.10")).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_end_user_ip_rejected_locally() {
        let server = MockServer::start().await;

        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let client = client(server.uri());
        let err = client
            .initiate(OrderKind::Auth, &InitiateRequest::new("  "))
            .await
            .unwrap_err();

        assert!(matches!(err, RpError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_collect_parses_pending() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collect"))
            .and(body_json(serde_json::json!({"orderRef": "o1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "pending",
                "hintCode": "userSign"
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let response = client.collect("o1").await.unwrap();

        assert_eq!(response.status, CollectStatus::Pending);
        assert_eq!(response.hint_code.as_deref(), Some("userSign"));
    }

    #[tokio::test]
    async fn test_collect_parses_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "complete",
                "completionData": {
                    "user": {"personalNumber": "199001011234", "name": "Anna Andersson"}
                }
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let response = client.collect("o1").await.unwrap();

        assert_eq!(response.status, CollectStatus::Complete);
        let completion = response.completion_data.unwrap();
        assert_eq!(completion.user.personal_number, "199001011234");
    }

    #[tokio::test]
    async fn test_provider_error_body_is_mapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collect"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorCode": "invalidParameters",
                "details": "No such order"
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let err = client.collect("bogus").await.unwrap_err();

        assert!(matches!(
            err,
            RpError::Provider { ref error_code, .. } if error_code == "invalidParameters"
        ));
    }

    #[tokio::test]
    async fn test_http_error_without_provider_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collect"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let err = client.collect("o1").await.unwrap_err();

        assert!(matches!(err, RpError::Transport(_)));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orderRef": "o1",
                "qrStartToken": "t1",
                "autoStartToken": "ast1"
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let err = client
            .initiate(OrderKind::Auth, &InitiateRequest::new("192.0.2.10"))
            .await
            .unwrap_err();

        assert!(matches!(&err, RpError::Protocol(msg) if msg.contains("qrStartSecret")));
    }

    #[tokio::test]
    async fn test_unknown_collect_status_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "somethingNew"})),
            )
            .mount(&server)
            .await;

        let client = client(server.uri());
        let err = client.collect("o1").await.unwrap_err();

        assert!(matches!(err, RpError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        // Nothing listens on the discard port.
        let client = client("http://127.0.0.1:9".to_string());

        let err = client.collect("o1").await.unwrap_err();
        assert!(matches!(err, RpError::Transport(_)));
    }
}

//! Integration tests for the full session flow
//!
//! Wires the real reqwest gateway and the orchestrator together against a
//! mock provider, exercising initiation, polling, rotating codes, and
//! terminal resolution end to end. Intervals are shortened so the flow
//! completes in well under a second of wall-clock time.

use std::sync::Arc;

use idport_core::{SessionOrchestrator, StartOptions};
use idport_domain::{ProviderConfig, SessionConfig, SessionStatus};
use idport_infra::RpClient;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_session_config() -> SessionConfig {
    SessionConfig {
        collect_interval_ms: 50,
        qr_refresh_interval_ms: 50,
        session_timeout_ms: 2_000,
        initiation_attempts: 2,
        initiation_retry_delay_ms: 50,
    }
}

fn gateway_for(server: &MockServer) -> Arc<RpClient> {
    let config = ProviderConfig { base_url: server.uri(), ..ProviderConfig::default() };
    Arc::new(RpClient::new(&config).expect("client should build"))
}

async fn mount_auth_order(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(serde_json::json!({"endUserIp": "192.0.2.10"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "orderRef": "order-1",
            "qrStartToken": "qr-token-1",
            "qrStartSecret": "qr-secret-1",
            "autoStartToken": "auto-token-1"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_auth_session_completes_end_to_end() {
    let server = MockServer::start().await;
    mount_auth_order(&server).await;

    // Two pending answers, then completion.
    Mock::given(method("POST"))
        .and(path("/collect"))
        .and(body_json(serde_json::json!({"orderRef": "order-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "pending",
            "hintCode": "outstandingTransaction"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
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

    let orchestrator = SessionOrchestrator::new(gateway_for(&server), fast_session_config());
    orchestrator.start(StartOptions::auth("192.0.2.10")).await.expect("start should succeed");

    let mut rx = orchestrator.subscribe();
    let snapshot = rx
        .wait_for(|snap| snap.is_terminal())
        .await
        .expect("orchestrator should publish a terminal state")
        .clone();

    assert_eq!(snapshot.status, SessionStatus::Complete);

    let identification = snapshot.identification.expect("completion payload should be present");
    assert_eq!(identification.personal_number, 199_001_011_234);
    assert_eq!(identification.order_ref, "order-1");
    assert_eq!(identification.one_time_secret.len(), 64);

    assert!(orchestrator.secret_store().is_empty());
}

#[tokio::test]
async fn test_qr_payload_comes_from_provider_secret() {
    let server = MockServer::start().await;
    mount_auth_order(&server).await;

    // Collect stays pending; we only care about the published QR payload.
    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "pending"
        })))
        .mount(&server)
        .await;

    let orchestrator = SessionOrchestrator::new(gateway_for(&server), fast_session_config());
    orchestrator.start(StartOptions::auth("192.0.2.10")).await.expect("start should succeed");

    let mut rx = orchestrator.subscribe();
    let snapshot = rx
        .wait_for(|snap| snap.status == SessionStatus::Outstanding)
        .await
        .expect("session should become outstanding")
        .clone();

    let payload = snapshot.qr_data.clone().expect("rotating code should be published");
    assert_eq!(
        payload,
        idport_core::animated_qr_data("qr-token-1", &"qr-secret-1".into(), 0)
            .expect("code should generate")
    );
    assert_eq!(
        snapshot.autostart_url().expect("autostart token should be present"),
        "bankid:///?autostarttoken=auto-token-1&redirect=null"
    );

    orchestrator.reset().await.expect("reset should succeed");
    assert_eq!(orchestrator.snapshot().status, SessionStatus::Idle);
}

#[tokio::test]
async fn test_provider_failure_surfaces_hint_code() {
    let server = MockServer::start().await;
    mount_auth_order(&server).await;

    Mock::given(method("POST"))
        .and(path("/collect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "failed",
            "hintCode": "userCancel"
        })))
        .mount(&server)
        .await;

    let orchestrator = SessionOrchestrator::new(gateway_for(&server), fast_session_config());
    orchestrator.start(StartOptions::auth("192.0.2.10")).await.expect("start should succeed");

    let mut rx = orchestrator.subscribe();
    let snapshot = rx
        .wait_for(|snap| snap.is_terminal())
        .await
        .expect("orchestrator should publish a terminal state")
        .clone();

    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert_eq!(snapshot.hint_code.as_deref(), Some("userCancel"));
    assert!(orchestrator.secret_store().is_empty());
}

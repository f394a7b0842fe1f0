//! Health endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn health_reports_payment_bridge_state() {
    let harness = TestHarness::new();

    let body: serde_json::Value = harness.server.get("/health").await.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "taxi-service");
    assert_eq!(body["payments_enabled"], false);
}

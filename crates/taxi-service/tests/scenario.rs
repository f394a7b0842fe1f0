//! End-to-end ride: request, completion, customer poll, payment.

mod common;

use common::TestHarness;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taxi_core::CustomerToken;

#[tokio::test]
async fn customer_rides_and_pays() {
    let mp = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preferences"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "pref-850",
            "init_point": "https://mp.test/checkout/pref-850",
        })))
        .mount(&mp)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/9001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9001,
            "status": "approved",
            "transaction_amount": 850.0,
        })))
        .mount(&mp)
        .await;

    let harness = TestHarness::with_mercadopago(&mp.uri());
    harness.open_driver().await;
    let (name, value) = harness.driver_auth();
    let customer = CustomerToken::generate();

    // Customer requests a ride.
    let trip = harness.request_trip(&customer).await;
    let trip_id = trip["id"].clone();

    // It shows up in the driver's pending list.
    let summary: Value = harness
        .server
        .get("/v1/trips/summary")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(summary["pending"][0]["id"], trip_id);
    assert_eq!(summary["pending"][0]["pickup"], "Av. Principal 123");

    // The customer sees it pending.
    let latest: Value = harness
        .server
        .get("/v1/public/trips/latest")
        .add_query_param("customer_id", customer.to_string())
        .await
        .json();
    assert_eq!(latest["trip"]["status"], "pending");

    // Driver completes it.
    harness
        .server
        .post(&format!("/v1/trips/{trip_id}/transition"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "outcome": "completed", "price": "850.00" }))
        .await
        .assert_status_ok();

    // The customer's next poll observes the outcome.
    let latest: Value = harness
        .server
        .get("/v1/public/trips/latest")
        .add_query_param("customer_id", customer.to_string())
        .await
        .json();
    assert_eq!(latest["trip"]["status"], "completed");
    assert_eq!(latest["trip"]["price"], 850.0);

    // Customer pays.
    let preference: Value = harness
        .server
        .post("/create-preference")
        .json(&json!({
            "title": "Viaje",
            "price": latest["trip"]["price"],
            "owner_id": harness.driver_id.to_string(),
            "client_id": customer.to_string(),
            "trip_id": trip_id,
        }))
        .await
        .json();
    assert_eq!(preference["id"], "pref-850");

    // The processor notifies.
    harness
        .server
        .post("/payment-webhook")
        .add_query_param("id", "9001")
        .add_query_param("topic", "payment")
        .add_query_param("owner_id", harness.driver_id.to_string())
        .add_query_param("client_id", customer.to_string())
        .add_query_param("trip_id", trip_id.to_string())
        .await
        .assert_status_ok();

    let payments: Vec<Value> = harness
        .server
        .get("/v1/payments")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["mp_payment_id"], "9001");
    assert_eq!(payments[0]["amount_cents"], 85_000);
    assert_eq!(payments[0]["trip_id"], trip_id);
    assert_eq!(payments[0]["client_id"], customer.to_string());
}

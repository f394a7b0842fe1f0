//! Common test utilities for taxi integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use taxi_core::{
    CustomerToken, DriverId, DriverProfile, Expense, NewTripRequest, PaymentRecord, Transition,
    TripId, TripRequest,
};
use taxi_service::{create_router, AppState, ChangeFeed, ServiceConfig};
use taxi_store::{MemoryStore, Store, StoreError};

/// Shared secret the test tokens are signed with.
pub const JWT_SECRET: &str = "integration-test-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the store, for arranging and inspecting state.
    pub store: Arc<dyn Store>,
    /// Handle on the service's change feed.
    pub feed: ChangeFeed,
    /// A driver to authenticate as.
    pub driver_id: DriverId,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness whose payment bridge talks to `mp_api_url`.
    pub fn with_mercadopago(mp_api_url: &str) -> Self {
        Self::with_config(ServiceConfig {
            mp_access_token: Some("TEST-access-token".into()),
            mp_api_url: mp_api_url.into(),
            ..test_config()
        })
    }

    /// Create a harness over a store that fails every call.
    pub fn with_failing_store() -> Self {
        Self::with_store(Arc::new(FailingStore), test_config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// Create a harness over any store.
    pub fn with_store(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let (router, feed) = build_router(Arc::clone(&store), config);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            feed,
            driver_id: DriverId::generate(),
        }
    }

    /// Create a harness served over a real socket, so WebSockets can connect.
    pub fn over_http(config: ServiceConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (router, feed) = build_router(Arc::clone(&store), config);
        let server = TestServer::builder()
            .http_transport()
            .build(router)
            .expect("Failed to create test server");

        Self {
            server,
            store,
            feed,
            driver_id: DriverId::generate(),
        }
    }

    /// Authorization header for the harness driver.
    pub fn driver_auth(&self) -> (HeaderName, HeaderValue) {
        auth_header(&self.driver_id)
    }

    /// Create the harness driver's profile and open it for requests.
    pub async fn open_driver(&self) {
        let (name, value) = self.driver_auth();
        self.server
            .post("/v1/drivers/me")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        self.server
            .put("/v1/drivers/me/availability")
            .add_header(name, value)
            .json(&json!({ "available": true }))
            .await
            .assert_status_ok();
    }

    /// Create a trip for the harness driver and return its JSON.
    pub async fn request_trip(&self, customer: &CustomerToken) -> Value {
        let response = self
            .server
            .post("/v1/public/trips")
            .json(&trip_body(&self.driver_id, customer))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}

fn build_router(store: Arc<dyn Store>, config: ServiceConfig) -> (Router, ChangeFeed) {
    let state = AppState::new(store, config);
    let feed = state.feed.clone();
    (create_router(state), feed)
}

/// The service listening on a loopback port, for clients outside the test server.
pub struct LiveService {
    /// Base URL clients connect to.
    pub base_url: String,
    /// A driver to authenticate as.
    pub driver_id: DriverId,
    /// Direct handle on the store.
    pub store: Arc<dyn Store>,
    task: tokio::task::JoinHandle<()>,
}

impl LiveService {
    /// Bind `127.0.0.1:0` and serve a fresh router on it.
    pub async fn start() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (router, _) = build_router(Arc::clone(&store), test_config());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            driver_id: DriverId::generate(),
            store,
            task,
        }
    }

    /// Call the driver API as the harness driver.
    pub fn driver_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(driver_token(&self.driver_id))
    }

    /// Create the harness driver's profile and open it for requests.
    pub async fn open_driver(&self) {
        self.driver_request(reqwest::Method::POST, "/v1/drivers/me")
            .send()
            .await
            .expect("Profile request failed")
            .error_for_status()
            .expect("Profile not created");
        self.set_availability(true).await;
    }

    /// Open or close the harness driver.
    pub async fn set_availability(&self, available: bool) {
        self.driver_request(reqwest::Method::PUT, "/v1/drivers/me/availability")
            .json(&json!({ "available": available }))
            .send()
            .await
            .expect("Availability request failed")
            .error_for_status()
            .expect("Availability not updated");
    }

    /// Decide a trip as the harness driver.
    pub async fn transition(&self, trip_id: TripId, body: Value) {
        self.driver_request(reqwest::Method::POST, &format!("/v1/trips/{trip_id}/transition"))
            .json(&body)
            .send()
            .await
            .expect("Transition request failed")
            .error_for_status()
            .expect("Transition rejected");
    }
}

impl Drop for LiveService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration with JWT verification and no payment processor.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        jwt_secret: Some(JWT_SECRET.into()),
        public_base_url: "https://taxi.test".into(),
        frontend_url: "https://app.taxi.test".into(),
        ..ServiceConfig::default()
    }
}

/// Sign a driver token the way the identity provider does.
pub fn driver_token(driver_id: &DriverId) -> String {
    let claims = json!({
        "sub": driver_id.to_string(),
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
        "email": "maria@mail.com",
        "user_metadata": { "full_name": "Maria Lopez" },
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Authorization header for any driver.
pub fn auth_header(driver_id: &DriverId) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("Bearer {}", driver_token(driver_id)))
        .expect("Invalid header value");
    (AUTHORIZATION, value)
}

/// A complete trip creation body.
pub fn trip_body(driver_id: &DriverId, customer: &CustomerToken) -> Value {
    json!({
        "driver_id": driver_id.to_string(),
        "customer_id": customer.to_string(),
        "passenger_name": "Juan Perez",
        "pickup": "Av. Principal 123",
        "destination": "Centro",
    })
}

/// A store whose every operation fails like a lost connection.
pub struct FailingStore;

fn down<T>() -> taxi_store::Result<T> {
    Err(StoreError::Database("connection refused".into()))
}

impl Store for FailingStore {
    fn get_driver(&self, _: &DriverId) -> taxi_store::Result<Option<DriverProfile>> {
        down()
    }

    fn ensure_driver(&self, _: &DriverProfile) -> taxi_store::Result<DriverProfile> {
        down()
    }

    fn update_driver(
        &self,
        _: &DriverId,
        _: &dyn Fn(&mut DriverProfile),
    ) -> taxi_store::Result<DriverProfile> {
        down()
    }

    fn list_drivers(&self) -> taxi_store::Result<Vec<DriverProfile>> {
        down()
    }

    fn create_trip(&self, _: &NewTripRequest) -> taxi_store::Result<TripRequest> {
        down()
    }

    fn get_trip(&self, _: TripId) -> taxi_store::Result<Option<TripRequest>> {
        down()
    }

    fn list_trips_by_owner(&self, _: &DriverId) -> taxi_store::Result<Vec<TripRequest>> {
        down()
    }

    fn latest_trip_for_customer(
        &self,
        _: &CustomerToken,
    ) -> taxi_store::Result<Option<TripRequest>> {
        down()
    }

    fn transition_trip(
        &self,
        _: TripId,
        _: &DriverId,
        _: Transition,
    ) -> taxi_store::Result<TripRequest> {
        down()
    }

    fn upsert_payment(&self, _: &PaymentRecord) -> taxi_store::Result<()> {
        down()
    }

    fn get_payment(&self, _: &str) -> taxi_store::Result<Option<PaymentRecord>> {
        down()
    }

    fn list_payments_by_owner(&self, _: &DriverId) -> taxi_store::Result<Vec<PaymentRecord>> {
        down()
    }

    fn put_expense(&self, _: &Expense) -> taxi_store::Result<()> {
        down()
    }

    fn list_expenses_by_owner(&self, _: &DriverId) -> taxi_store::Result<Vec<Expense>> {
        down()
    }
}

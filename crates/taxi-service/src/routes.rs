//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::map_response;
use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{bridge, drivers, expenses, feed, health, payments, public, trips};
use crate::state::AppState;

/// Maximum concurrent requests for the public customer endpoints.
const PUBLIC_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for driver endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Customers (no auth, rate-limited)
/// - `GET /v1/public/drivers` - List drivers with availability
/// - `POST /v1/public/trips` - Request a trip
/// - `GET /v1/public/trips/latest` - Latest trip for a customer token
/// - `GET /v1/public/payments/:mp_payment_id` - Payment result
/// - `GET /v1/public/feed/trips` - Trip changes for a token (WebSocket)
/// - `GET /v1/public/feed/drivers` - Driver listing changes (WebSocket)
///
/// ## Drivers (JWT auth)
/// - `POST /v1/drivers/me` - Ensure profile
/// - `GET /v1/drivers/me` - Get profile
/// - `PATCH /v1/drivers/me` - Edit profile
/// - `PUT /v1/drivers/me/availability` - Open or close for requests
/// - `PUT /v1/drivers/me/costs` - Running-cost settings
/// - `GET /v1/trips` - Own trips, newest first
/// - `GET /v1/trips/summary` - One day bucketed by status
/// - `POST /v1/trips/:id/transition` - Complete or cancel
/// - `POST /v1/expenses` - Record expense
/// - `GET /v1/expenses` - List expenses
/// - `GET /v1/earnings` - Daily and monthly earnings
/// - `GET /v1/payments` - Payments correlated to the driver
/// - `GET /v1/feed/trips` - Own trip changes (WebSocket)
///
/// ## Payment bridge (permissive CORS, no rate limit)
/// - `POST /create-preference` - Create a checkout preference
/// - `POST /payment-webhook` - Mercado Pago notifications
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Customers are anonymous, so these get their own, wider limit.
    let public_routes = Router::new()
        .route("/drivers", get(public::list_drivers))
        .route("/trips", post(public::create_trip))
        .route("/trips/latest", get(public::latest_trip))
        .route("/payments/:mp_payment_id", get(payments::get_payment))
        .route("/feed/trips", get(feed::customer_trip_feed))
        .route("/feed/drivers", get(feed::driver_listing_feed))
        .layer(ConcurrencyLimitLayer::new(PUBLIC_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Profile
        .route(
            "/drivers/me",
            post(drivers::ensure_profile)
                .get(drivers::get_profile)
                .patch(drivers::update_profile),
        )
        .route("/drivers/me/availability", put(drivers::set_availability))
        .route("/drivers/me/costs", put(drivers::update_costs))
        // Trips
        .route("/trips", get(trips::list_trips))
        .route("/trips/summary", get(trips::day_summary))
        .route("/trips/:id/transition", post(trips::transition_trip))
        // Expenses and earnings
        .route(
            "/expenses",
            post(expenses::record_expense).get(expenses::list_expenses),
        )
        .route("/earnings", get(expenses::earnings))
        // Payments
        .route("/payments", get(payments::list_payments))
        // Change feed
        .route("/feed/trips", get(feed::driver_trip_feed))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .nest("/public", public_routes);

    // The bridge is called straight from the browser and sets its own CORS headers.
    let bridge_routes = Router::new()
        .route(
            "/create-preference",
            post(bridge::create_preference).options(bridge::preflight),
        )
        .route(
            "/payment-webhook",
            post(bridge::payment_webhook).options(bridge::preflight),
        )
        .layer(map_response(bridge::bridge_cors));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(cors)
        .merge(bridge_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

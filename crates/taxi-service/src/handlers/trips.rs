//! Driver trip handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use taxi_core::money::decimal_from_cents;
use taxi_core::{DaySummary, Transition, TripId, TripRequest};

use crate::auth::AuthDriver;
use crate::error::ApiError;
use crate::feed::ChangeEvent;
use crate::state::AppState;

/// A trip as returned by the API.
#[derive(Debug, Serialize)]
pub struct TripResponse {
    /// The stored trip.
    #[serde(flatten)]
    pub trip: TripRequest,
    /// Price as a decimal, for display.
    pub price: Option<f64>,
}

impl From<TripRequest> for TripResponse {
    fn from(trip: TripRequest) -> Self {
        let price = trip.price_cents.map(decimal_from_cents);
        Self { trip, price }
    }
}

/// List the driver's trips, newest first.
pub async fn list_trips(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let trips = state.store.list_trips_by_owner(&auth.driver_id)?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

/// Day summary query.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Day to summarize (UTC); defaults to today.
    pub day: Option<NaiveDate>,
}

/// Day summary response.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Trips bucketed by status.
    #[serde(flatten)]
    pub summary: DaySummary,
    /// Income as a decimal.
    pub income: f64,
}

/// Bucket one day of the driver's trips by status.
pub async fn day_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let day = query.day.unwrap_or_else(|| Utc::now().date_naive());
    let trips = state.store.list_trips_by_owner(&auth.driver_id)?;
    let summary = DaySummary::for_day(&trips, day);

    Ok(Json(SummaryResponse {
        income: decimal_from_cents(summary.income_cents),
        summary,
    }))
}

/// Transition request.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// `completed` or `cancelled`.
    #[serde(default)]
    pub outcome: String,
    /// Price, required when completing. A number or numeric string.
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

/// Complete or cancel one of the driver's pending trips.
pub async fn transition_trip(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Path(trip_id): Path<String>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip_id: TripId = trip_id
        .parse()
        .map_err(|e: taxi_core::IdError| ApiError::BadRequest(e.to_string()))?;
    let transition = Transition::parse(&body.outcome, body.price.as_ref())?;

    let trip = state
        .store
        .transition_trip(trip_id, &auth.driver_id, transition)?;

    tracing::info!(
        trip_id = %trip.id,
        driver_id = %auth.driver_id,
        status = %trip.status,
        price_cents = ?trip.price_cents,
        "Trip transitioned"
    );
    state.feed.publish(ChangeEvent::trip(&trip));

    Ok(Json(trip.into()))
}

//! Public customer-facing handlers.
//!
//! Customers have no account. They browse drivers, create trip requests and
//! read back the latest request made with their customer token.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use taxi_core::{CustomerToken, DriverId, DriverProfile, TaxiError, TripRequestDraft};

use crate::error::ApiError;
use crate::feed::ChangeEvent;
use crate::handlers::trips::TripResponse;
use crate::state::AppState;

/// A driver as shown to customers.
#[derive(Debug, Serialize)]
pub struct PublicDriver {
    /// Driver ID, used as `driver_id` when requesting a trip.
    pub owner_id: DriverId,
    /// Name to show.
    pub name: String,
    /// Vehicle model.
    pub car_model: Option<String>,
    /// Vehicle plate.
    pub car_plate: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Avatar URL.
    pub picture_url: Option<String>,
    /// Whether the driver accepts new requests right now.
    pub available: bool,
}

impl From<&DriverProfile> for PublicDriver {
    fn from(profile: &DriverProfile) -> Self {
        Self {
            owner_id: profile.owner_id,
            name: profile.public_name().to_string(),
            car_model: profile.car_model.clone(),
            car_plate: profile.car_plate.clone(),
            phone: profile.phone.clone(),
            picture_url: profile.picture_url.clone(),
            available: profile.available,
        }
    }
}

/// Driver listing query.
#[derive(Debug, Deserialize)]
pub struct DriverSearch {
    /// Case-insensitive filter over name, vehicle and phone.
    #[serde(default)]
    pub search: Option<String>,
}

/// List all drivers, available or not.
pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverSearch>,
) -> Result<Json<Vec<PublicDriver>>, ApiError> {
    let term = query.search.unwrap_or_default();
    let drivers = state
        .store
        .list_drivers()?
        .iter()
        .filter(|d| d.matches_search(&term))
        .map(PublicDriver::from)
        .collect();

    Ok(Json(drivers))
}

/// Trip creation request.
#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    /// Target driver.
    #[serde(default)]
    pub driver_id: String,
    /// The customer's correlation token.
    #[serde(default)]
    pub customer_id: String,
    /// Passenger and route details.
    #[serde(flatten)]
    pub draft: TripRequestDraft,
}

/// Create a pending trip request for an available driver.
///
/// Publishes a feed event so the driver's pending list refreshes.
pub async fn create_trip(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<TripResponse>), ApiError> {
    let missing: Vec<&str> = [("driver_id", &body.driver_id), ("customer_id", &body.customer_id)]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        return Err(TaxiError::missing(missing).into());
    }

    let driver_id: DriverId = body.driver_id.trim().parse().map_err(TaxiError::from)?;
    let customer_id: CustomerToken = body.customer_id.parse().map_err(TaxiError::from)?;
    let new = body.draft.validate(driver_id, customer_id)?;

    let trip = state.store.create_trip(&new)?;

    tracing::info!(
        trip_id = %trip.id,
        driver_id = %trip.owner_id,
        "Trip request created"
    );
    state.feed.publish(ChangeEvent::trip(&trip));

    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// Customer token query.
#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    /// The customer's correlation token.
    #[serde(default)]
    pub customer_id: String,
}

impl CustomerQuery {
    /// Parse the token, naming the field when absent.
    pub(crate) fn token(&self) -> Result<CustomerToken, ApiError> {
        if self.customer_id.trim().is_empty() {
            return Err(TaxiError::missing(["customer_id"]).into());
        }
        self.customer_id
            .parse::<CustomerToken>()
            .map_err(|e| TaxiError::from(e).into())
    }
}

/// Latest trip response.
#[derive(Debug, Serialize)]
pub struct LatestTripResponse {
    /// The most recent trip for the token, if any.
    pub trip: Option<TripResponse>,
}

/// The most recent trip request created with a customer token.
pub async fn latest_trip(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<LatestTripResponse>, ApiError> {
    let token = query.token()?;
    let trip = state.store.latest_trip_for_customer(&token)?;

    Ok(Json(LatestTripResponse {
        trip: trip.map(TripResponse::from),
    }))
}

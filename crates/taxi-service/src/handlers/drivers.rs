//! Driver profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use taxi_core::money::cents_from_json;
use taxi_core::{DriverProfile, ProfilePatch};

use crate::auth::AuthDriver;
use crate::error::ApiError;
use crate::feed::ChangeEvent;
use crate::state::AppState;

/// Create the driver's profile on first sign-in, or return the existing one.
///
/// An existing profile without a display name is backfilled from the token.
pub async fn ensure_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
) -> Result<Json<DriverProfile>, ApiError> {
    if let Some(existing) = state.store.get_driver(&auth.driver_id)? {
        if existing.display_name.is_some() || auth.identity.display_name.is_none() {
            return Ok(Json(existing));
        }

        let identity = auth.identity.clone();
        let profile = state.store.update_driver(&auth.driver_id, &|profile| {
            profile.backfill(&identity);
        })?;
        tracing::info!(driver_id = %auth.driver_id, "Driver display name backfilled");
        state.feed.publish(ChangeEvent::driver(&profile));
        return Ok(Json(profile));
    }

    let profile = state
        .store
        .ensure_driver(&DriverProfile::new(auth.driver_id, &auth.identity))?;

    tracing::info!(
        driver_id = %auth.driver_id,
        username = %profile.username,
        available = profile.available,
        "Driver profile created"
    );
    state.feed.publish(ChangeEvent::driver(&profile));

    Ok(Json(profile))
}

/// Get the driver's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
) -> Result<Json<DriverProfile>, ApiError> {
    state
        .store
        .get_driver(&auth.driver_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("driver not found: {}", auth.driver_id)))
}

/// Edit display fields of the driver's profile.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<DriverProfile>, ApiError> {
    if patch.is_empty() {
        return get_profile(State(state), auth).await;
    }

    let profile = state
        .store
        .update_driver(&auth.driver_id, &|profile| patch.apply(profile))?;

    tracing::info!(driver_id = %auth.driver_id, "Driver profile updated");
    state.feed.publish(ChangeEvent::driver(&profile));

    Ok(Json(profile))
}

/// Availability request.
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    /// Whether new trip requests may target the driver.
    pub available: bool,
}

/// Open or close the driver for new trip requests.
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<DriverProfile>, ApiError> {
    let profile = state
        .store
        .set_availability(&auth.driver_id, body.available)?;

    tracing::info!(
        driver_id = %auth.driver_id,
        available = profile.available,
        "Driver availability changed"
    );
    state.feed.publish(ChangeEvent::driver(&profile));

    Ok(Json(profile))
}

/// Cost settings request. Amounts are decimals; absent fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct CostsRequest {
    /// Cost of one gas fill.
    #[serde(default)]
    pub gas_unit_cost: Option<serde_json::Value>,
    /// Monthly insurance.
    #[serde(default)]
    pub insurance_monthly: Option<serde_json::Value>,
    /// Monthly registration.
    #[serde(default)]
    pub registration_monthly: Option<serde_json::Value>,
}

/// Update the driver's running-cost settings.
pub async fn update_costs(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Json(body): Json<CostsRequest>,
) -> Result<Json<DriverProfile>, ApiError> {
    let parse = |value: Option<&serde_json::Value>| value.map(cents_from_json).transpose();
    let gas = parse(body.gas_unit_cost.as_ref())?;
    let insurance = parse(body.insurance_monthly.as_ref())?;
    let registration = parse(body.registration_monthly.as_ref())?;

    let profile = state.store.update_driver(&auth.driver_id, &|profile| {
        if let Some(cents) = gas {
            profile.costs.gas_unit_cost_cents = cents;
        }
        if let Some(cents) = insurance {
            profile.costs.insurance_monthly_cents = cents;
        }
        if let Some(cents) = registration {
            profile.costs.registration_monthly_cents = cents;
        }
        profile.updated_at = chrono::Utc::now();
    })?;

    tracing::info!(driver_id = %auth.driver_id, "Driver cost settings updated");

    Ok(Json(profile))
}

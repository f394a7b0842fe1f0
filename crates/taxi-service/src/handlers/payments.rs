//! Payment record handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use taxi_core::money::decimal_from_cents;
use taxi_core::PaymentRecord;

use crate::auth::AuthDriver;
use crate::error::ApiError;
use crate::state::AppState;

/// A payment record as returned by the API.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// The stored record.
    #[serde(flatten)]
    pub record: PaymentRecord,
    /// Amount as a decimal.
    pub amount: Option<f64>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        let amount = record.amount_cents.map(decimal_from_cents);
        Self { record, amount }
    }
}

/// Look up a payment by its Mercado Pago id.
///
/// Returns 404 until the webhook for it has been ingested.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(mp_payment_id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    state
        .store
        .get_payment(&mp_payment_id)?
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::NotFound(format!("payment not found: {mp_payment_id}")))
}

/// List payments correlated to the driver.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.store.list_payments_by_owner(&auth.driver_id)?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

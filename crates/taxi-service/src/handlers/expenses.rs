//! Expense and earnings handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use taxi_core::earnings::recent_months;
use taxi_core::money::cents_from_json;
use taxi_core::{DailyEarnings, Expense, ExpenseKind, MonthlyEarnings, TaxiError};

use crate::auth::AuthDriver;
use crate::error::ApiError;
use crate::state::AppState;

/// Months included in the earnings report.
const REPORT_MONTHS: u32 = 6;

/// Expense creation request.
#[derive(Debug, Deserialize)]
pub struct RecordExpenseRequest {
    /// `gas`, or a free-form label.
    #[serde(default)]
    pub kind: String,
    /// Decimal amount; gas fills default to the configured unit cost.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Day the expense applies to; defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Record an expense.
pub async fn record_expense(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Json(body): Json<RecordExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let kind = match body.kind.trim() {
        "" => return Err(TaxiError::missing(["kind"]).into()),
        "gas" => ExpenseKind::Gas,
        label => ExpenseKind::Other(label.to_string()),
    };
    let amount_cents = body
        .amount
        .as_ref()
        .filter(|v| !v.is_null())
        .map(cents_from_json)
        .transpose()?;
    let costs = state
        .store
        .get_driver(&auth.driver_id)?
        .map(|profile| profile.costs)
        .unwrap_or_default();

    let expense = Expense::record(
        auth.driver_id,
        kind,
        amount_cents,
        body.date.unwrap_or_else(|| Utc::now().date_naive()),
        &costs,
    )?;
    state.store.put_expense(&expense)?;

    tracing::info!(
        driver_id = %auth.driver_id,
        expense_id = %expense.id,
        kind = %expense.kind.as_str(),
        amount_cents = expense.amount_cents,
        "Expense recorded"
    );

    Ok((StatusCode::CREATED, Json(expense)))
}

/// List the driver's expenses, newest first.
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(state.store.list_expenses_by_owner(&auth.driver_id)?))
}

/// Earnings query.
#[derive(Debug, Deserialize)]
pub struct EarningsQuery {
    /// Day for the daily figures (UTC); defaults to today.
    pub day: Option<NaiveDate>,
}

/// Earnings report.
#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    /// Figures for the requested day.
    pub daily: DailyEarnings,
    /// The last six months, oldest first.
    pub monthly: Vec<MonthlyEarnings>,
}

/// Daily and monthly earnings from completed trips and expenses.
pub async fn earnings(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    Query(query): Query<EarningsQuery>,
) -> Result<Json<EarningsResponse>, ApiError> {
    let day = query.day.unwrap_or_else(|| Utc::now().date_naive());
    let trips = state.store.list_trips_by_owner(&auth.driver_id)?;
    let expenses = state.store.list_expenses_by_owner(&auth.driver_id)?;
    let costs = state
        .store
        .get_driver(&auth.driver_id)?
        .map(|profile| profile.costs)
        .unwrap_or_default();

    let monthly = recent_months(day, REPORT_MONTHS)
        .into_iter()
        .map(|(year, month)| MonthlyEarnings::compute(&trips, &expenses, &costs, year, month))
        .collect();

    Ok(Json(EarningsResponse {
        daily: DailyEarnings::compute(&trips, &expenses, day),
        monthly,
    }))
}

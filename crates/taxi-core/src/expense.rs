//! Driver expenses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::driver::CostSettings;
use crate::error::{Result, TaxiError};
use crate::ids::{DriverId, ExpenseId};

/// What an expense was for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    /// A gas fill.
    Gas,
    /// Anything else, with a free-form label.
    Other(String),
}

impl ExpenseKind {
    /// Get the kind name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gas => "gas",
            Self::Other(label) => label,
        }
    }
}

/// A recorded driver expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense id (time-ordered).
    pub id: ExpenseId,
    /// Driver who paid it.
    pub owner_id: DriverId,
    /// What it was for.
    pub kind: ExpenseKind,
    /// Amount in cents.
    pub amount_cents: i64,
    /// Day the expense applies to.
    pub date: NaiveDate,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Record an expense, defaulting gas fills to the configured unit cost.
    ///
    /// # Errors
    ///
    /// Returns `TaxiError::Validation` naming `amount` when a non-gas
    /// expense has none, and `TaxiError::InvalidAmount` for negatives.
    pub fn record(
        owner_id: DriverId,
        kind: ExpenseKind,
        amount_cents: Option<i64>,
        date: NaiveDate,
        costs: &CostSettings,
    ) -> Result<Self> {
        let amount_cents = match (amount_cents, &kind) {
            (Some(amount), _) => amount,
            (None, ExpenseKind::Gas) => costs.gas_unit_cost_cents,
            (None, ExpenseKind::Other(_)) => return Err(TaxiError::missing(["amount"])),
        };
        if amount_cents < 0 {
            return Err(TaxiError::InvalidAmount("amount must not be negative".into()));
        }

        Ok(Self {
            id: ExpenseId::generate(),
            owner_id,
            kind,
            amount_cents,
            date,
            created_at: Utc::now(),
        })
    }
}

//! Conversions between wire decimals and stored cents.

use crate::error::{Result, TaxiError};

/// Largest accepted amount, in whole currency units.
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Convert a decimal amount (`850.5`) to cents (`85050`).
///
/// # Errors
///
/// Returns `TaxiError::InvalidAmount` for NaN, infinities, negatives and
/// amounts above [`MAX_AMOUNT`].
#[allow(clippy::cast_possible_truncation)]
pub fn cents_from_decimal(amount: f64) -> Result<i64> {
    if !amount.is_finite() {
        return Err(TaxiError::InvalidAmount("amount must be a finite number".into()));
    }
    if amount < 0.0 {
        return Err(TaxiError::InvalidAmount("amount must not be negative".into()));
    }
    if amount > MAX_AMOUNT {
        return Err(TaxiError::InvalidAmount("amount is too large".into()));
    }
    // Bounded above, so the cast cannot overflow.
    Ok((amount * 100.0).round() as i64)
}

/// Convert cents back to a decimal amount.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decimal_from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Parse a JSON amount that may be a number or a numeric string.
///
/// Form inputs often arrive as strings (`"850.00"`), so both are accepted.
///
/// # Errors
///
/// Returns `TaxiError::InvalidAmount` when the value is neither, or when the
/// number is rejected by [`cents_from_decimal`].
pub fn cents_from_json(value: &serde_json::Value) -> Result<i64> {
    let amount = match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| TaxiError::InvalidAmount("amount is not representable".into()))?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| TaxiError::InvalidAmount(format!("not a number: {s:?}")))?,
        other => {
            return Err(TaxiError::InvalidAmount(format!(
                "expected a number, got {other}"
            )))
        }
    };
    cents_from_decimal(amount)
}

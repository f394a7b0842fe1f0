//! Payment bridge types.
//!
//! Payments never mutate a trip. A payment outcome is stored as its own
//! record, keyed by the processor's payment id and correlated to the trip
//! loosely through the driver id, customer token and (when the caller
//! supplied it) the trip id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxiError};
use crate::ids::TripId;
use crate::money;

/// Notification topic that carries a payment.
pub const PAYMENT_TOPIC: &str = "payment";

/// Title used when the caller sends none.
const DEFAULT_TITLE: &str = "Viaje";

/// Correlation data threaded through the processor and back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCorrelation {
    /// Driver id as sent by the caller (not validated: the bridge may see partial data).
    pub owner_id: Option<String>,
    /// Customer token as sent by the caller.
    #[serde(rename = "client_id")]
    pub customer_id: Option<String>,
    /// Trip the payment is for, when known.
    pub trip_id: Option<TripId>,
}

impl PaymentCorrelation {
    /// Query-string pairs for the notification URL, skipping absent values.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(owner_id) = &self.owner_id {
            pairs.push(("owner_id", owner_id.clone()));
        }
        if let Some(customer_id) = &self.customer_id {
            pairs.push(("client_id", customer_id.clone()));
        }
        if let Some(trip_id) = self.trip_id {
            pairs.push(("trip_id", trip_id.to_string()));
        }
        pairs
    }
}

/// A validated checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Line item title.
    pub title: String,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    /// Number of units.
    pub quantity: u32,
    /// Who the payment is for.
    pub correlation: PaymentCorrelation,
}

impl PaymentIntent {
    /// Build an intent from loosely typed input.
    ///
    /// A blank title becomes `Viaje` and an absent or unparseable quantity
    /// becomes `1`.
    ///
    /// # Errors
    ///
    /// Returns `TaxiError::Validation` if the price is absent and
    /// `TaxiError::InvalidAmount` if it is not a non-negative number.
    pub fn new(
        title: Option<&str>,
        price: Option<&serde_json::Value>,
        quantity: Option<&serde_json::Value>,
        correlation: PaymentCorrelation,
    ) -> Result<Self> {
        let price = price
            .filter(|p| !p.is_null())
            .ok_or_else(|| TaxiError::missing(["price"]))?;

        Ok(Self {
            title: title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            unit_price_cents: money::cents_from_json(price)?,
            quantity: quantity.and_then(parse_quantity).unwrap_or(1),
            correlation,
        })
    }

    /// Unit price as a decimal, the way the processor expects it.
    #[must_use]
    pub fn unit_price(&self) -> f64 {
        money::decimal_from_cents(self.unit_price_cents)
    }
}

fn parse_quantity(value: &serde_json::Value) -> Option<u32> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// A processor notification as received on the webhook.
#[derive(Debug, Clone, Default)]
pub struct WebhookNotification {
    /// Processor payment id.
    pub payment_id: Option<String>,
    /// Notification topic.
    pub topic: Option<String>,
    /// Correlation carried in the notification URL.
    pub correlation: PaymentCorrelation,
}

impl WebhookNotification {
    /// The payment id to ingest, or `None` for housekeeping pings.
    #[must_use]
    pub fn actionable(&self) -> Option<&str> {
        if self.topic.as_deref() != Some(PAYMENT_TOPIC) {
            return None;
        }
        self.payment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A stored payment outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Processor payment id, the upsert key.
    pub mp_payment_id: String,
    /// Notification topic.
    pub topic: String,
    /// Driver id from the correlation data.
    pub owner_id: Option<String>,
    /// Customer token from the correlation data.
    #[serde(rename = "client_id")]
    pub customer_id: Option<String>,
    /// Trip id from the correlation data.
    pub trip_id: Option<TripId>,
    /// Full processor payload, kept for audit.
    pub raw: serde_json::Value,
    /// Transaction amount in cents.
    pub amount_cents: Option<i64>,
    /// Processor status (`approved`, `rejected`, ...).
    pub status: Option<String>,
    /// When this version of the record was written.
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Build a record from the processor's payment payload.
    ///
    /// The id reported in the payload wins over the one in the notification.
    #[must_use]
    pub fn from_processor(
        notified_id: &str,
        correlation: PaymentCorrelation,
        raw: serde_json::Value,
    ) -> Self {
        let mp_payment_id = match raw.get("id") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => notified_id.to_string(),
        };
        let amount_cents = raw
            .get("transaction_amount")
            .and_then(serde_json::Value::as_f64)
            .and_then(|amount| money::cents_from_decimal(amount).ok());
        let status = raw
            .get("status")
            .and_then(serde_json::Value::as_str)
            .map(String::from);

        Self {
            mp_payment_id,
            topic: PAYMENT_TOPIC.to_string(),
            owner_id: correlation.owner_id,
            customer_id: correlation.customer_id,
            trip_id: correlation.trip_id,
            raw,
            amount_cents,
            status,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intent_defaults() {
        let intent = PaymentIntent::new(
            Some("  "),
            Some(&json!("850.00")),
            Some(&json!("x")),
            PaymentCorrelation::default(),
        )
        .unwrap();
        assert_eq!(intent.title, "Viaje");
        assert_eq!(intent.unit_price_cents, 85_000);
        assert_eq!(intent.quantity, 1);
    }

    #[test]
    fn intent_requires_price() {
        assert!(matches!(
            PaymentIntent::new(Some("Viaje"), None, None, PaymentCorrelation::default()),
            Err(TaxiError::Validation { .. })
        ));
    }

    #[test]
    fn correlation_query_pairs_skip_absent() {
        let correlation = PaymentCorrelation {
            owner_id: Some("d1".into()),
            customer_id: None,
            trip_id: Some(TripId::new(9)),
        };
        assert_eq!(
            correlation.query_pairs(),
            vec![("owner_id", "d1".to_string()), ("trip_id", "9".to_string())]
        );
    }

    #[test]
    fn only_payment_topic_with_id_is_actionable() {
        let mut n = WebhookNotification {
            payment_id: Some("123".into()),
            topic: Some("merchant_order".into()),
            ..WebhookNotification::default()
        };
        assert_eq!(n.actionable(), None);

        n.topic = Some("payment".into());
        assert_eq!(n.actionable(), Some("123"));

        n.payment_id = Some(" ".into());
        assert_eq!(n.actionable(), None);
    }

    #[test]
    fn record_denormalizes_amount_and_status() {
        let raw = json!({"id": 987_654, "transaction_amount": 850.0, "status": "approved"});
        let record = PaymentRecord::from_processor(
            "987654",
            PaymentCorrelation {
                owner_id: Some("d".into()),
                customer_id: Some("12345678".into()),
                trip_id: None,
            },
            raw,
        );
        assert_eq!(record.mp_payment_id, "987654");
        assert_eq!(record.amount_cents, Some(85_000));
        assert_eq!(record.status.as_deref(), Some("approved"));
        assert_eq!(record.customer_id.as_deref(), Some("12345678"));
    }

    #[test]
    fn record_falls_back_to_notified_id() {
        let record =
            PaymentRecord::from_processor("555", PaymentCorrelation::default(), json!({}));
        assert_eq!(record.mp_payment_id, "555");
        assert_eq!(record.amount_cents, None);
    }
}

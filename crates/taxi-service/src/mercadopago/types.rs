//! Mercado Pago API types.

use serde::{Deserialize, Serialize};

use taxi_core::{PaymentCorrelation, PaymentIntent};

/// A checkout preference to create.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    /// Line items; the bridge always sends one.
    pub items: Vec<PreferenceItem>,
    /// Where the buyer lands after checkout.
    pub back_urls: BackUrls,
    /// Webhook URL carrying the correlation query parameters.
    pub notification_url: String,
    /// Correlation data, duplicated from the notification URL.
    pub metadata: PaymentCorrelation,
    /// Redirect automatically once approved.
    pub auto_return: String,
    /// Approve or reject immediately, never leave the payment pending.
    pub binary_mode: bool,
    /// Trip id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

impl PreferenceRequest {
    /// Build a single-item preference for an intent.
    #[must_use]
    pub fn for_intent(
        intent: &PaymentIntent,
        currency: &str,
        return_url: &str,
        notification_url: String,
    ) -> Self {
        Self {
            items: vec![PreferenceItem {
                title: intent.title.clone(),
                unit_price: intent.unit_price(),
                quantity: intent.quantity,
                currency_id: currency.to_string(),
            }],
            back_urls: BackUrls {
                success: return_url.to_string(),
                failure: return_url.to_string(),
                pending: return_url.to_string(),
            },
            notification_url,
            metadata: intent.correlation.clone(),
            auto_return: "approved".to_string(),
            binary_mode: true,
            external_reference: intent.correlation.trip_id.map(|id| id.to_string()),
        }
    }
}

/// One checkout line item.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceItem {
    /// Item title.
    pub title: String,
    /// Unit price as a decimal.
    pub unit_price: f64,
    /// Units.
    pub quantity: u32,
    /// ISO currency code.
    pub currency_id: String,
}

/// Checkout return URLs.
#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
    /// After an approved payment.
    pub success: String,
    /// After a rejected payment.
    pub failure: String,
    /// After a pending payment.
    pub pending: String,
}

/// A created checkout preference.
#[derive(Debug, Clone, Deserialize)]
pub struct Preference {
    /// Preference id.
    pub id: String,
    /// Hosted checkout URL.
    pub init_point: String,
}

/// Mercado Pago error response.
#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoErrorResponse {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error code.
    #[serde(default)]
    pub error: Option<String>,
}

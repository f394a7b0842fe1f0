//! Payment bridge.
//!
//! Two cross-origin endpoints sit outside the `/v1` API: one creates a
//! Mercado Pago checkout preference for a trip, the other ingests the
//! processor's payment notifications. Correlation data travels in the
//! notification URL and comes back on the webhook query string.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use taxi_core::{
    PaymentCorrelation, PaymentIntent, PaymentRecord, TaxiError, TripId, WebhookNotification,
};

use crate::mercadopago::{MercadoPagoClient, PreferenceRequest};
use crate::state::AppState;

/// Payment bridge error, shaped as `{"error", "details"?}`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The request could not be understood.
    #[error("{0}")]
    BadRequest(String),

    /// The bridge could not complete the request; the caller may retry.
    #[error("{message}")]
    Failed {
        /// Short description.
        message: String,
        /// Upstream payload or cause, when known.
        details: Option<Value>,
    },
}

impl BridgeError {
    /// Replace the message of a failure, keeping its details.
    fn context(self, message: &str) -> Self {
        match self {
            Self::Failed { details, .. } => Self::Failed {
                message: message.into(),
                details,
            },
            other => other,
        }
    }
}

impl From<TaxiError> for BridgeError {
    fn from(err: TaxiError) -> Self {
        match err {
            TaxiError::Validation { .. } | TaxiError::InvalidAmount(_) | TaxiError::InvalidId(_) => {
                Self::BadRequest(err.to_string())
            }
            TaxiError::Upstream {
                message, payload, ..
            } => {
                let details = match payload {
                    Some(payload) => {
                        serde_json::from_str(&payload).unwrap_or(Value::String(payload))
                    }
                    None => Value::String(message.clone()),
                };
                Self::Failed {
                    message,
                    details: Some(details),
                }
            }
            TaxiError::Persistence(cause) => Self::Failed {
                message: "persistence error".into(),
                details: Some(Value::String(cause)),
            },
            other => Self::Failed {
                message: other.to_string(),
                details: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            Self::Failed { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };
        (status, Json(BridgeErrorBody { error, details })).into_response()
    }
}

/// Add permissive CORS headers to every bridge response.
pub async fn bridge_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

/// Cross-origin preflight.
pub async fn preflight() -> &'static str {
    "ok"
}

/// Preference creation request. Fields are loosely typed on purpose: the
/// browser sends whatever its form held.
#[derive(Debug, Default, Deserialize)]
struct PreferenceBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    owner_id: Option<Value>,
    #[serde(default)]
    client_id: Option<Value>,
    #[serde(default)]
    trip_id: Option<Value>,
}

/// Preference creation response.
#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    /// Checkout URL to redirect the customer to.
    pub init_point: String,
    /// Processor preference id.
    pub id: String,
}

/// Create a checkout preference for a trip payment.
pub async fn create_preference(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PreferenceResponse>, BridgeError> {
    let client = processor(&state)?;

    let body: PreferenceBody = serde_json::from_slice(&body)
        .map_err(|e| BridgeError::BadRequest(format!("invalid request body: {e}")))?;

    let correlation = PaymentCorrelation {
        owner_id: loose_text(body.owner_id.as_ref()),
        customer_id: loose_text(body.client_id.as_ref()),
        trip_id: body
            .trip_id
            .as_ref()
            .map(parse_trip_id)
            .transpose()?
            .flatten(),
    };
    let intent = PaymentIntent::new(
        body.title.as_deref(),
        body.price.as_ref(),
        body.quantity.as_ref(),
        correlation,
    )?;

    let notification_url = reqwest::Url::parse_with_params(
        &state.config.webhook_url(),
        intent.correlation.query_pairs(),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Invalid webhook URL configuration");
        TaxiError::Configuration(format!("invalid webhook URL: {e}"))
    })?;

    let request = PreferenceRequest::for_intent(
        &intent,
        &state.config.currency,
        &state.config.payment_return_url(),
        notification_url.to_string(),
    );

    let preference = client.create_preference(&request).await.map_err(|e| {
        tracing::error!(error = %e, "Mercado Pago rejected preference");
        BridgeError::from(TaxiError::from(e)).context("Error creating preference")
    })?;

    tracing::info!(
        preference_id = %preference.id,
        owner_id = ?intent.correlation.owner_id,
        trip_id = ?intent.correlation.trip_id,
        unit_price_cents = intent.unit_price_cents,
        "Payment preference created"
    );

    Ok(Json(PreferenceResponse {
        init_point: preference.init_point,
        id: preference.id,
    }))
}

/// Ingest a payment notification.
///
/// Acknowledges housekeeping pings without touching storage. A payment
/// notification is looked up with the processor and upserted by payment id,
/// so redelivery overwrites instead of duplicating.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<&'static str, BridgeError> {
    let notification = notification_from_query(&params)?;

    let Some(payment_id) = notification.actionable() else {
        tracing::debug!(
            topic = ?notification.topic,
            payment_id = ?notification.payment_id,
            "Ignoring non-payment notification"
        );
        return Ok("ok");
    };

    let client = processor(&state)?;

    let raw = client.get_payment(payment_id).await.map_err(|e| {
        tracing::error!(payment_id, error = %e, "Failed to fetch payment");
        BridgeError::from(TaxiError::from(e)).context("Error fetching payment")
    })?;

    let record = PaymentRecord::from_processor(payment_id, notification.correlation.clone(), raw);
    state.store.upsert_payment(&record).map_err(|e| {
        tracing::error!(payment_id, error = %e, "Failed to store payment");
        BridgeError::from(TaxiError::from(e)).context("DB Error")
    })?;

    tracing::info!(
        mp_payment_id = %record.mp_payment_id,
        status = ?record.status,
        owner_id = ?record.owner_id,
        trip_id = ?record.trip_id,
        "Payment stored"
    );

    Ok("ok")
}

/// The processor client, or a configuration failure before any network call.
fn processor(state: &AppState) -> Result<Arc<MercadoPagoClient>, TaxiError> {
    state.mercadopago.clone().ok_or_else(|| {
        tracing::error!("Payment bridge called but Mercado Pago is not configured");
        TaxiError::Configuration("payment processor is not configured".into())
    })
}

/// Read a notification from either query shape the processor uses.
fn notification_from_query(
    params: &HashMap<String, String>,
) -> Result<WebhookNotification, BridgeError> {
    let param = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| params.get(*name))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(String::from)
    };

    let trip_id = match param(&["trip_id"]) {
        Some(raw) => Some(
            raw.parse::<TripId>()
                .map_err(|e| BridgeError::from(TaxiError::from(e)))?,
        ),
        None => None,
    };

    Ok(WebhookNotification {
        payment_id: param(&["id", "data.id"]),
        topic: param(&["topic", "type"]),
        correlation: PaymentCorrelation {
            owner_id: param(&["owner_id"]),
            customer_id: param(&["client_id"]),
            trip_id,
        },
    })
}

fn loose_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_trip_id(value: &Value) -> Result<Option<TripId>, BridgeError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: taxi_core::IdError| BridgeError::BadRequest(e.to_string())),
        Value::Number(n) => n
            .to_string()
            .parse()
            .map(Some)
            .map_err(|e: taxi_core::IdError| BridgeError::BadRequest(e.to_string())),
        _ => Err(BridgeError::BadRequest("trip_id must be a number".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn reads_both_notification_shapes() {
        let classic = notification_from_query(&query(&[("id", "42"), ("topic", "payment")])).unwrap();
        assert_eq!(classic.actionable(), Some("42"));

        let modern =
            notification_from_query(&query(&[("data.id", "43"), ("type", "payment")])).unwrap();
        assert_eq!(modern.actionable(), Some("43"));
    }

    #[test]
    fn merchant_order_pings_are_not_actionable() {
        let n = notification_from_query(&query(&[("id", "9"), ("topic", "merchant_order")]))
            .unwrap();
        assert_eq!(n.actionable(), None);
    }

    #[test]
    fn malformed_trip_id_is_rejected() {
        let err = notification_from_query(&query(&[("id", "1"), ("trip_id", "abc")])).unwrap_err();
        assert!(matches!(err, BridgeError::BadRequest(_)));
    }

    #[test]
    fn taxonomy_errors_keep_the_flat_shape() {
        let upstream = BridgeError::from(TaxiError::Upstream {
            service: "mercadopago".into(),
            message: "bad request".into(),
            payload: Some(r#"{"message":"invalid unit_price"}"#.into()),
        })
        .context("Error creating preference");
        match upstream {
            BridgeError::Failed { message, details } => {
                assert_eq!(message, "Error creating preference");
                assert_eq!(details, Some(json!({"message": "invalid unit_price"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let unconfigured =
            BridgeError::from(TaxiError::Configuration("payment processor is not configured".into()));
        assert_eq!(
            unconfigured.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let stored = BridgeError::from(TaxiError::Persistence("disk full".into())).context("DB Error");
        assert!(matches!(
            stored,
            BridgeError::Failed { ref message, details: Some(Value::String(ref cause)) }
                if message == "DB Error" && cause == "disk full"
        ));

        let invalid = BridgeError::from(TaxiError::missing(["price"]));
        assert!(matches!(invalid, BridgeError::BadRequest(_)));
        assert!(matches!(
            BridgeError::BadRequest("x".into()).context("ignored"),
            BridgeError::BadRequest(_)
        ));
    }

    #[test]
    fn loose_fields_accept_numbers_and_strings() {
        assert_eq!(loose_text(Some(&json!(12345678))), Some("12345678".into()));
        assert_eq!(loose_text(Some(&json!(" abc "))), Some("abc".into()));
        assert_eq!(loose_text(Some(&json!(""))), None);
        assert_eq!(parse_trip_id(&json!(7)).unwrap(), Some(TripId::new(7)));
        assert_eq!(parse_trip_id(&json!(null)).unwrap(), None);
    }
}

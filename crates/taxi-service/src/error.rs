//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use taxi_core::TaxiError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Required fields are missing or blank.
    #[error("missing required fields: {}", fields.join(", "))]
    Validation {
        /// Names of the offending fields.
        fields: Vec<String>,
    },

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - the record is not in a state that allows the action.
    #[error("conflict: {message}")]
    Conflict {
        /// Machine-readable reason.
        code: &'static str,
        /// Error message.
        message: String,
    },

    /// The store failed; the caller may retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::Validation { fields } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
                Some(serde_json::json!({ "fields": fields })),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, *code, message.clone(), None),
            Self::Unavailable(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "persistence_error",
                    "Storage is temporarily unavailable, try again".to_string(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<TaxiError> for ApiError {
    fn from(err: TaxiError) -> Self {
        match err {
            TaxiError::Validation { fields } => Self::Validation { fields },
            TaxiError::InvalidAmount(msg) => Self::BadRequest(msg),
            TaxiError::InvalidId(e) => Self::BadRequest(e.to_string()),
            TaxiError::State { trip_id, current } => {
                tracing::warn!(
                    trip_id = %trip_id,
                    current = %current,
                    "Transition attempted on a terminal trip"
                );
                Self::Conflict {
                    code: "invalid_state",
                    message: format!("trip {trip_id} is already {current}"),
                }
            }
            TaxiError::DriverUnavailable { driver_id } => Self::Conflict {
                code: "driver_unavailable",
                message: format!("driver {driver_id} is not accepting requests"),
            },
            TaxiError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            TaxiError::Persistence(msg) => Self::Unavailable(msg),
            TaxiError::Upstream {
                service, message, ..
            } => Self::ExternalService(format!("{service}: {message}")),
            TaxiError::Configuration(msg) => Self::Internal(msg),
        }
    }
}

impl From<taxi_store::StoreError> for ApiError {
    fn from(err: taxi_store::StoreError) -> Self {
        TaxiError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxi_core::{TripId, TripStatus};
    use taxi_store::StoreError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (ApiError::from(TaxiError::missing(["pickup"])), StatusCode::BAD_REQUEST),
            (
                ApiError::from(TaxiError::InvalidAmount("negative".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StoreError::InvalidTransition {
                    trip_id: TripId::new(1),
                    current: TripStatus::Completed,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(StoreError::DriverUnavailable {
                    driver_id: "d".into(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(StoreError::Database("io".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(TaxiError::Upstream {
                    service: "mercadopago".into(),
                    message: "boom".into(),
                    payload: None,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(TaxiError::Configuration("missing".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}

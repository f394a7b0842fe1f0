//! Error types for the taxi tracking service.

use crate::ids::{IdError, TripId};
use crate::trip::TripStatus;

/// Result type for taxi domain operations.
pub type Result<T> = std::result::Result<T, TaxiError>;

/// Errors that can occur in taxi domain operations.
///
/// The variants follow the retry policy of their callers: validation and
/// state errors are never retried, persistence errors are transient, and
/// upstream/configuration errors belong to the payment path only.
#[derive(Debug, thiserror::Error)]
pub enum TaxiError {
    /// Required input fields are missing or blank.
    #[error("missing required fields: {}", fields.join(", "))]
    Validation {
        /// Names of the offending fields.
        fields: Vec<String>,
    },

    /// A price or amount is missing, non-numeric or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A transition was attempted on a trip that is no longer pending.
    #[error("trip {trip_id} is already {current}")]
    State {
        /// The trip that was targeted.
        trip_id: TripId,
        /// Its status at the time of the attempt.
        current: TripStatus,
    },

    /// The targeted driver is not accepting requests.
    #[error("driver is not available: {driver_id}")]
    DriverUnavailable {
        /// The driver that was targeted.
        driver_id: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The store rejected or failed a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The payment processor rejected a call.
    #[error("upstream error: {service} - {message}")]
    Upstream {
        /// The service that failed.
        service: String,
        /// Error message.
        message: String,
        /// Raw error payload returned by the service, if any.
        payload: Option<String>,
    },

    /// A credential or setting required by this path is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl TaxiError {
    /// Build a validation error from field names.
    #[must_use]
    pub fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

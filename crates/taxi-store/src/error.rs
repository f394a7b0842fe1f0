//! Error types for taxi storage.

use taxi_core::{TaxiError, TripId, TripStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The targeted driver has availability switched off.
    #[error("driver is not available: {driver_id}")]
    DriverUnavailable {
        /// The driver that was targeted.
        driver_id: String,
    },

    /// The conditional update found the trip no longer pending.
    #[error("trip {trip_id} is already {current}")]
    InvalidTransition {
        /// The trip that was targeted.
        trip_id: TripId,
        /// Its status at the time of the attempt.
        current: TripStatus,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for TaxiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::DriverUnavailable { driver_id } => Self::DriverUnavailable { driver_id },
            StoreError::InvalidTransition { trip_id, current } => Self::State { trip_id, current },
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Persistence(msg),
        }
    }
}

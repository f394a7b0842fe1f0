//! Client error types.

use taxi_core::{TripId, TripStatus};

/// Errors that can occur when using the taxi client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A change-feed socket could not be opened.
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The driver stopped accepting requests.
    #[error("driver is not available: {message}")]
    DriverUnavailable {
        /// Server message.
        message: String,
    },

    /// Required fields were missing.
    #[error("missing required fields: {}", fields.join(", "))]
    Validation {
        /// Names of the offending fields.
        fields: Vec<String>,
    },

    /// The trip cannot be paid yet.
    #[error("trip {trip_id} is {status} and cannot be paid")]
    NotPayable {
        /// The trip.
        trip_id: TripId,
        /// Its current status.
        status: TripStatus,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the token file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

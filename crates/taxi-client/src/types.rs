//! API request and response types.

use serde::{Deserialize, Serialize};

use taxi_core::{CustomerToken, DriverId, TripId, TripRequest, TripRequestDraft, TripStatus};

/// A driver as listed for customers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicDriver {
    /// Driver ID, passed to [`crate::TaxiClient::create_trip`].
    pub owner_id: DriverId,
    /// Name to show.
    pub name: String,
    /// Vehicle model.
    #[serde(default)]
    pub car_model: Option<String>,
    /// Vehicle plate.
    #[serde(default)]
    pub car_plate: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub picture_url: Option<String>,
    /// Whether the driver accepts new requests right now.
    pub available: bool,
}

/// A change notification pushed on a feed socket.
///
/// Events are hints to re-read, never the data itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A trip was created or transitioned.
    Trip {
        /// The trip.
        trip_id: TripId,
        /// Its driver.
        owner_id: DriverId,
        /// Its customer token.
        customer_id: CustomerToken,
        /// Status after the write.
        status: TripStatus,
    },
    /// A driver profile changed.
    Driver {
        /// The driver.
        owner_id: DriverId,
        /// Availability after the write.
        available: bool,
    },
    /// The server dropped events for this socket; re-read everything.
    Resync,
}

/// Trip creation body.
#[derive(Debug, Serialize)]
pub(crate) struct CreateTripRequest<'a> {
    pub driver_id: String,
    pub customer_id: &'a str,
    #[serde(flatten)]
    pub draft: &'a TripRequestDraft,
}

/// Latest-trip response.
#[derive(Debug, Deserialize)]
pub(crate) struct LatestTripResponse {
    pub trip: Option<TripRequest>,
}

/// Request for a checkout preference.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentRequest {
    /// Line item title.
    pub title: String,
    /// Unit price as a decimal.
    pub price: f64,
    /// Units.
    pub quantity: u32,
    /// Driver being paid.
    pub owner_id: String,
    /// Paying customer's token.
    pub client_id: String,
    /// Trip being paid for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
}

/// A created checkout preference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntentResponse {
    /// Checkout URL to send the customer to.
    pub init_point: String,
    /// Processor preference id.
    pub id: String,
}

/// API error response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// API error details.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Payment bridge error body, `{"error": "...", "details"?}`.
#[derive(Debug, Deserialize)]
pub(crate) struct BridgeErrorResponse {
    pub error: String,
}

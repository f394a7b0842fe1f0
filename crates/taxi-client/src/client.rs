//! Taxi HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use taxi_core::{CustomerToken, DriverId, PaymentRecord, TripRequest, TripRequestDraft};

use crate::error::ClientError;
use crate::feed::{self, FeedStream};
use crate::watch::{DriverListWatcher, FallbackTrigger};
use crate::types::{
    ApiErrorResponse, BridgeErrorResponse, CreateTripRequest, LatestTripResponse,
    PaymentIntentRequest, PaymentIntentResponse, PublicDriver,
};

/// Taxi public API client.
///
/// Covers everything an anonymous customer can do: browse drivers, request
/// a trip, read it back and pay for it.
#[derive(Debug, Clone)]
pub struct TaxiClient {
    client: Client,
    base_url: String,
    options: ClientOptions,
}

impl TaxiClient {
    /// Create a new taxi client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the taxi service (e.g., `"http://localhost:8080"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new taxi client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built and
    /// `ClientError::Configuration` for a zero poll interval.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        if options.poll_interval.is_zero() {
            return Err(ClientError::Configuration(
                "poll interval must be positive".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
        })
    }

    /// The options this client was built with.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// List drivers, optionally filtered by a search term.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_drivers(&self, search: Option<&str>) -> Result<Vec<PublicDriver>, ClientError> {
        let url = format!("{}/v1/public/drivers", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(term) = search {
            request = request.query(&[("search", term)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Request a trip from a driver.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::DriverUnavailable` if the driver closed in the
    /// meantime and `ClientError::Validation` for blank fields.
    pub async fn create_trip(
        &self,
        driver_id: &DriverId,
        customer: &CustomerToken,
        draft: &TripRequestDraft,
    ) -> Result<TripRequest, ClientError> {
        let url = format!("{}/v1/public/trips", self.base_url);
        let request = CreateTripRequest {
            driver_id: driver_id.to_string(),
            customer_id: customer.as_str(),
            draft,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// The most recent trip requested with `customer`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn latest_trip(
        &self,
        customer: &CustomerToken,
    ) -> Result<Option<TripRequest>, ClientError> {
        let url = format!("{}/v1/public/trips/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("customer_id", customer.as_str())])
            .send()
            .await?;

        let body: LatestTripResponse = self.handle_response(response).await?;
        Ok(body.trip)
    }

    /// Create a checkout preference through the payment bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the bridge reports an error.
    pub async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, ClientError> {
        let url = format!("{}/create-preference", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        self.handle_response(response).await
    }

    /// Look up a stored payment; `None` until its webhook has arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_payment(
        &self,
        mp_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, ClientError> {
        let url = format!("{}/v1/public/payments/{mp_payment_id}", self.base_url);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    /// Subscribe to change events for the trips of `customer`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::WebSocket` if the socket cannot be opened.
    pub async fn subscribe_trips(&self, customer: &CustomerToken) -> Result<FeedStream, ClientError> {
        let url = format!(
            "{}/v1/public/feed/trips?customer_id={}",
            feed::socket_base(&self.base_url)?,
            customer.as_str()
        );
        feed::open(&url).await
    }

    /// Subscribe to driver profile changes, for a live driver listing.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::WebSocket` if the socket cannot be opened.
    pub async fn subscribe_drivers(&self) -> Result<FeedStream, ClientError> {
        let url = format!("{}/v1/public/feed/drivers", feed::socket_base(&self.base_url)?);
        feed::open(&url).await
    }

    /// Keep a driver listing live.
    ///
    /// Re-lists on every driver change pushed by the service and at the poll
    /// interval; polls only when the feed cannot be opened.
    pub async fn watch_drivers(&self, search: Option<&str>) -> DriverListWatcher {
        let feed = match self.subscribe_drivers().await {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::debug!(error = %e, "Driver feed unavailable, polling only");
                None
            }
        };
        let trigger = FallbackTrigger::new(feed, self.options.poll_interval);
        DriverListWatcher::spawn(self.clone(), search.map(String::from), trigger)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            let error = api_error.error;
            return Err(match error.code.as_str() {
                "driver_unavailable" => ClientError::DriverUnavailable {
                    message: error.message,
                },
                "validation_error" => ClientError::Validation {
                    fields: error
                        .details
                        .as_ref()
                        .and_then(|d| d.get("fields"))
                        .and_then(|f| serde_json::from_value(f.clone()).ok())
                        .unwrap_or_default(),
                },
                _ => ClientError::Api {
                    code: error.code,
                    message: error.message,
                    status: status.as_u16(),
                },
            });
        }

        // The payment bridge uses a flat error shape.
        if let Ok(bridge_error) = serde_json::from_str::<BridgeErrorResponse>(&body) {
            return Err(ClientError::Api {
                code: "bridge_error".to_string(),
                message: bridge_error.error,
                status: status.as_u16(),
            });
        }

        Err(ClientError::Api {
            code: "unknown".to_string(),
            message: format!("HTTP {status}"),
            status: status.as_u16(),
        })
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// How often watchers re-read (default: 10s). With a live feed this is
    /// the safety-net interval between pushes.
    pub poll_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            poll_interval: Duration::from_secs(10),
        }
    }
}

//! Customer session context.
//!
//! An anonymous customer is whoever holds a [`CustomerToken`]. The token is
//! generated once and kept in a small file so it survives restarts, the way
//! a browser keeps it in local storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use taxi_core::{CustomerToken, DriverId, TripRequest, TripRequestDraft, TripStatus};

use crate::client::TaxiClient;
use crate::error::ClientError;
use crate::types::{PaymentIntentRequest, PaymentIntentResponse};
use crate::watch::{FallbackTrigger, TripWatcher};

/// Title used for trip payments.
const PAYMENT_TITLE: &str = "Viaje";

/// File-backed customer token storage.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Token storage at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the token lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, or generate and store a fresh one.
    ///
    /// A file holding anything other than a well-formed token is replaced.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be read or written.
    pub async fn load_or_create(&self) -> Result<CustomerToken, ClientError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match contents.parse::<CustomerToken>() {
                Ok(token) => return Ok(token),
                Err(_) => {
                    tracing::warn!(path = %self.path.display(), "Replacing malformed customer token");
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let token = CustomerToken::generate();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, token.as_str()).await?;
        tracing::debug!(path = %self.path.display(), "Stored new customer token");

        Ok(token)
    }

    /// Forget the stored token. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// A customer's session: the client plus the token that identifies them.
///
/// Constructed once when the customer arrives and dropped when they leave;
/// watchers started from it stop when dropped.
#[derive(Debug, Clone)]
pub struct CustomerSession {
    client: TaxiClient,
    token: CustomerToken,
}

impl CustomerSession {
    /// Start a session with a known token.
    #[must_use]
    pub fn new(client: TaxiClient, token: CustomerToken) -> Self {
        Self { client, token }
    }

    /// Start a session with the token stored in `file`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the token file cannot be read or written.
    pub async fn open(client: TaxiClient, file: &TokenFile) -> Result<Self, ClientError> {
        let token = file.load_or_create().await?;
        Ok(Self::new(client, token))
    }

    /// The customer's token.
    #[must_use]
    pub fn token(&self) -> &CustomerToken {
        &self.token
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &TaxiClient {
        &self.client
    }

    /// Request a trip from `driver_id` under this session's token.
    ///
    /// # Errors
    ///
    /// See [`TaxiClient::create_trip`].
    pub async fn request_trip(
        &self,
        driver_id: &DriverId,
        draft: &TripRequestDraft,
    ) -> Result<TripRequest, ClientError> {
        self.client.create_trip(driver_id, &self.token, draft).await
    }

    /// The session's latest trip, if any.
    ///
    /// # Errors
    ///
    /// See [`TaxiClient::latest_trip`].
    pub async fn latest_trip(&self) -> Result<Option<TripRequest>, ClientError> {
        self.client.latest_trip(&self.token).await
    }

    /// Start paying for a completed trip.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotPayable` unless the trip is completed with a
    /// price, and bridge errors from [`TaxiClient::create_payment_intent`].
    pub async fn pay(&self, trip: &TripRequest) -> Result<PaymentIntentResponse, ClientError> {
        let price_cents = match (trip.status, trip.price_cents) {
            (TripStatus::Completed, Some(cents)) => cents,
            _ => {
                return Err(ClientError::NotPayable {
                    trip_id: trip.id,
                    status: trip.status,
                })
            }
        };

        let request = PaymentIntentRequest {
            title: PAYMENT_TITLE.to_string(),
            price: taxi_core::money::decimal_from_cents(price_cents),
            quantity: 1,
            owner_id: trip.owner_id.to_string(),
            client_id: self.token.to_string(),
            trip_id: Some(trip.id),
        };

        self.client.create_payment_intent(&request).await
    }

    /// Watch the latest trip.
    ///
    /// Re-reads on every push from the trip feed and at the client's poll
    /// interval. When the feed cannot be opened the watcher only polls.
    pub async fn watch(&self) -> TripWatcher {
        let feed = match self.client.subscribe_trips(&self.token).await {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::debug!(error = %e, "Trip feed unavailable, polling only");
                None
            }
        };
        let trigger = FallbackTrigger::new(feed, self.client.options().poll_interval);
        TripWatcher::spawn(self.clone(), trigger)
    }
}

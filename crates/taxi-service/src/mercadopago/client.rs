//! Mercado Pago API client implementation.

use reqwest::Client;
use std::time::Duration;

use taxi_core::TaxiError;

use super::types::{MercadoPagoErrorResponse, Preference, PreferenceRequest};

/// Error type for Mercado Pago operations.
#[derive(Debug, thiserror::Error)]
pub enum MercadoPagoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mercado Pago API returned an error.
    #[error("Mercado Pago API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
        /// Raw response body.
        payload: Option<String>,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<MercadoPagoError> for TaxiError {
    fn from(err: MercadoPagoError) -> Self {
        match err {
            MercadoPagoError::Configuration(msg) => Self::Configuration(msg),
            MercadoPagoError::Api {
                message, payload, ..
            } => Self::Upstream {
                service: "mercadopago".into(),
                message,
                payload,
            },
            other => Self::Upstream {
                service: "mercadopago".into(),
                message: other.to_string(),
                payload: None,
            },
        }
    }
}

/// Mercado Pago API client.
#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    /// Create a new Mercado Pago client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (`https://api.mercadopago.com` in production)
    /// * `access_token` - Seller access token
    ///
    /// # Errors
    ///
    /// Returns `MercadoPagoError::Configuration` for a blank token and
    /// `MercadoPagoError::Http` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, MercadoPagoError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(MercadoPagoError::Configuration(
                "access token is empty".into(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Create a checkout preference.
    pub async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, MercadoPagoError> {
        tracing::debug!(
            notification_url = %request.notification_url,
            "Creating Mercado Pago preference"
        );

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch the full payment object for a notified payment id.
    ///
    /// The payload is kept opaque: it is stored verbatim for audit.
    pub async fn get_payment(
        &self,
        payment_id: &str,
    ) -> Result<serde_json::Value, MercadoPagoError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, MercadoPagoError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<MercadoPagoErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| format!("HTTP {status}"));

        Err(MercadoPagoError::Api {
            status: status.as_u16(),
            message,
            payload: (!body.is_empty()).then_some(body),
        })
    }
}

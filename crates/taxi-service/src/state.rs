//! Application state.

use std::sync::Arc;

use taxi_store::Store;

use crate::config::ServiceConfig;
use crate::feed::ChangeFeed;
use crate::mercadopago::MercadoPagoClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Mercado Pago client for the payment bridge (optional).
    pub mercadopago: Option<Arc<MercadoPagoClient>>,

    /// Change notifications for feed subscribers.
    pub feed: ChangeFeed,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let mercadopago = config.mp_access_token.as_ref().and_then(|token| {
            match MercadoPagoClient::new(&config.mp_api_url, token) {
                Ok(client) => {
                    tracing::info!(api_url = %config.mp_api_url, "Mercado Pago integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Mercado Pago client");
                    None
                }
            }
        });

        if mercadopago.is_none() {
            tracing::warn!("Mercado Pago not configured - the payment bridge will reject requests");
        }
        if config.jwt_secret.is_none() {
            tracing::warn!("JWT secret not configured - driver endpoints will return 500");
        }

        let feed = ChangeFeed::new(config.feed_capacity);

        Self {
            store,
            config,
            mercadopago,
            feed,
        }
    }

    /// Check if Mercado Pago is configured.
    #[must_use]
    pub fn has_mercadopago(&self) -> bool {
        self.mercadopago.is_some()
    }
}

//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/taxi").
    pub data_dir: String,

    /// HS256 secret of the hosted identity provider. Without it every
    /// driver request is rejected.
    pub jwt_secret: Option<String>,

    /// Expected JWT audience (default: "authenticated").
    pub jwt_audience: String,

    /// Mercado Pago access token (optional).
    pub mp_access_token: Option<String>,

    /// Mercado Pago API base URL.
    pub mp_api_url: String,

    /// Public URL of this service, used to build the webhook notification URL.
    pub public_base_url: String,

    /// Frontend URL for checkout back URLs.
    pub frontend_url: String,

    /// Checkout currency (default: "ARS").
    pub currency: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Buffered change events per feed subscriber.
    pub feed_capacity: usize,
}

/// Mercado Pago secrets file structure.
#[derive(Debug, Deserialize)]
struct MercadoPagoSecrets {
    access_token: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            data_dir: env_or("DATA_DIR", defaults.data_dir),
            jwt_secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            jwt_audience: env_or("JWT_AUDIENCE", defaults.jwt_audience),
            mp_access_token: load_mercadopago_token(),
            mp_api_url: env_or("MP_API_URL", defaults.mp_api_url),
            public_base_url: env_or("PUBLIC_BASE_URL", defaults.public_base_url),
            frontend_url: env_or("FRONTEND_URL", defaults.frontend_url),
            currency: env_or("MP_CURRENCY", defaults.currency),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            feed_capacity: env_parse("FEED_CAPACITY").unwrap_or(defaults.feed_capacity),
        }
    }

    /// The webhook URL handed to the processor, without correlation params.
    #[must_use]
    pub fn webhook_url(&self) -> String {
        format!("{}/payment-webhook", self.public_base_url.trim_end_matches('/'))
    }

    /// Where the processor sends the buyer back after checkout.
    #[must_use]
    pub fn payment_return_url(&self) -> String {
        format!("{}/payment", self.frontend_url.trim_end_matches('/'))
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load the Mercado Pago access token from file or environment.
fn load_mercadopago_token() -> Option<String> {
    let secret_paths = [".secrets/mercadopago.json", "../.secrets/mercadopago.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<MercadoPagoSecrets>(path) {
            tracing::info!(path = %path, "Loaded Mercado Pago secrets from file");
            return Some(secrets.access_token);
        }
    }

    tracing::debug!("Mercado Pago secrets file not found, using environment variables");
    std::env::var("MP_ACCESS_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/taxi".into(),
            jwt_secret: None,
            jwt_audience: "authenticated".into(),
            mp_access_token: None,
            mp_api_url: "https://api.mercadopago.com".into(),
            public_base_url: "http://localhost:8080".into(),
            frontend_url: "http://localhost:5173".into(),
            currency: "ARS".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            feed_capacity: 256,
        }
    }
}

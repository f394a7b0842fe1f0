//! Authentication extractors.
//!
//! Drivers sign in with the hosted identity provider, which issues HS256
//! JWTs. The service only verifies them: the `sub` claim is the driver id and
//! the optional metadata seeds the driver profile on first sign-in.
//! Customers are anonymous and never pass through here.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use taxi_core::{DriverId, ProfileIdentity, TaxiError};

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated driver extracted from the identity provider's JWT.
#[derive(Debug, Clone)]
pub struct AuthDriver {
    /// The driver ID.
    pub driver_id: DriverId,
    /// Profile hints carried by the token.
    pub identity: ProfileIdentity,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthDriver {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = validate_jwt(token, &state.config)?;

        let driver_id = claims
            .sub
            .parse::<DriverId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self {
            driver_id,
            identity: claims.identity(),
        })
    }
}

/// JWT claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (driver ID).
    pub sub: String,
    /// Audience.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Expiration time.
    pub exp: i64,
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-specific profile metadata.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Profile metadata attached to the identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Full name, as set by most OAuth providers.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Short name, used by some providers instead of `full_name`.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Avatar URL, alternate key.
    #[serde(default)]
    pub picture: Option<String>,
}

impl JwtClaims {
    /// Profile hints for [`taxi_core::DriverProfile::new`].
    #[must_use]
    pub fn identity(&self) -> ProfileIdentity {
        let meta = &self.user_metadata;
        ProfileIdentity {
            email: self.email.clone(),
            display_name: meta.full_name.clone().or_else(|| meta.name.clone()),
            picture_url: meta.avatar_url.clone().or_else(|| meta.picture.clone()),
        }
    }
}

/// Validate a driver JWT with the configured shared secret.
fn validate_jwt(token: &str, config: &ServiceConfig) -> Result<JwtClaims, ApiError> {
    let secret = config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| TaxiError::Configuration("JWT secret is not configured".into()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&config.jwt_audience]);

    decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })
}

//! Taxi HTTP API service.
//!
//! This crate provides the HTTP API for the taxi tracking service, including:
//!
//! - Driver profiles, availability and running costs
//! - Trip requests and their pending → completed/cancelled lifecycle
//! - Expenses and earnings
//! - The Mercado Pago payment bridge (preference creation and webhook)
//! - A WebSocket change feed
//!
//! # Authentication
//!
//! Driver endpoints require an HS256 JWT from the hosted identity provider.
//! Customer endpoints are public: a customer is whoever holds the 8-digit
//! customer token used when the trip was requested.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod mercadopago;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use feed::{ChangeEvent, ChangeFeed};
pub use mercadopago::{MercadoPagoClient, MercadoPagoError};
pub use routes::create_router;
pub use state::AppState;

//! Mercado Pago integration for checkout preferences and payment lookups.
//!
//! Mercado Pago handles:
//! - Checkout preferences (the hosted payment page)
//! - Payment details fetched when a webhook notification arrives

pub mod client;
pub mod types;

pub use client::MercadoPagoClient;
pub use client::MercadoPagoError;
pub use types::*;

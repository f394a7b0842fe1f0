//! Core types and rules for the taxi tracking service.
//!
//! This crate provides the domain model shared by the store, the HTTP service
//! and the client SDK:
//!
//! - **Identifiers**: `DriverId`, `TripId`, `ExpenseId`, `CustomerToken`
//! - **Trips**: `TripRequest`, `TripStatus`, `Transition`, `DaySummary`
//! - **Drivers**: `DriverProfile`, `ProfilePatch`, `CostSettings`
//! - **Payments**: `PaymentRecord`, `PaymentCorrelation`, `PaymentIntent`
//! - **Expenses**: `Expense`, `ExpenseKind`, daily and monthly earnings
//!
//! # Money
//!
//! All amounts are stored as `i64` cents. Prices arrive on the wire as decimal
//! numbers (`850.00`) and are converted once at the edge with [`money`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod driver;
pub mod earnings;
pub mod error;
pub mod expense;
pub mod ids;
pub mod money;
pub mod payment;
pub mod trip;

pub use driver::{CostSettings, DriverProfile, ProfileIdentity, ProfilePatch, DEFAULT_AVAILABILITY};
pub use earnings::{DailyEarnings, MonthlyEarnings};
pub use error::{Result, TaxiError};
pub use expense::{Expense, ExpenseKind};
pub use ids::{CustomerToken, DriverId, ExpenseId, IdError, TripId};
pub use payment::{
    PaymentCorrelation, PaymentIntent, PaymentRecord, WebhookNotification, PAYMENT_TOPIC,
};
pub use trip::{DaySummary, NewTripRequest, TripRequest, TripRequestDraft, TripStatus, Transition};

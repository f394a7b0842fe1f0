//! Taxi Client SDK.
//!
//! This crate provides the customer side of the taxi service: browsing
//! drivers, requesting a trip, following it until the driver decides, and
//! paying for it.
//!
//! # Example
//!
//! ```no_run
//! use taxi_client::{CustomerSession, TaxiClient, TokenFile};
//! use taxi_core::{TripRequestDraft, TripStatus};
//!
//! # async fn example() -> Result<(), taxi_client::ClientError> {
//! let client = TaxiClient::new("http://localhost:8080")?;
//! let session = CustomerSession::open(client, &TokenFile::new("customer_id")).await?;
//!
//! let drivers = session.client().list_drivers(Some("etios")).await?;
//! let Some(driver) = drivers.iter().find(|d| d.available) else {
//!     return Ok(());
//! };
//!
//! let draft = TripRequestDraft {
//!     passenger_name: "Juan Perez".into(),
//!     pickup: "Av. Principal 123".into(),
//!     destination: "Centro".into(),
//!     ..TripRequestDraft::default()
//! };
//! session.request_trip(&driver.owner_id, &draft).await?;
//!
//! // Follow the trip until the driver decides.
//! let mut watcher = session.watch().await;
//! while let Ok(view) = watcher.changed().await {
//!     if let Some(trip) = view.filter(|t| t.status == TripStatus::Completed) {
//!         let checkout = session.pay(&trip).await?;
//!         println!("Pay at {}", checkout.init_point);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod feed;
mod session;
mod types;
pub mod watch;

pub use client::{ClientOptions, TaxiClient};
pub use error::ClientError;
pub use feed::FeedStream;
pub use session::{CustomerSession, TokenFile};
pub use types::{FeedEvent, PaymentIntentRequest, PaymentIntentResponse, PublicDriver};
pub use watch::{
    reconcile, DriverListWatcher, FallbackTrigger, PollTrigger, PushTrigger, Reconciled,
    RefreshTrigger, TripSource, TripWatcher,
};

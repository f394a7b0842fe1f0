//! Storage layer for the taxi tracking service.
//!
//! This crate provides persistence for driver profiles, trip requests,
//! payment records and expenses behind the [`Store`] trait. Two backends are
//! provided:
//!
//! - [`MemoryStore`]: a lock-protected in-process store, always available.
//! - `RocksStore` (feature `rocksdb-backend`): `RocksDB` with column families
//!   and CBOR-encoded values.
//!
//! # Consistency
//!
//! The store is the only shared mutable resource. The rules that need
//! atomicity live here rather than in callers:
//!
//! - [`Store::create_trip`] re-reads the driver's availability under the
//!   same lock as the insert.
//! - [`Store::transition_trip`] is a conditional update: it only succeeds
//!   while the trip is still `pending`.
//! - [`Store::upsert_payment`] overwrites by processor payment id.
//!
//! # Example
//!
//! ```
//! use taxi_core::{DriverId, DriverProfile, ProfileIdentity};
//! use taxi_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let driver = DriverProfile::new(DriverId::generate(), &ProfileIdentity::default());
//! let stored = store.ensure_driver(&driver).unwrap();
//! assert!(!stored.available);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use taxi_core::{
    CustomerToken, DriverId, DriverProfile, Expense, NewTripRequest, PaymentRecord, Transition,
    TripId, TripRequest,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Driver Operations
    // =========================================================================

    /// Get a driver profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_driver(&self, owner_id: &DriverId) -> Result<Option<DriverProfile>>;

    /// Insert the profile unless one already exists; return the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn ensure_driver(&self, profile: &DriverProfile) -> Result<DriverProfile>;

    /// Read-modify-write a profile under the store's write lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the profile doesn't exist.
    fn update_driver(
        &self,
        owner_id: &DriverId,
        update: &dyn Fn(&mut DriverProfile),
    ) -> Result<DriverProfile>;

    /// List all driver profiles, most recently created first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_drivers(&self) -> Result<Vec<DriverProfile>>;

    /// Set a driver's availability flag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the profile doesn't exist.
    fn set_availability(&self, owner_id: &DriverId, available: bool) -> Result<DriverProfile> {
        self.update_driver(owner_id, &|profile| profile.set_available(available))
    }

    // =========================================================================
    // Trip Operations
    // =========================================================================

    /// Insert a pending trip request, assigning its id and timestamp.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the driver has no profile.
    /// - `StoreError::DriverUnavailable` if the driver is closed.
    fn create_trip(&self, new: &NewTripRequest) -> Result<TripRequest>;

    /// Get a trip by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_trip(&self, trip_id: TripId) -> Result<Option<TripRequest>>;

    /// List a driver's trips, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_trips_by_owner(&self, owner_id: &DriverId) -> Result<Vec<TripRequest>>;

    /// The most recently created trip carrying this customer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn latest_trip_for_customer(&self, customer_id: &CustomerToken) -> Result<Option<TripRequest>>;

    /// Apply a transition if the trip belongs to `owner_id` and is pending.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the trip doesn't exist or belongs to another driver.
    /// - `StoreError::InvalidTransition` if the trip is already terminal.
    fn transition_trip(
        &self,
        trip_id: TripId,
        owner_id: &DriverId,
        transition: Transition,
    ) -> Result<TripRequest>;

    // =========================================================================
    // Payment Operations
    // =========================================================================

    /// Insert or replace a payment record keyed by its processor id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn upsert_payment(&self, record: &PaymentRecord) -> Result<()>;

    /// Get a payment record by processor id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment(&self, mp_payment_id: &str) -> Result<Option<PaymentRecord>>;

    /// List payments correlated to a driver, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_payments_by_owner(&self, owner_id: &DriverId) -> Result<Vec<PaymentRecord>>;

    // =========================================================================
    // Expense Operations
    // =========================================================================

    /// Record an expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_expense(&self, expense: &Expense) -> Result<()>;

    /// List a driver's expenses, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_expenses_by_owner(&self, owner_id: &DriverId) -> Result<Vec<Expense>>;
}

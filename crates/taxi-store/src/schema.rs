//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Driver profiles, keyed by `owner_id`.
    pub const DRIVERS: &str = "drivers";

    /// Trip requests, keyed by big-endian `trip_id`.
    pub const TRIPS: &str = "trips";

    /// Index: trips by driver, keyed by `owner_id || trip_id`.
    /// Value is empty (index only).
    pub const TRIPS_BY_OWNER: &str = "trips_by_owner";

    /// Index: trips by customer token, keyed by `token || trip_id`.
    /// Value is empty (index only).
    pub const TRIPS_BY_CUSTOMER: &str = "trips_by_customer";

    /// Payment records, keyed by processor payment id.
    pub const PAYMENTS: &str = "payments";

    /// Expenses, keyed by `expense_id` (ULID).
    pub const EXPENSES: &str = "expenses";

    /// Index: expenses by driver, keyed by `owner_id || expense_id`.
    pub const EXPENSES_BY_OWNER: &str = "expenses_by_owner";

    /// Counters and other bookkeeping.
    pub const META: &str = "meta";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::DRIVERS,
        cf::TRIPS,
        cf::TRIPS_BY_OWNER,
        cf::TRIPS_BY_CUSTOMER,
        cf::PAYMENTS,
        cf::EXPENSES,
        cf::EXPENSES_BY_OWNER,
        cf::META,
    ]
}

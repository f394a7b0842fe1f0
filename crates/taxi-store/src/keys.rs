//! Key encoding utilities for `RocksDB`.
//!
//! Trip ids are encoded big-endian so index keys sort in creation order.

use taxi_core::{CustomerToken, DriverId, ExpenseId, TripId};

/// Key of the last allocated trip id in the meta column family.
pub const LAST_TRIP_ID: &[u8] = b"last_trip_id";

/// Create a driver key from a driver ID.
#[must_use]
pub fn driver_key(owner_id: &DriverId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Create a trip key from a trip ID.
#[must_use]
pub fn trip_key(trip_id: TripId) -> Vec<u8> {
    trip_id.to_be_bytes().to_vec()
}

/// Create a driver-trip index key.
///
/// Format: `owner_id (16 bytes) || trip_id (8 bytes)`
#[must_use]
pub fn owner_trip_key(owner_id: &DriverId, trip_id: TripId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(&trip_id.to_be_bytes());
    key
}

/// Create a customer-trip index key.
///
/// Format: `token (8 ASCII digits) || trip_id (8 bytes)`
#[must_use]
pub fn customer_trip_key(customer_id: &CustomerToken, trip_id: TripId) -> Vec<u8> {
    let mut key = customer_trip_prefix(customer_id);
    key.extend_from_slice(&trip_id.to_be_bytes());
    key
}

/// Create a prefix for iterating all trips for a customer token.
#[must_use]
pub fn customer_trip_prefix(customer_id: &CustomerToken) -> Vec<u8> {
    customer_id.as_str().as_bytes().to_vec()
}

/// Extract the trip ID from the trailing 8 bytes of an index key.
///
/// Returns `None` for keys too short to carry one.
#[must_use]
pub fn trailing_trip_id(key: &[u8]) -> Option<TripId> {
    let start = key.len().checked_sub(8)?;
    let bytes: [u8; 8] = key[start..].try_into().ok()?;
    Some(TripId::from_be_bytes(bytes))
}

/// Create a payment key from a processor payment id.
#[must_use]
pub fn payment_key(mp_payment_id: &str) -> Vec<u8> {
    mp_payment_id.as_bytes().to_vec()
}

/// Create an expense key from an expense ID.
#[must_use]
pub fn expense_key(expense_id: &ExpenseId) -> Vec<u8> {
    expense_id.to_bytes().to_vec()
}

/// Create a driver-expense index key.
///
/// Format: `owner_id (16 bytes) || expense_id (16 bytes)`
#[must_use]
pub fn owner_expense_key(owner_id: &DriverId, expense_id: &ExpenseId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(&expense_id.to_bytes());
    key
}

/// Extract the expense ID from a driver-expense index key.
#[must_use]
pub fn trailing_expense_id(key: &[u8]) -> Option<ExpenseId> {
    let bytes: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(ExpenseId::from_bytes(bytes))
}

/// Create a prefix for iterating everything indexed under a driver.
#[must_use]
pub fn owner_prefix(owner_id: &DriverId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_trip_key_format() {
        let owner = DriverId::generate();
        let key = owner_trip_key(&owner, TripId::new(42));

        assert_eq!(key.len(), 24);
        assert_eq!(&key[..16], owner.as_bytes());
        assert_eq!(trailing_trip_id(&key), Some(TripId::new(42)));
    }

    #[test]
    fn customer_keys_sort_by_trip_id() {
        let token: CustomerToken = "48213377".parse().unwrap();
        let earlier = customer_trip_key(&token, TripId::new(255));
        let later = customer_trip_key(&token, TripId::new(256));

        assert!(earlier < later);
        assert!(later.starts_with(&customer_trip_prefix(&token)));
    }

    #[test]
    fn expense_index_roundtrip() {
        let owner = DriverId::generate();
        let id = ExpenseId::generate();
        let key = owner_expense_key(&owner, &id);

        assert_eq!(trailing_expense_id(&key), Some(id));
        assert_eq!(trailing_expense_id(&key[..10]), None);
    }
}

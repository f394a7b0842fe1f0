//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Writes that check before they write (trip creation, transitions, profile
//! updates) hold `write_lock` across the read and the batch.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use taxi_core::{
    CustomerToken, DriverId, DriverProfile, Expense, NewTripRequest, PaymentRecord, Transition,
    TripId, TripRequest,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(path = %path.as_ref().display(), "Opened RocksDB store");
        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Collect index keys under a prefix, in key order.
    fn index_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key.to_vec());
        }
        Ok(found)
    }

    /// Collect every value in a column family.
    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }

    fn last_trip_id(&self) -> Result<i64> {
        let cf = self.cf(cf::META)?;
        let Some(raw) = self
            .db
            .get_cf(&cf, keys::LAST_TRIP_ID)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(0);
        };
        let bytes: [u8; 8] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("corrupt trip id counter".into()))?;
        Ok(i64::from_be_bytes(bytes))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Driver Operations
    // =========================================================================

    fn get_driver(&self, owner_id: &DriverId) -> Result<Option<DriverProfile>> {
        self.get_value(cf::DRIVERS, &keys::driver_key(owner_id))
    }

    fn ensure_driver(&self, profile: &DriverProfile) -> Result<DriverProfile> {
        let _guard = self.lock()?;
        if let Some(existing) = self.get_driver(&profile.owner_id)? {
            return Ok(existing);
        }

        let cf = self.cf(cf::DRIVERS)?;
        self.db
            .put_cf(
                &cf,
                keys::driver_key(&profile.owner_id),
                Self::serialize(profile)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(profile.clone())
    }

    fn update_driver(
        &self,
        owner_id: &DriverId,
        update: &dyn Fn(&mut DriverProfile),
    ) -> Result<DriverProfile> {
        let _guard = self.lock()?;
        let mut profile = self
            .get_driver(owner_id)?
            .ok_or_else(|| StoreError::not_found("driver", owner_id))?;
        update(&mut profile);

        let cf = self.cf(cf::DRIVERS)?;
        self.db
            .put_cf(&cf, keys::driver_key(owner_id), Self::serialize(&profile)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(profile)
    }

    fn list_drivers(&self) -> Result<Vec<DriverProfile>> {
        let mut drivers: Vec<DriverProfile> = self.scan(cf::DRIVERS)?;
        drivers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drivers)
    }

    // =========================================================================
    // Trip Operations
    // =========================================================================

    fn create_trip(&self, new: &NewTripRequest) -> Result<TripRequest> {
        let _guard = self.lock()?;

        let driver = self
            .get_driver(&new.owner_id)?
            .ok_or_else(|| StoreError::not_found("driver", new.owner_id))?;
        if !driver.available {
            return Err(StoreError::DriverUnavailable {
                driver_id: new.owner_id.to_string(),
            });
        }

        let id = TripId::new(self.last_trip_id()? + 1);
        let trip = TripRequest::create(id, new.clone(), Utc::now());

        let cf_trips = self.cf(cf::TRIPS)?;
        let cf_by_owner = self.cf(cf::TRIPS_BY_OWNER)?;
        let cf_by_customer = self.cf(cf::TRIPS_BY_CUSTOMER)?;
        let cf_meta = self.cf(cf::META)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_trips, keys::trip_key(id), Self::serialize(&trip)?);
        batch.put_cf(&cf_by_owner, keys::owner_trip_key(&trip.owner_id, id), []);
        batch.put_cf(
            &cf_by_customer,
            keys::customer_trip_key(&trip.customer_id, id),
            [],
        );
        batch.put_cf(&cf_meta, keys::LAST_TRIP_ID, id.to_be_bytes());
        self.write(batch)?;

        Ok(trip)
    }

    fn get_trip(&self, trip_id: TripId) -> Result<Option<TripRequest>> {
        self.get_value(cf::TRIPS, &keys::trip_key(trip_id))
    }

    fn list_trips_by_owner(&self, owner_id: &DriverId) -> Result<Vec<TripRequest>> {
        let index = self.index_keys(cf::TRIPS_BY_OWNER, &keys::owner_prefix(owner_id))?;

        let mut trips = Vec::with_capacity(index.len());
        for key in index.iter().rev() {
            if let Some(trip) = keys::trailing_trip_id(key)
                .map(|id| self.get_trip(id))
                .transpose()?
                .flatten()
            {
                trips.push(trip);
            }
        }
        Ok(trips)
    }

    fn latest_trip_for_customer(&self, customer_id: &CustomerToken) -> Result<Option<TripRequest>> {
        let index = self.index_keys(
            cf::TRIPS_BY_CUSTOMER,
            &keys::customer_trip_prefix(customer_id),
        )?;

        match index.last().and_then(|key| keys::trailing_trip_id(key)) {
            Some(id) => self.get_trip(id),
            None => Ok(None),
        }
    }

    fn transition_trip(
        &self,
        trip_id: TripId,
        owner_id: &DriverId,
        transition: Transition,
    ) -> Result<TripRequest> {
        let _guard = self.lock()?;

        let mut trip = self
            .get_trip(trip_id)?
            .filter(|t| t.owner_id == *owner_id)
            .ok_or_else(|| StoreError::not_found("trip", trip_id))?;
        if trip.apply(transition).is_err() {
            return Err(StoreError::InvalidTransition {
                trip_id,
                current: trip.status,
            });
        }

        let cf = self.cf(cf::TRIPS)?;
        self.db
            .put_cf(&cf, keys::trip_key(trip_id), Self::serialize(&trip)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(trip)
    }

    // =========================================================================
    // Payment Operations
    // =========================================================================

    fn upsert_payment(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.cf(cf::PAYMENTS)?;
        self.db
            .put_cf(
                &cf,
                keys::payment_key(&record.mp_payment_id),
                Self::serialize(record)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_payment(&self, mp_payment_id: &str) -> Result<Option<PaymentRecord>> {
        self.get_value(cf::PAYMENTS, &keys::payment_key(mp_payment_id))
    }

    fn list_payments_by_owner(&self, owner_id: &DriverId) -> Result<Vec<PaymentRecord>> {
        // The owner on a payment is unvalidated text, so there is no index.
        let owner = owner_id.to_string();
        let mut payments: Vec<PaymentRecord> = self
            .scan::<PaymentRecord>(cf::PAYMENTS)?
            .into_iter()
            .filter(|p| p.owner_id.as_deref() == Some(owner.as_str()))
            .collect();
        payments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(payments)
    }

    // =========================================================================
    // Expense Operations
    // =========================================================================

    fn put_expense(&self, expense: &Expense) -> Result<()> {
        let cf_expenses = self.cf(cf::EXPENSES)?;
        let cf_by_owner = self.cf(cf::EXPENSES_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_expenses,
            keys::expense_key(&expense.id),
            Self::serialize(expense)?,
        );
        batch.put_cf(
            &cf_by_owner,
            keys::owner_expense_key(&expense.owner_id, &expense.id),
            [],
        );
        self.write(batch)
    }

    fn list_expenses_by_owner(&self, owner_id: &DriverId) -> Result<Vec<Expense>> {
        let index = self.index_keys(cf::EXPENSES_BY_OWNER, &keys::owner_prefix(owner_id))?;

        let mut expenses = Vec::with_capacity(index.len());
        for key in index.iter().rev() {
            let Some(id) = keys::trailing_expense_id(key) else {
                continue;
            };
            if let Some(expense) = self.get_value(cf::EXPENSES, &keys::expense_key(&id))? {
                expenses.push(expense);
            }
        }
        Ok(expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use taxi_core::{ExpenseKind, PaymentCorrelation, ProfileIdentity, TripRequestDraft, TripStatus};

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn open_driver(store: &RocksStore) -> DriverId {
        let id = DriverId::generate();
        store
            .ensure_driver(&DriverProfile::new(id, &ProfileIdentity::default()))
            .unwrap();
        store.set_availability(&id, true).unwrap();
        id
    }

    fn new_trip(owner_id: DriverId, customer_id: &CustomerToken) -> NewTripRequest {
        TripRequestDraft {
            passenger_name: "Juan Perez".into(),
            pickup: "Av. Principal 123".into(),
            destination: "Centro".into(),
            ..TripRequestDraft::default()
        }
        .validate(owner_id, customer_id.clone())
        .unwrap()
    }

    #[test]
    fn driver_crud() {
        let (store, _dir) = create_test_store();
        let id = open_driver(&store);

        let stored = store.get_driver(&id).unwrap().unwrap();
        assert!(stored.available);
        assert_eq!(store.list_drivers().unwrap().len(), 1);

        let missing = store.set_availability(&DriverId::generate(), true);
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn trips_are_indexed_by_owner_and_customer() {
        let (store, _dir) = create_test_store();
        let id = open_driver(&store);
        let token = CustomerToken::generate();

        let first = store.create_trip(&new_trip(id, &token)).unwrap();
        let second = store.create_trip(&new_trip(id, &token)).unwrap();
        assert!(second.id > first.id);

        let listed = store.list_trips_by_owner(&id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        let latest = store.latest_trip_for_customer(&token).unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(store
            .latest_trip_for_customer(&CustomerToken::generate())
            .unwrap()
            .is_none());
    }

    #[test]
    fn closed_driver_rejects_trips() {
        let (store, _dir) = create_test_store();
        let id = open_driver(&store);
        store.set_availability(&id, false).unwrap();

        let err = store
            .create_trip(&new_trip(id, &CustomerToken::generate()))
            .unwrap_err();
        assert!(matches!(err, StoreError::DriverUnavailable { .. }));
        assert!(store.list_trips_by_owner(&id).unwrap().is_empty());
    }

    #[test]
    fn trip_ids_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let token = CustomerToken::generate();
        let (id, first) = {
            let store = RocksStore::open(dir.path()).unwrap();
            let id = open_driver(&store);
            (id, store.create_trip(&new_trip(id, &token)).unwrap())
        };

        let store = RocksStore::open(dir.path()).unwrap();
        let second = store.create_trip(&new_trip(id, &token)).unwrap();
        assert_eq!(second.id.get(), first.id.get() + 1);
    }

    #[test]
    fn transition_only_from_pending() {
        let (store, _dir) = create_test_store();
        let id = open_driver(&store);
        let trip = store
            .create_trip(&new_trip(id, &CustomerToken::generate()))
            .unwrap();

        let cancelled = store
            .transition_trip(trip.id, &id, Transition::Cancel)
            .unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);

        let err = store
            .transition_trip(trip.id, &id, Transition::Complete { price_cents: 100 })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.get_trip(trip.id).unwrap().unwrap().price_cents, None);
    }

    #[test]
    fn payments_upsert_by_processor_id() {
        let (store, _dir) = create_test_store();
        let owner = DriverId::generate();
        let correlation = PaymentCorrelation {
            owner_id: Some(owner.to_string()),
            ..PaymentCorrelation::default()
        };

        for status in ["pending", "approved"] {
            let record = PaymentRecord::from_processor(
                "123",
                correlation.clone(),
                serde_json::json!({"id": 123, "status": status}),
            );
            store.upsert_payment(&record).unwrap();
        }

        let stored = store.get_payment("123").unwrap().unwrap();
        assert_eq!(stored.status.as_deref(), Some("approved"));
        assert_eq!(store.list_payments_by_owner(&owner).unwrap().len(), 1);
    }

    #[test]
    fn expenses_newest_first() {
        let (store, _dir) = create_test_store();
        let owner = DriverId::generate();
        let day = chrono::NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let costs = taxi_core::CostSettings::default();

        let first = Expense::record(owner, ExpenseKind::Gas, Some(100), day, &costs).unwrap();
        store.put_expense(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = Expense::record(owner, ExpenseKind::Gas, Some(200), day, &costs).unwrap();
        store.put_expense(&second).unwrap();

        let listed = store.list_expenses_by_owner(&owner).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
    }
}

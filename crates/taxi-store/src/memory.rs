//! In-memory storage implementation.
//!
//! Every operation takes one lock, so compound rules (availability check plus
//! insert, pending check plus update) are atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use taxi_core::trip::sort_newest_first;
use taxi_core::{
    CustomerToken, DriverId, DriverProfile, Expense, NewTripRequest, PaymentRecord, Transition,
    TripId, TripRequest,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    drivers: HashMap<DriverId, DriverProfile>,
    trips: BTreeMap<TripId, TripRequest>,
    last_trip_id: i64,
    payments: HashMap<String, PaymentRecord>,
    expenses: Vec<Expense>,
}

/// Lock-protected in-process storage.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn get_driver(&self, owner_id: &DriverId) -> Result<Option<DriverProfile>> {
        Ok(self.read()?.drivers.get(owner_id).cloned())
    }

    fn ensure_driver(&self, profile: &DriverProfile) -> Result<DriverProfile> {
        let mut inner = self.write()?;
        Ok(inner
            .drivers
            .entry(profile.owner_id)
            .or_insert_with(|| profile.clone())
            .clone())
    }

    fn update_driver(
        &self,
        owner_id: &DriverId,
        update: &dyn Fn(&mut DriverProfile),
    ) -> Result<DriverProfile> {
        let mut inner = self.write()?;
        let profile = inner
            .drivers
            .get_mut(owner_id)
            .ok_or_else(|| StoreError::not_found("driver", owner_id))?;
        update(profile);
        Ok(profile.clone())
    }

    fn list_drivers(&self) -> Result<Vec<DriverProfile>> {
        let mut drivers: Vec<_> = self.read()?.drivers.values().cloned().collect();
        drivers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drivers)
    }

    fn create_trip(&self, new: &NewTripRequest) -> Result<TripRequest> {
        let mut inner = self.write()?;

        let driver = inner
            .drivers
            .get(&new.owner_id)
            .ok_or_else(|| StoreError::not_found("driver", new.owner_id))?;
        if !driver.available {
            tracing::debug!(driver_id = %new.owner_id, "Rejected trip for closed driver");
            return Err(StoreError::DriverUnavailable {
                driver_id: new.owner_id.to_string(),
            });
        }

        inner.last_trip_id += 1;
        let id = TripId::new(inner.last_trip_id);
        let trip = TripRequest::create(id, new.clone(), Utc::now());
        inner.trips.insert(id, trip.clone());
        Ok(trip)
    }

    fn get_trip(&self, trip_id: TripId) -> Result<Option<TripRequest>> {
        Ok(self.read()?.trips.get(&trip_id).cloned())
    }

    fn list_trips_by_owner(&self, owner_id: &DriverId) -> Result<Vec<TripRequest>> {
        let mut trips: Vec<_> = self
            .read()?
            .trips
            .values()
            .filter(|t| t.owner_id == *owner_id)
            .cloned()
            .collect();
        sort_newest_first(&mut trips);
        Ok(trips)
    }

    fn latest_trip_for_customer(&self, customer_id: &CustomerToken) -> Result<Option<TripRequest>> {
        Ok(self
            .read()?
            .trips
            .values()
            .filter(|t| t.customer_id == *customer_id)
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    fn transition_trip(
        &self,
        trip_id: TripId,
        owner_id: &DriverId,
        transition: Transition,
    ) -> Result<TripRequest> {
        let mut inner = self.write()?;
        let trip = inner
            .trips
            .get_mut(&trip_id)
            .filter(|t| t.owner_id == *owner_id)
            .ok_or_else(|| StoreError::not_found("trip", trip_id))?;

        if trip.apply(transition).is_err() {
            return Err(StoreError::InvalidTransition {
                trip_id,
                current: trip.status,
            });
        }
        Ok(trip.clone())
    }

    fn upsert_payment(&self, record: &PaymentRecord) -> Result<()> {
        self.write()?
            .payments
            .insert(record.mp_payment_id.clone(), record.clone());
        Ok(())
    }

    fn get_payment(&self, mp_payment_id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.read()?.payments.get(mp_payment_id).cloned())
    }

    fn list_payments_by_owner(&self, owner_id: &DriverId) -> Result<Vec<PaymentRecord>> {
        let owner = owner_id.to_string();
        let mut payments: Vec<_> = self
            .read()?
            .payments
            .values()
            .filter(|p| p.owner_id.as_deref() == Some(owner.as_str()))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(payments)
    }

    fn put_expense(&self, expense: &Expense) -> Result<()> {
        self.write()?.expenses.push(expense.clone());
        Ok(())
    }

    fn list_expenses_by_owner(&self, owner_id: &DriverId) -> Result<Vec<Expense>> {
        let mut expenses: Vec<_> = self
            .read()?
            .expenses
            .iter()
            .filter(|e| e.owner_id == *owner_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(expenses)
    }
}

//! Trip request lifecycle.
//!
//! A trip request is created `pending` by a customer and moved exactly once by
//! its driver, either to `completed` (with a price) or to `cancelled`:
//!
//! ```text
//!            +-- complete(price) --> completed
//! pending ---+
//!            +-- cancel ----------> cancelled
//! ```
//!
//! Both end states are terminal. Stores must apply a [`Transition`] with
//! [`TripRequest::apply`] under the same lock or batch that writes the
//! result, so two racing transitions cannot both succeed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxiError};
use crate::ids::{CustomerToken, DriverId, TripId};
use crate::money;

/// Status of a trip request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    /// Waiting for the driver.
    Pending,
    /// Accepted by the driver with a price.
    Completed,
    /// Rejected by the driver.
    Cancelled,
}

impl TripStatus {
    /// The wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = TaxiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(TaxiError::missing(["status"])),
        }
    }
}

/// The single state change a driver performs on a pending trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Accept the trip and set its price in the same write.
    Complete {
        /// Agreed price in cents.
        price_cents: i64,
    },
    /// Reject the trip.
    Cancel,
}

impl Transition {
    /// Build a transition from a requested outcome and optional price.
    ///
    /// `completed` requires a numeric, non-negative price; `cancelled`
    /// ignores any price. Nothing touches the store before this succeeds.
    ///
    /// # Errors
    ///
    /// - `TaxiError::Validation` naming `outcome` for an unknown outcome or
    ///   `price` when completing without one.
    /// - `TaxiError::InvalidAmount` when the price is non-numeric or negative.
    pub fn parse(outcome: &str, price: Option<&serde_json::Value>) -> Result<Self> {
        match outcome.parse::<TripStatus>() {
            Ok(TripStatus::Completed) => {
                let price = price
                    .filter(|p| !p.is_null())
                    .ok_or_else(|| TaxiError::missing(["price"]))?;
                Ok(Self::Complete {
                    price_cents: money::cents_from_json(price)?,
                })
            }
            Ok(TripStatus::Cancelled) => Ok(Self::Cancel),
            Ok(TripStatus::Pending) | Err(_) => Err(TaxiError::missing(["outcome"])),
        }
    }

    /// The status the trip ends in.
    #[must_use]
    pub const fn target(self) -> TripStatus {
        match self {
            Self::Complete { .. } => TripStatus::Completed,
            Self::Cancel => TripStatus::Cancelled,
        }
    }
}

/// Raw customer input for a new trip request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripRequestDraft {
    /// Passenger display name.
    #[serde(default)]
    pub passenger_name: String,
    /// Pickup location text.
    #[serde(default)]
    pub pickup: String,
    /// Destination location text.
    #[serde(default)]
    pub destination: String,
    /// Optional contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Optional preferred time text.
    #[serde(default)]
    pub preferred_time: Option<String>,
}

impl TripRequestDraft {
    /// Trim and check the draft, producing an insertable request.
    ///
    /// # Errors
    ///
    /// Returns `TaxiError::Validation` naming every blank required field.
    pub fn validate(&self, owner_id: DriverId, customer_id: CustomerToken) -> Result<NewTripRequest> {
        let passenger_name = self.passenger_name.trim();
        let pickup = self.pickup.trim();
        let destination = self.destination.trim();

        let missing: Vec<&str> = [
            ("passenger_name", passenger_name),
            ("pickup", pickup),
            ("destination", destination),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(TaxiError::missing(missing));
        }

        Ok(NewTripRequest {
            owner_id,
            customer_id,
            passenger_name: passenger_name.to_string(),
            pickup: pickup.to_string(),
            destination: destination.to_string(),
            passenger_phone: non_blank(self.phone.as_deref()),
            preferred_time: non_blank(self.preferred_time.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A validated trip request waiting for a store id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTripRequest {
    /// Driver the request targets.
    pub owner_id: DriverId,
    /// Customer correlation token.
    pub customer_id: CustomerToken,
    /// Passenger display name.
    pub passenger_name: String,
    /// Pickup location text.
    pub pickup: String,
    /// Destination location text.
    pub destination: String,
    /// Contact phone.
    pub passenger_phone: Option<String>,
    /// Preferred time text.
    pub preferred_time: Option<String>,
}

/// A persisted trip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    /// Store-assigned id.
    pub id: TripId,
    /// Driver the request targets.
    pub owner_id: DriverId,
    /// Customer correlation token.
    pub customer_id: CustomerToken,
    /// Passenger display name.
    pub passenger_name: String,
    /// Pickup location text.
    pub pickup: String,
    /// Destination location text.
    pub destination: String,
    /// Contact phone.
    pub passenger_phone: Option<String>,
    /// Preferred time text.
    pub preferred_time: Option<String>,
    /// Price in cents, set when the driver completes the trip.
    pub price_cents: Option<i64>,
    /// Lifecycle status.
    pub status: TripStatus,
    /// When the store accepted the request.
    pub created_at: DateTime<Utc>,
}

impl TripRequest {
    /// Materialize a new pending request.
    #[must_use]
    pub fn create(id: TripId, new: NewTripRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            customer_id: new.customer_id,
            passenger_name: new.passenger_name,
            pickup: new.pickup,
            destination: new.destination,
            passenger_phone: new.passenger_phone,
            preferred_time: new.preferred_time,
            price_cents: None,
            status: TripStatus::Pending,
            created_at,
        }
    }

    /// Apply a driver transition in place.
    ///
    /// # Errors
    ///
    /// Returns `TaxiError::State` if the trip is not pending; the record is
    /// left untouched.
    pub fn apply(&mut self, transition: Transition) -> Result<()> {
        if self.status.is_terminal() {
            return Err(TaxiError::State {
                trip_id: self.id,
                current: self.status,
            });
        }
        if let Transition::Complete { price_cents } = transition {
            self.price_cents = Some(price_cents);
        }
        self.status = transition.target();
        Ok(())
    }

    /// The UTC calendar day the request was created on.
    #[must_use]
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Whether an observer must re-render: status or price moved.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.id != other.id || self.status != other.status || self.price_cents != other.price_cents
    }
}

/// Sort trips most recent first (ties broken by id).
pub fn sort_newest_first(trips: &mut [TripRequest]) {
    trips.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// One day of a driver's trips, bucketed by status.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    /// The day summarized.
    pub day: NaiveDate,
    /// Trips still waiting.
    pub pending: Vec<TripRequest>,
    /// Accepted trips.
    pub completed: Vec<TripRequest>,
    /// Rejected trips.
    pub cancelled: Vec<TripRequest>,
    /// Sum of completed prices, in cents.
    pub income_cents: i64,
}

impl DaySummary {
    /// Bucket the trips created on `day`, preserving input order.
    #[must_use]
    pub fn for_day(trips: &[TripRequest], day: NaiveDate) -> Self {
        let mut summary = Self {
            day,
            pending: Vec::new(),
            completed: Vec::new(),
            cancelled: Vec::new(),
            income_cents: 0,
        };

        for trip in trips.iter().filter(|t| t.created_on() == day) {
            match trip.status {
                TripStatus::Pending => summary.pending.push(trip.clone()),
                TripStatus::Completed => {
                    summary.income_cents += trip.price_cents.unwrap_or(0);
                    summary.completed.push(trip.clone());
                }
                TripStatus::Cancelled => summary.cancelled.push(trip.clone()),
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn draft() -> TripRequestDraft {
        TripRequestDraft {
            passenger_name: "Juan Perez".into(),
            pickup: "Av. Principal 123".into(),
            destination: "Centro".into(),
            phone: Some("  ".into()),
            preferred_time: Some("18:30".into()),
        }
    }

    fn pending_trip(id: i64) -> TripRequest {
        let new = draft()
            .validate(DriverId::generate(), CustomerToken::generate())
            .unwrap();
        TripRequest::create(TripId::new(id), new, Utc::now())
    }

    #[test]
    fn new_trip_is_pending_without_price() {
        let trip = pending_trip(1);
        assert_eq!(trip.status, TripStatus::Pending);
        assert!(trip.price_cents.is_none());
        assert_eq!(trip.passenger_phone, None);
        assert_eq!(trip.preferred_time.as_deref(), Some("18:30"));
    }

    #[test]
    fn validation_names_all_blank_fields() {
        let draft = TripRequestDraft {
            passenger_name: "   ".into(),
            pickup: String::new(),
            destination: "Centro".into(),
            ..TripRequestDraft::default()
        };
        let err = draft
            .validate(DriverId::generate(), CustomerToken::generate())
            .unwrap_err();
        match err {
            TaxiError::Validation { fields } => assert_eq!(fields, ["passenger_name", "pickup"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn complete_requires_price() {
        assert!(matches!(
            Transition::parse("completed", None),
            Err(TaxiError::Validation { .. })
        ));
        assert!(matches!(
            Transition::parse("completed", Some(&json!(null))),
            Err(TaxiError::Validation { .. })
        ));
        assert!(matches!(
            Transition::parse("completed", Some(&json!("abc"))),
            Err(TaxiError::InvalidAmount(_))
        ));
        assert!(matches!(
            Transition::parse("completed", Some(&json!(-5))),
            Err(TaxiError::InvalidAmount(_))
        ));
        assert_eq!(
            Transition::parse("completed", Some(&json!(850.0))).unwrap(),
            Transition::Complete { price_cents: 85_000 }
        );
    }

    #[test]
    fn cancel_ignores_price_and_pending_is_not_an_outcome() {
        assert_eq!(
            Transition::parse("cancelled", Some(&json!("garbage"))).unwrap(),
            Transition::Cancel
        );
        assert!(Transition::parse("pending", None).is_err());
        assert!(Transition::parse("done", None).is_err());
    }

    #[test]
    fn apply_sets_status_and_price_together() {
        let mut trip = pending_trip(7);
        trip.apply(Transition::Complete { price_cents: 85_000 }).unwrap();
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.price_cents, Some(85_000));
    }

    #[test]
    fn terminal_trips_reject_transitions() {
        let mut trip = pending_trip(7);
        trip.apply(Transition::Cancel).unwrap();
        let before = trip.clone();

        let err = trip
            .apply(Transition::Complete { price_cents: 100 })
            .unwrap_err();
        assert!(matches!(
            err,
            TaxiError::State {
                current: TripStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(trip, before);
    }

    #[test]
    fn differs_from_tracks_status_and_price_only() {
        let a = pending_trip(3);
        let mut b = a.clone();
        b.passenger_name = "Otro".into();
        assert!(!b.differs_from(&a));
        b.price_cents = Some(500);
        assert!(b.differs_from(&a));
    }

    #[test]
    fn day_summary_buckets_by_status_and_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let at = |h| Utc.with_ymd_and_hms(2026, 3, 14, h, 0, 0).unwrap();

        let mut done = pending_trip(1);
        done.created_at = at(9);
        done.apply(Transition::Complete { price_cents: 85_000 }).unwrap();

        let mut waiting = pending_trip(2);
        waiting.created_at = at(10);

        let mut rejected = pending_trip(3);
        rejected.created_at = at(11);
        rejected.apply(Transition::Cancel).unwrap();

        let mut yesterday = pending_trip(4);
        yesterday.created_at = Utc.with_ymd_and_hms(2026, 3, 13, 23, 0, 0).unwrap();
        yesterday.apply(Transition::Complete { price_cents: 1_000 }).unwrap();

        let trips = vec![done, waiting, rejected, yesterday];
        let summary = DaySummary::for_day(&trips, day);

        assert_eq!(summary.pending.len(), 1);
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.cancelled.len(), 1);
        assert_eq!(summary.income_cents, 85_000);
    }

    #[test]
    fn newest_first_ordering() {
        let mut older = pending_trip(1);
        older.created_at = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let mut newer = pending_trip(2);
        newer.created_at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();

        let mut trips = vec![older, newer];
        sort_newest_first(&mut trips);
        assert_eq!(trips[0].id, TripId::new(2));
    }
}

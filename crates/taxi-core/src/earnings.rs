//! Earnings arithmetic over trips and expenses.
//!
//! Only completed trips count as income.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::driver::CostSettings;
use crate::expense::Expense;
use crate::trip::{TripRequest, TripStatus};

/// Income and expenses for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyEarnings {
    /// The day.
    pub date: NaiveDate,
    /// Completed trip income.
    pub income_cents: i64,
    /// Expenses recorded for the day.
    pub expense_cents: i64,
    /// Income minus expenses.
    pub net_cents: i64,
}

impl DailyEarnings {
    /// Compute a day's earnings.
    #[must_use]
    pub fn compute(trips: &[TripRequest], expenses: &[Expense], date: NaiveDate) -> Self {
        let income_cents = completed_income(trips, |day| day == date).1;
        let expense_cents = expenses
            .iter()
            .filter(|e| e.date == date)
            .map(|e| e.amount_cents)
            .sum();

        Self {
            date,
            income_cents,
            expense_cents,
            net_cents: income_cents - expense_cents,
        }
    }
}

/// Income and expenses for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyEarnings {
    /// Year.
    pub year: i32,
    /// Month, 1-based.
    pub month: u32,
    /// Completed trip income.
    pub income_cents: i64,
    /// Recorded expenses.
    pub variable_expense_cents: i64,
    /// Insurance plus registration.
    pub fixed_cost_cents: i64,
    /// Variable plus fixed.
    pub total_expense_cents: i64,
    /// Income minus total expenses.
    pub net_cents: i64,
    /// Number of completed trips.
    pub trip_count: usize,
}

impl MonthlyEarnings {
    /// Compute a month's earnings.
    #[must_use]
    pub fn compute(
        trips: &[TripRequest],
        expenses: &[Expense],
        costs: &CostSettings,
        year: i32,
        month: u32,
    ) -> Self {
        let in_month = |day: NaiveDate| day.year() == year && day.month() == month;
        let (trip_count, income_cents) = completed_income(trips, in_month);
        let variable_expense_cents: i64 = expenses
            .iter()
            .filter(|e| in_month(e.date))
            .map(|e| e.amount_cents)
            .sum();
        let fixed_cost_cents = costs.fixed_monthly_cents();
        let total_expense_cents = variable_expense_cents + fixed_cost_cents;

        Self {
            year,
            month,
            income_cents,
            variable_expense_cents,
            fixed_cost_cents,
            total_expense_cents,
            net_cents: income_cents - total_expense_cents,
            trip_count,
        }
    }
}

fn completed_income(trips: &[TripRequest], on: impl Fn(NaiveDate) -> bool) -> (usize, i64) {
    trips
        .iter()
        .filter(|t| t.status == TripStatus::Completed && on(t.created_on()))
        .fold((0, 0), |(count, sum), t| {
            (count + 1, sum + t.price_cents.unwrap_or(0))
        })
}

/// The `count` months ending with `today`'s month, oldest first.
#[must_use]
pub fn recent_months(today: NaiveDate, count: u32) -> Vec<(i32, u32)> {
    let mut months = Vec::with_capacity(count as usize);
    let (mut year, mut month) = (today.year(), today.month());
    for _ in 0..count {
        months.push((year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::ExpenseKind;
    use crate::ids::{CustomerToken, DriverId, TripId};
    use crate::trip::{Transition, TripRequestDraft};
    use chrono::{TimeZone, Utc};

    fn trip(day: u32, month: u32, price: Option<i64>) -> TripRequest {
        let new = TripRequestDraft {
            passenger_name: "P".into(),
            pickup: "A".into(),
            destination: "B".into(),
            ..TripRequestDraft::default()
        }
        .validate(DriverId::generate(), CustomerToken::generate())
        .unwrap();
        let created = Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap();
        let mut trip = TripRequest::create(TripId::new(i64::from(day)), new, created);
        match price {
            Some(price_cents) => trip.apply(Transition::Complete { price_cents }).unwrap(),
            None => trip.apply(Transition::Cancel).unwrap(),
        }
        trip
    }

    fn expense(day: u32, month: u32, amount: i64) -> Expense {
        Expense::record(
            DriverId::generate(),
            ExpenseKind::Gas,
            Some(amount),
            NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            &CostSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn daily_counts_completed_only() {
        let trips = vec![trip(3, 4, Some(85_000)), trip(3, 4, None), trip(4, 4, Some(1_000))];
        let expenses = vec![expense(3, 4, 20_000), expense(4, 4, 5)];
        let day = DailyEarnings::compute(&trips, &expenses, NaiveDate::from_ymd_opt(2026, 4, 3).unwrap());
        assert_eq!(day.income_cents, 85_000);
        assert_eq!(day.expense_cents, 20_000);
        assert_eq!(day.net_cents, 65_000);
    }

    #[test]
    fn monthly_includes_fixed_costs() {
        let trips = vec![trip(3, 4, Some(85_000)), trip(9, 4, Some(15_000)), trip(1, 5, Some(9))];
        let expenses = vec![expense(3, 4, 20_000)];
        let costs = CostSettings {
            gas_unit_cost_cents: 0,
            insurance_monthly_cents: 30_000,
            registration_monthly_cents: 10_000,
        };
        let month = MonthlyEarnings::compute(&trips, &expenses, &costs, 2026, 4);
        assert_eq!(month.trip_count, 2);
        assert_eq!(month.income_cents, 100_000);
        assert_eq!(month.total_expense_cents, 60_000);
        assert_eq!(month.net_cents, 40_000);
    }

    #[test]
    fn recent_months_wraps_year() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        assert_eq!(
            recent_months(today, 4),
            vec![(2025, 11), (2025, 12), (2026, 1), (2026, 2)]
        );
    }
}

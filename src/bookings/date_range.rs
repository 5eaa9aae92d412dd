use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::bookings::error::BookingError;

/// Half-open stay range `[check_in, check_out)` at calendar-day granularity.
///
/// Construction guarantees `check_in < check_out`, so every range covers at
/// least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting empty or inverted ones
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        if check_out <= check_in {
            return Err(BookingError::ValidationError(format!(
                "Check-out date ({}) must be after check-in date ({})",
                check_out, check_in
            )));
        }
        Ok(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights, i.e. the day difference `check_out - check_in`
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Two ranges intersect iff `a.check_in < b.check_out && a.check_out > b.check_in`
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }

    /// Whether a single night falls inside the stay
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Iterate every night of the stay, check-in inclusive, check-out exclusive
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        std::iter::successors(Some(self.check_in), |date| date.checked_add_days(Days::new(1)))
            .take_while(move |date| *date < check_out)
    }
}

// Availability Checker
//
// Decides whether a stay can be booked: listing status, stay rules, overlap
// with blocking bookings, and host-blocked calendar dates. Violations are
// folded into one unavailable result so callers can render a single message.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::bookings::{
    error::DATES_ALREADY_BOOKED, Booking, CalendarDay, DateRange, Property, PropertyStatus,
};

/// Outcome of an availability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub available: bool,
    pub reason: Option<String>,
    pub unavailable_dates: Vec<NaiveDate>,
}

impl AvailabilityResult {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            unavailable_dates: Vec::new(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            unavailable_dates: Vec::new(),
        }
    }
}

/// Pure availability rules over data loaded by the caller
pub struct AvailabilityChecker;

impl AvailabilityChecker {
    /// Evaluate every rule in order; the first failure wins
    ///
    /// # Arguments
    /// * `property` - Property being booked
    /// * `range` - Requested stay
    /// * `guests` - Number of guests
    /// * `today` - Current UTC calendar date
    /// * `bookings` - Existing bookings of the property (any status)
    /// * `calendar` - Calendar rows covering the stay
    /// * `exclude_booking_id` - Booking to ignore, e.g. when re-checking an existing stay
    pub fn evaluate(
        property: &Property,
        range: &DateRange,
        guests: i32,
        today: NaiveDate,
        bookings: &[Booking],
        calendar: &[CalendarDay],
        exclude_booking_id: Option<Uuid>,
    ) -> AvailabilityResult {
        if let Some(reason) = Self::check_stay_rules(property, range, guests, today) {
            return AvailabilityResult::unavailable(reason);
        }

        if Self::find_conflicts(bookings, property.id, range, exclude_booking_id)
            .next()
            .is_some()
        {
            return AvailabilityResult::unavailable(DATES_ALREADY_BOOKED);
        }

        let blocked = Self::blocked_dates(calendar, property.id, range);
        if !blocked.is_empty() {
            return AvailabilityResult {
                available: false,
                reason: Some("Some of the selected dates are not available".to_string()),
                unavailable_dates: blocked,
            };
        }

        AvailabilityResult::available()
    }

    /// Listing status, past dates, guest capacity, and stay length
    pub fn check_stay_rules(
        property: &Property,
        range: &DateRange,
        guests: i32,
        today: NaiveDate,
    ) -> Option<String> {
        if range.check_in() < today {
            return Some("Dates in the past cannot be booked".to_string());
        }

        if property.status != PropertyStatus::Approved {
            return Some("This property is not currently accepting bookings".to_string());
        }

        if guests > property.max_guests {
            return Some(format!(
                "This property accommodates at most {} guests",
                property.max_guests
            ));
        }

        let nights = range.nights();
        if nights < i64::from(property.min_nights) {
            return Some(format!("The minimum stay is {} nights", property.min_nights));
        }
        if nights > i64::from(property.max_nights) {
            return Some(format!("The maximum stay is {} nights", property.max_nights));
        }

        None
    }

    /// Blocking bookings of `property_id` whose range overlaps `range`
    pub fn find_conflicts<'a>(
        bookings: &'a [Booking],
        property_id: Uuid,
        range: &'a DateRange,
        exclude_booking_id: Option<Uuid>,
    ) -> impl Iterator<Item = &'a Booking> + 'a {
        bookings.iter().filter(move |booking| {
            booking.property_id == property_id
                && booking.status.is_blocking()
                && Some(booking.id) != exclude_booking_id
                && booking.check_in < range.check_out()
                && booking.check_out > range.check_in()
        })
    }

    /// Nights inside the stay the host marked unavailable, sorted
    pub fn blocked_dates(calendar: &[CalendarDay], property_id: Uuid, range: &DateRange) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = calendar
            .iter()
            .filter(|day| day.property_id == property_id && !day.available && range.contains(day.date))
            .map(|day| day.date)
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::bookings::{CalendarDay, Property};

/// Resolves the nightly price of a property for one calendar date
///
/// A calendar override with a price wins over the property's base rate.
/// Rows that only mark availability (no override) fall back to the base rate.
pub struct RateResolver<'a> {
    property: &'a Property,
    overrides: HashMap<NaiveDate, Decimal>,
}

impl<'a> RateResolver<'a> {
    /// Build a resolver over the calendar rows loaded for a stay
    ///
    /// Rows belonging to other properties are ignored.
    pub fn new(property: &'a Property, calendar: &[CalendarDay]) -> Self {
        let overrides = calendar
            .iter()
            .filter(|day| day.property_id == property.id)
            .filter_map(|day| day.price_override.map(|price| (day.date, price)))
            .collect();

        Self { property, overrides }
    }

    pub fn resolve(&self, date: NaiveDate) -> Decimal {
        self.overrides
            .get(&date)
            .copied()
            .unwrap_or(self.property.price_per_night)
    }
}

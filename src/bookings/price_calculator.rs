use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bookings::{rate_resolver::RateResolver, CalendarDay, DateRange, Property};

/// Service fee charged on top of the accommodation total (10%)
pub const SERVICE_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Round a money amount to the currency's minor unit (KRW has none), half-up
pub fn round_to_currency_unit(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Price breakdown for a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PricingResult {
    /// Resolved rate of the first night, for display
    pub nightly_rate: Decimal,
    pub number_of_nights: i32,
    pub accommodation_total: Decimal,
    pub service_fee: Decimal,
    pub total: Decimal,
}

/// Service for pricing stays night by night
pub struct PriceCalculator;

impl PriceCalculator {
    /// Price a stay by summing each night's resolved rate
    ///
    /// # Arguments
    /// * `property` - Property being booked
    /// * `calendar` - Calendar rows covering the stay (overrides may be sparse)
    /// * `range` - Stay range; nights are `[check_in, check_out)`
    ///
    /// # Returns
    /// Breakdown where `total = accommodation_total + service_fee`
    pub fn calculate(property: &Property, calendar: &[CalendarDay], range: &DateRange) -> PricingResult {
        let resolver = RateResolver::new(property, calendar);

        let (accommodation_total, number_of_nights) = range
            .nights_iter()
            .fold((Decimal::ZERO, 0i32), |(total, nights), night| {
                (total + resolver.resolve(night), nights + 1)
            });
        let service_fee = Self::calculate_service_fee(accommodation_total);

        PricingResult {
            nightly_rate: resolver.resolve(range.check_in()),
            number_of_nights,
            accommodation_total,
            service_fee,
            total: accommodation_total + service_fee,
        }
    }

    /// `round(accommodation_total * 0.10)`, half-up
    pub fn calculate_service_fee(accommodation_total: Decimal) -> Decimal {
        round_to_currency_unit(accommodation_total * SERVICE_FEE_RATE)
    }
}

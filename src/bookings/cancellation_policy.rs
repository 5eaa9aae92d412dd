use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bookings::price_calculator::round_to_currency_unit;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Refund tier selected by the days remaining before check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancellationTier {
    /// 7 or more days before check-in
    FullRefund,
    /// 3 to 6 days before check-in
    HalfRefund,
    /// Fewer than 3 days before check-in
    NoRefund,
}

impl CancellationTier {
    pub fn refund_rate(&self) -> Decimal {
        match self {
            CancellationTier::FullRefund => Decimal::ONE,
            CancellationTier::HalfRefund => Decimal::from_parts(5, 0, 0, false, 1),
            CancellationTier::NoRefund => Decimal::ZERO,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CancellationTier::FullRefund => "Full refund",
            CancellationTier::HalfRefund => "50% refund",
            CancellationTier::NoRefund => "No refund",
        }
    }
}

impl std::fmt::Display for CancellationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationTier::FullRefund => write!(f, "full_refund"),
            CancellationTier::HalfRefund => write!(f, "half_refund"),
            CancellationTier::NoRefund => write!(f, "no_refund"),
        }
    }
}

/// Policy outcome for a cancellation requested at a given instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub days_until_check_in: i64,
    pub tier: CancellationTier,
    pub refund_rate: Decimal,
    pub description: String,
}

impl CancellationPolicy {
    /// Select the refund tier for a stay starting on `check_in`
    ///
    /// Check-in is taken as midnight UTC of the check-in date. The remaining
    /// time is rounded up to whole days, so 6.1 days away counts as 7.
    pub fn calculate(check_in: NaiveDate, now: DateTime<Utc>) -> Self {
        let days_until_check_in = days_until(check_in, now);

        let tier = if days_until_check_in >= 7 {
            CancellationTier::FullRefund
        } else if days_until_check_in >= 3 {
            CancellationTier::HalfRefund
        } else {
            CancellationTier::NoRefund
        };

        Self {
            days_until_check_in,
            tier,
            refund_rate: tier.refund_rate(),
            description: tier.description().to_string(),
        }
    }

    /// `round(total_amount * refund_rate)`, half-up
    pub fn refund_amount(&self, total_amount: Decimal) -> Decimal {
        round_to_currency_unit(total_amount * self.refund_rate)
    }
}

/// Ceiling of the millisecond distance to check-in, in days
fn days_until(check_in: NaiveDate, now: DateTime<Utc>) -> i64 {
    let check_in_at = check_in.and_time(chrono::NaiveTime::MIN).and_utc();
    let millis = (check_in_at - now).num_milliseconds();
    -(-millis).div_euclid(MILLIS_PER_DAY)
}

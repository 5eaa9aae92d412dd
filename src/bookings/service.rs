use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::bookings::{
    availability::{AvailabilityChecker, AvailabilityResult},
    notifier::{spawn_booking_created, BookingCreatedEvent, BookingNotifier},
    repository::{payment_order_id, BookingStore},
    AvailabilityResponse, Booking, BookingError, BookingListQuery, BookingListResponse, BookingStatus,
    BookingStatusMachine, CalendarDay, CancelBookingResponse, Cancellation, CancellationPolicy,
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreateBookingRequest, DateRange, NewBooking,
    NewPayment, Pagination, Payment, PaymentConfirmation, PriceCalculator, PricingResult, Property,
    RefundSummary,
};

/// Payments are settled in Korean won
pub const CURRENCY: &str = "KRW";

const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Longest stay a quote will price
pub const MAX_QUOTE_NIGHTS: i64 = 365;

/// Service for booking business logic
///
/// Owns no state of its own: persistence goes through the injected
/// [`BookingStore`] and host notifications through the [`BookingNotifier`].
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn BookingNotifier>,
}

impl BookingService {
    /// Create a new BookingService
    pub fn new(store: Arc<dyn BookingStore>, notifier: Arc<dyn BookingNotifier>) -> Self {
        Self { store, notifier }
    }

    async fn load_property(&self, property_id: Uuid) -> Result<Property, BookingError> {
        self.store
            .find_property(property_id)
            .await?
            .ok_or(BookingError::PropertyNotFound(property_id))
    }

    /// Nightly price of a property on one date
    ///
    /// # Returns
    /// The calendar override for that date if one is set, else the base rate
    pub async fn resolve_nightly_rate(
        &self,
        property_id: Uuid,
        date: NaiveDate,
    ) -> Result<Decimal, BookingError> {
        let property = self.load_property(property_id).await?;
        let next_day = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| BookingError::ValidationError(format!("Date {} is out of range", date)))?;
        let night = DateRange::new(date, next_day)?;
        let calendar = self.store.find_calendar(property_id, &night).await?;

        Ok(PriceCalculator::calculate(&property, &calendar, &night).nightly_rate)
    }

    /// Price a stay without checking availability
    pub async fn quote(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<PricingResult, BookingError> {
        let range = DateRange::new(check_in, check_out)?;
        if range.nights() > MAX_QUOTE_NIGHTS {
            return Err(BookingError::ValidationError(format!(
                "A quote covers at most {} nights",
                MAX_QUOTE_NIGHTS
            )));
        }
        let property = self.load_property(property_id).await?;
        let calendar = self.store.find_calendar(property_id, &range).await?;

        Ok(PriceCalculator::calculate(&property, &calendar, &range))
    }

    /// Advisory availability check
    ///
    /// Rule violations come back as an unavailable result, not as errors.
    /// Only malformed input, an unknown property, or a storage failure is an
    /// error.
    ///
    /// # Arguments
    /// * `guests` - Party size; must be at least 1
    /// * `exclude_booking_id` - Existing booking to ignore in the overlap check
    /// * `today` - Current UTC date, for the past-date rule
    pub async fn check_availability(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        exclude_booking_id: Option<Uuid>,
        today: NaiveDate,
    ) -> Result<AvailabilityResult, BookingError> {
        let range = DateRange::new(check_in, check_out)?;
        if guests < 1 {
            return Err(BookingError::ValidationError("Guests must be at least 1".to_string()));
        }
        if range.check_in() < today {
            return Ok(AvailabilityResult::unavailable("Dates in the past cannot be booked"));
        }

        let property = self.load_property(property_id).await?;
        let (bookings, calendar) = self.load_stay_state(&property, &range, exclude_booking_id).await?;

        Ok(AvailabilityChecker::evaluate(
            &property,
            &range,
            guests,
            today,
            &bookings,
            &calendar,
            exclude_booking_id,
        ))
    }

    /// Availability check that also prices the stay when it is bookable
    pub async fn check_availability_with_price(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        today: NaiveDate,
    ) -> Result<AvailabilityResponse, BookingError> {
        let result = self
            .check_availability(property_id, check_in, check_out, guests, None, today)
            .await?;

        let price = if result.available {
            Some(self.quote(property_id, check_in, check_out).await?)
        } else {
            None
        };

        Ok(AvailabilityResponse {
            available: result.available,
            reason: result.reason,
            unavailable_dates: result.unavailable_dates,
            price,
        })
    }

    async fn load_stay_state(
        &self,
        property: &Property,
        range: &DateRange,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<(Vec<Booking>, Vec<CalendarDay>), BookingError> {
        let bookings = self
            .store
            .find_overlapping_bookings(property.id, range, exclude_booking_id)
            .await?;
        let calendar = self.store.find_calendar(property.id, range).await?;
        Ok((bookings, calendar))
    }

    /// Create a PENDING booking and its payment intent
    ///
    /// # Arguments
    /// * `user_id` - Authenticated user making the booking
    /// * `request` - Stay, party size and guest contact details
    /// * `now` - Request time; drives the past-date rule and the order id
    ///
    /// # Returns
    /// The booking with its snapshot price and the READY payment intent
    ///
    /// # Concurrency
    /// The availability check here is advisory. The store repeats the
    /// overlap check inside the insert transaction, so of several concurrent
    /// requests for overlapping dates at most one succeeds.
    pub async fn create_booking(
        &self,
        user_id: &str,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<(Booking, Payment), BookingError> {
        request.validate()?;
        let range = DateRange::new(request.check_in, request.check_out)?;

        let property = self.load_property(request.property_id).await?;
        let (bookings, calendar) = self.load_stay_state(&property, &range, None).await?;

        let availability = AvailabilityChecker::evaluate(
            &property,
            &range,
            request.guests,
            now.date_naive(),
            &bookings,
            &calendar,
            None,
        );
        if !availability.available {
            let reason = availability
                .reason
                .unwrap_or_else(|| "The selected dates are not available".to_string());
            return Err(BookingError::DateRangeUnavailable(reason));
        }

        let price = PriceCalculator::calculate(&property, &calendar, &range);

        let booking_id = Uuid::new_v4();
        let new_booking = NewBooking {
            id: booking_id,
            property_id: property.id,
            user_id: user_id.to_string(),
            check_in: range.check_in(),
            check_out: range.check_out(),
            guests: request.guests,
            nightly_rate: price.nightly_rate,
            number_of_nights: price.number_of_nights,
            accommodation_total: price.accommodation_total,
            service_fee: price.service_fee,
            total_amount: price.total,
            guest_name: request.guest_info.name,
            guest_phone: request.guest_info.phone,
            guest_email: request.guest_info.email,
            special_requests: request.special_requests,
        };
        let new_payment = NewPayment {
            id: Uuid::new_v4(),
            order_id: payment_order_id(booking_id, now),
            order_name: format!("{} booking", property.name),
            amount: price.total,
            currency: CURRENCY.to_string(),
        };

        let (booking, payment) = self
            .store
            .insert_booking_if_available(new_booking, new_payment)
            .await?;

        tracing::info!(
            "Created booking {} for property {} ({} to {}), total {}",
            booking.id,
            booking.property_id,
            booking.check_in,
            booking.check_out,
            booking.total_amount
        );

        spawn_booking_created(
            self.notifier.clone(),
            BookingCreatedEvent::new(&booking, &property.name),
        );

        Ok((booking, payment))
    }

    /// Fetch a booking owned by `user_id`
    pub async fn get_booking(&self, user_id: &str, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        if booking.user_id != user_id {
            return Err(BookingError::Forbidden(format!(
                "User {} does not own booking {}",
                user_id, booking_id
            )));
        }

        Ok(booking)
    }

    /// A user's bookings, newest first
    pub async fn list_user_bookings(
        &self,
        user_id: &str,
        query: BookingListQuery,
    ) -> Result<BookingListResponse, BookingError> {
        query.validate()?;
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
            BookingError::ValidationError(format!("Page {} is out of range", page))
        })?;

        let (bookings, total) = self
            .store
            .list_user_bookings(user_id, query.status, limit, offset)
            .await?;

        Ok(BookingListResponse {
            bookings,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        })
    }

    /// Cancel a CONFIRMED booking on behalf of its owner
    ///
    /// The refund follows the tiered policy at `now`. A booking that is
    /// already cancelled is rejected, never refunded twice.
    pub async fn cancel_booking(
        &self,
        user_id: &str,
        booking_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CancelBookingResponse, BookingError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BookingError::InvalidReason(
                "A cancellation reason is required".to_string(),
            ));
        }

        let booking = self.get_booking(user_id, booking_id).await?;

        BookingStatusMachine::transition(booking.status, BookingStatus::Cancelled).map_err(|_| {
            BookingError::NotCancellable(format!(
                "Only confirmed bookings can be cancelled (current status: {})",
                booking.status
            ))
        })?;

        let policy = CancellationPolicy::calculate(booking.check_in, now);
        let refund_amount = policy.refund_amount(booking.total_amount);

        let record = self
            .store
            .cancel_booking(Cancellation {
                booking_id,
                reason: reason.to_string(),
                refund_amount,
                refund_rate: policy.refund_rate,
                tier: policy.tier,
                policy_description: policy.description.clone(),
                cancelled_at: now,
            })
            .await?;

        tracing::info!(
            "Cancelled booking {} ({} days before check-in), refund {}",
            booking_id,
            policy.days_until_check_in,
            refund_amount
        );

        Ok(CancelBookingResponse {
            booking: record.booking,
            refund: RefundSummary {
                amount: refund_amount,
                refund_rate: policy.refund_rate,
                tier: policy.tier,
                policy: policy.description,
                transaction_id: record.refund_transaction.map(|t| t.external_id),
            },
        })
    }

    /// Settle a payment reported by the payment collaborator
    ///
    /// The reported amount must equal the payment intent. The booking moves
    /// PENDING → CONFIRMED in the same transaction as the payment.
    pub async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<ConfirmPaymentResponse, BookingError> {
        request.validate()?;

        let payment = self
            .store
            .find_payment_by_order_id(&request.order_id)
            .await?
            .ok_or_else(|| BookingError::PaymentNotFound(request.order_id.clone()))?;

        if payment.amount != request.amount {
            return Err(BookingError::PaymentMismatch {
                expected: payment.amount,
                actual: request.amount,
            });
        }

        let booking = self
            .store
            .find_booking(payment.booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(payment.booking_id))?;

        BookingStatusMachine::transition(booking.status, BookingStatus::Confirmed)
            .map_err(BookingError::InvalidTransition)?;

        let (booking, payment) = self
            .store
            .confirm_payment(PaymentConfirmation {
                payment_id: payment.id,
                booking_id: booking.id,
                payment_key: request.payment_key,
                confirmed_at: now,
            })
            .await?;

        tracing::info!("Confirmed booking {} (order {})", booking.id, payment.order_id);

        Ok(ConfirmPaymentResponse { booking, payment })
    }
}

// In-memory BookingStore for service and handler tests
//
// A single async mutex guards all state, so every trait method is atomic the
// same way a database transaction would be.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::bookings::{
    availability::AvailabilityChecker,
    error::{BookingError, DATES_ALREADY_BOOKED},
    repository::{refund_external_id, refund_metadata, BookingStore},
    Booking, BookingStatus, CalendarDay, Cancellation, CancellationRecord, DateRange, NewBooking,
    NewPayment, Payment, PaymentConfirmation, PaymentStatus, PaymentTransaction, Property,
};

#[derive(Default)]
struct State {
    properties: HashMap<Uuid, Property>,
    calendar: Vec<CalendarDay>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
    transactions: Vec<PaymentTransaction>,
    /// Remaining reads that fail with a transient error
    transient_failures: u32,
}

#[derive(Default)]
pub struct MemoryBookingStore {
    state: Mutex<State>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_property(&self, property: Property) {
        self.state.lock().await.properties.insert(property.id, property);
    }

    /// Insert or replace the calendar row for (property, date)
    pub async fn upsert_calendar_day(&self, day: CalendarDay) {
        let mut state = self.state.lock().await;
        state
            .calendar
            .retain(|d| !(d.property_id == day.property_id && d.date == day.date));
        state.calendar.push(day);
    }

    /// Make the next `count` property lookups fail as a lost connection would
    pub async fn fail_next_reads(&self, count: u32) {
        self.state.lock().await.transient_failures = count;
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.state.lock().await.bookings.clone()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.clone()
    }

    pub async fn transactions(&self) -> Vec<PaymentTransaction> {
        self.state.lock().await.transactions.clone()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn find_property(&self, property_id: Uuid) -> Result<Option<Property>, BookingError> {
        let mut state = self.state.lock().await;
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(BookingError::Transient("connection reset".to_string()));
        }
        Ok(state.properties.get(&property_id).cloned())
    }

    async fn find_calendar(
        &self,
        property_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<CalendarDay>, BookingError> {
        let state = self.state.lock().await;
        Ok(state
            .calendar
            .iter()
            .filter(|day| day.property_id == property_id && range.contains(day.date))
            .cloned()
            .collect())
    }

    async fn find_overlapping_bookings(
        &self,
        property_id: Uuid,
        range: &DateRange,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingError> {
        let state = self.state.lock().await;
        Ok(
            AvailabilityChecker::find_conflicts(&state.bookings, property_id, range, exclude_booking_id)
                .cloned()
                .collect(),
        )
    }

    async fn insert_booking_if_available(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> Result<(Booking, Payment), BookingError> {
        let mut state = self.state.lock().await;

        if !state.properties.contains_key(&booking.property_id) {
            return Err(BookingError::PropertyNotFound(booking.property_id));
        }

        let range = DateRange::new(booking.check_in, booking.check_out)?;
        if AvailabilityChecker::find_conflicts(&state.bookings, booking.property_id, &range, None)
            .next()
            .is_some()
        {
            return Err(BookingError::DateRangeUnavailable(DATES_ALREADY_BOOKED.to_string()));
        }

        let now = Utc::now();
        let created = Booking {
            id: booking.id,
            property_id: booking.property_id,
            user_id: booking.user_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            status: BookingStatus::Pending,
            nightly_rate: booking.nightly_rate,
            number_of_nights: booking.number_of_nights,
            accommodation_total: booking.accommodation_total,
            service_fee: booking.service_fee,
            total_amount: booking.total_amount,
            guest_name: booking.guest_name,
            guest_phone: booking.guest_phone,
            guest_email: booking.guest_email,
            special_requests: booking.special_requests,
            cancellation_reason: None,
            rejection_reason: None,
            refund_amount: None,
            confirmed_at: None,
            cancelled_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: payment.id,
            booking_id: created.id,
            order_id: payment.order_id,
            order_name: payment.order_name,
            amount: payment.amount,
            currency: payment.currency,
            status: PaymentStatus::Ready,
            payment_key: None,
            refund_amount: None,
            refund_reason: None,
            approved_at: None,
            cancelled_at: None,
            created_at: now,
        };

        state.bookings.push(created.clone());
        state.payments.push(payment.clone());
        Ok((created, payment))
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let state = self.state.lock().await;
        Ok(state.bookings.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, BookingError> {
        let state = self.state.lock().await;
        Ok(state.payments.iter().find(|p| p.order_id == order_id).cloned())
    }

    async fn list_user_bookings(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&Booking> = state
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id && status.map_or(true, |s| b.status == s))
            .collect();
        // Newest first; insertion order breaks ties
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn cancel_booking(&self, cancellation: Cancellation) -> Result<CancellationRecord, BookingError> {
        let mut state = self.state.lock().await;

        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == cancellation.booking_id && b.status == BookingStatus::Confirmed)
            .ok_or_else(|| {
                BookingError::NotCancellable("Only confirmed bookings can be cancelled".to_string())
            })?;
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(cancellation.cancelled_at);
        booking.cancellation_reason = Some(cancellation.reason.clone());
        booking.refund_amount = Some(cancellation.refund_amount);
        booking.updated_at = Utc::now();
        let booking = booking.clone();

        let mut payment = None;
        let mut refund_transaction = None;

        if cancellation.refund_amount > Decimal::ZERO {
            if let Some(existing) = state
                .payments
                .iter_mut()
                .find(|p| p.booking_id == cancellation.booking_id)
            {
                existing.status = PaymentStatus::Cancelled;
                existing.cancelled_at = Some(cancellation.cancelled_at);
                existing.refund_amount = Some(cancellation.refund_amount);
                existing.refund_reason = Some(cancellation.reason.clone());
                let updated = existing.clone();

                let transaction = PaymentTransaction {
                    id: Uuid::new_v4(),
                    payment_id: updated.id,
                    external_id: refund_external_id(&cancellation),
                    kind: "REFUND".to_string(),
                    amount: cancellation.refund_amount,
                    status: "SUCCESS".to_string(),
                    metadata: refund_metadata(&cancellation),
                    created_at: Utc::now(),
                };
                state.transactions.push(transaction.clone());

                payment = Some(updated);
                refund_transaction = Some(transaction);
            }
        }

        Ok(CancellationRecord {
            booking,
            payment,
            refund_transaction,
        })
    }

    async fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<(Booking, Payment), BookingError> {
        let mut state = self.state.lock().await;

        let booking_pending = state
            .bookings
            .iter()
            .any(|b| b.id == confirmation.booking_id && b.status == BookingStatus::Pending);
        if !booking_pending {
            return Err(BookingError::InvalidTransition(
                "Only pending bookings can be confirmed".to_string(),
            ));
        }
        let payment_ready = state
            .payments
            .iter()
            .any(|p| p.id == confirmation.payment_id && p.status == PaymentStatus::Ready);
        if !payment_ready {
            return Err(BookingError::InvalidTransition(
                "Payment has already been processed".to_string(),
            ));
        }

        let mut confirmed = None;
        if let Some(booking) = state.bookings.iter_mut().find(|b| b.id == confirmation.booking_id) {
            booking.status = BookingStatus::Confirmed;
            booking.confirmed_at = Some(confirmation.confirmed_at);
            booking.updated_at = Utc::now();
            confirmed = Some(booking.clone());
        }

        let mut settled = None;
        if let Some(payment) = state.payments.iter_mut().find(|p| p.id == confirmation.payment_id) {
            payment.status = PaymentStatus::Done;
            payment.payment_key = Some(confirmation.payment_key.clone());
            payment.approved_at = Some(confirmation.confirmed_at);
            settled = Some(payment.clone());
        }

        match (confirmed, settled) {
            (Some(booking), Some(payment)) => Ok((booking, payment)),
            _ => Err(BookingError::DatabaseError("confirmation lost".to_string())),
        }
    }
}

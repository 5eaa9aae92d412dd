use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::bookings::{
    error::{BookingError, DATES_ALREADY_BOOKED},
    Booking, BookingStatus, CalendarDay, Cancellation, CancellationRecord, DateRange, NewBooking,
    NewPayment, Payment, PaymentConfirmation, PaymentTransaction, Property,
};

const BOOKING_COLUMNS: &str = r#"
    id, property_id, user_id, check_in, check_out, guests, status,
    nightly_rate, number_of_nights, accommodation_total, service_fee, total_amount,
    guest_name, guest_phone, guest_email, special_requests,
    cancellation_reason, rejection_reason, refund_amount,
    confirmed_at, cancelled_at, rejected_at, created_at, updated_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, booking_id, order_id, order_name, amount, currency, status, payment_key,
    refund_amount, refund_reason, approved_at, cancelled_at, created_at
"#;

/// Persistence operations the booking core relies on
///
/// `insert_booking_if_available`, `cancel_booking` and `confirm_payment`
/// are each atomic: they either commit every write or none.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_property(&self, property_id: Uuid) -> Result<Option<Property>, BookingError>;

    /// Calendar rows of a property for the nights of `range`
    async fn find_calendar(
        &self,
        property_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<CalendarDay>, BookingError>;

    /// Bookings in a blocking status whose range overlaps `range`
    async fn find_overlapping_bookings(
        &self,
        property_id: Uuid,
        range: &DateRange,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingError>;

    /// Re-check overlap and insert booking plus payment intent in one transaction
    ///
    /// Fails with `DateRangeUnavailable` when a blocking booking overlaps,
    /// in which case nothing is written.
    async fn insert_booking_if_available(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> Result<(Booking, Payment), BookingError>;

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError>;

    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, BookingError>;

    /// A user's bookings, newest first, with the unpaginated total
    async fn list_user_bookings(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError>;

    /// Move a CONFIRMED booking to CANCELLED and record the refund
    ///
    /// Fails with `NotCancellable` if the booking is no longer CONFIRMED.
    async fn cancel_booking(&self, cancellation: Cancellation) -> Result<CancellationRecord, BookingError>;

    /// Settle the payment and move its PENDING booking to CONFIRMED
    async fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<(Booking, Payment), BookingError>;
}

/// PostgreSQL-backed booking store
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a new PgBookingStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_property(&self, property_id: Uuid) -> Result<Option<Property>, BookingError> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, host_id, name, price_per_night, min_nights, max_nights, max_guests, status
            FROM properties
            WHERE id = $1
            "#,
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(property)
    }

    async fn find_calendar(
        &self,
        property_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<CalendarDay>, BookingError> {
        let days = sqlx::query_as::<_, CalendarDay>(
            r#"
            SELECT property_id, date, price_override, available
            FROM calendar
            WHERE property_id = $1 AND date >= $2 AND date < $3
            ORDER BY date
            "#,
        )
        .bind(property_id)
        .bind(range.check_in())
        .bind(range.check_out())
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    async fn find_overlapping_bookings(
        &self,
        property_id: Uuid,
        range: &DateRange,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingError> {
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE property_id = $1
              AND status IN ('PENDING', 'CONFIRMED')
              AND check_in < $3
              AND check_out > $2
              AND ($4::uuid IS NULL OR id <> $4)
            ORDER BY check_in
            "#
        );

        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(property_id)
            .bind(range.check_in())
            .bind(range.check_out())
            .bind(exclude_booking_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }

    async fn insert_booking_if_available(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> Result<(Booking, Payment), BookingError> {
        // Must stay READ COMMITTED: the overlap count has to see rows committed
        // by whoever held the property lock before us.
        let mut tx = self.pool.begin().await?;

        // Creators of the same property queue here until the holder commits
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM properties WHERE id = $1 FOR UPDATE")
            .bind(booking.property_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(BookingError::PropertyNotFound(booking.property_id));
        }

        let conflicts: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE property_id = $1
              AND status IN ('PENDING', 'CONFIRMED')
              AND check_in < $3
              AND check_out > $2
            "#,
        )
        .bind(booking.property_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .fetch_one(&mut *tx)
        .await?;

        if conflicts > 0 {
            // Transaction is rolled back when tx is dropped
            tracing::debug!(
                "Overlap detected for property {} ({} to {})",
                booking.property_id,
                booking.check_in,
                booking.check_out
            );
            return Err(BookingError::DateRangeUnavailable(DATES_ALREADY_BOOKED.to_string()));
        }

        let insert_booking = format!(
            r#"
            INSERT INTO bookings (
                id, property_id, user_id, check_in, check_out, guests, status,
                nightly_rate, number_of_nights, accommodation_total, service_fee, total_amount,
                guest_name, guest_phone, guest_email, special_requests
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Booking>(&insert_booking)
            .bind(booking.id)
            .bind(booking.property_id)
            .bind(&booking.user_id)
            .bind(booking.check_in)
            .bind(booking.check_out)
            .bind(booking.guests)
            .bind(BookingStatus::Pending)
            .bind(booking.nightly_rate)
            .bind(booking.number_of_nights)
            .bind(booking.accommodation_total)
            .bind(booking.service_fee)
            .bind(booking.total_amount)
            .bind(&booking.guest_name)
            .bind(&booking.guest_phone)
            .bind(&booking.guest_email)
            .bind(&booking.special_requests)
            .fetch_one(&mut *tx)
            .await?;

        let insert_payment = format!(
            r#"
            INSERT INTO payments (id, booking_id, order_id, order_name, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'READY')
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let payment = sqlx::query_as::<_, Payment>(&insert_payment)
            .bind(payment.id)
            .bind(created.id)
            .bind(&payment.order_id)
            .bind(&payment.order_name)
            .bind(payment.amount)
            .bind(&payment.currency)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((created, payment))
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn find_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, BookingError> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1");
        let payment = sqlx::query_as::<_, Payment>(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn list_user_bookings(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError> {
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((bookings, total))
    }

    async fn cancel_booking(&self, cancellation: Cancellation) -> Result<CancellationRecord, BookingError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set: only a CONFIRMED booking moves, and only once
        let update_booking = format!(
            r#"
            UPDATE bookings
            SET status = 'CANCELLED',
                cancelled_at = $2,
                cancellation_reason = $3,
                refund_amount = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'CONFIRMED'
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let booking = sqlx::query_as::<_, Booking>(&update_booking)
            .bind(cancellation.booking_id)
            .bind(cancellation.cancelled_at)
            .bind(&cancellation.reason)
            .bind(cancellation.refund_amount)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                BookingError::NotCancellable("Only confirmed bookings can be cancelled".to_string())
            })?;

        let mut payment = None;
        let mut refund_transaction = None;

        if cancellation.refund_amount > Decimal::ZERO {
            let update_payment = format!(
                r#"
                UPDATE payments
                SET status = 'CANCELLED',
                    cancelled_at = $2,
                    refund_amount = $3,
                    refund_reason = $4
                WHERE booking_id = $1
                RETURNING {PAYMENT_COLUMNS}
                "#
            );

            let updated = sqlx::query_as::<_, Payment>(&update_payment)
                .bind(cancellation.booking_id)
                .bind(cancellation.cancelled_at)
                .bind(cancellation.refund_amount)
                .bind(&cancellation.reason)
                .fetch_optional(&mut *tx)
                .await?;

            if let Some(ref updated) = updated {
                let transaction = sqlx::query_as::<_, PaymentTransaction>(
                    r#"
                    INSERT INTO payment_transactions (id, payment_id, external_id, kind, amount, status, metadata)
                    VALUES ($1, $2, $3, 'REFUND', $4, 'SUCCESS', $5)
                    RETURNING id, payment_id, external_id, kind, amount, status, metadata, created_at
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(updated.id)
                .bind(refund_external_id(&cancellation))
                .bind(cancellation.refund_amount)
                .bind(refund_metadata(&cancellation))
                .fetch_one(&mut *tx)
                .await?;

                refund_transaction = Some(transaction);
            }
            payment = updated;
        }

        tx.commit().await?;

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
        let mut tx = self.pool.begin().await?;

        let update_booking = format!(
            r#"
            UPDATE bookings
            SET status = 'CONFIRMED', confirmed_at = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let booking = sqlx::query_as::<_, Booking>(&update_booking)
            .bind(confirmation.booking_id)
            .bind(confirmation.confirmed_at)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                BookingError::InvalidTransition("Only pending bookings can be confirmed".to_string())
            })?;

        let update_payment = format!(
            r#"
            UPDATE payments
            SET status = 'DONE', payment_key = $2, approved_at = $3
            WHERE id = $1 AND status = 'READY'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let payment = sqlx::query_as::<_, Payment>(&update_payment)
            .bind(confirmation.payment_id)
            .bind(&confirmation.payment_key)
            .bind(confirmation.confirmed_at)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                BookingError::InvalidTransition("Payment has already been processed".to_string())
            })?;

        tx.commit().await?;

        Ok((booking, payment))
    }
}

/// External id of the refund ledger row
pub(crate) fn refund_external_id(cancellation: &Cancellation) -> String {
    format!("REFUND-{}", cancellation.cancelled_at.timestamp_millis())
}

pub(crate) fn refund_metadata(cancellation: &Cancellation) -> serde_json::Value {
    json!({
        "reason": cancellation.reason,
        "policy": cancellation.policy_description,
        "tier": cancellation.tier.to_string(),
        "refund_rate": cancellation.refund_rate,
    })
}

/// Payment order id: `ORD-<first 8 hex chars of booking id>-<epoch millis>`
pub fn payment_order_id(booking_id: Uuid, now: DateTime<Utc>) -> String {
    let short = booking_id.simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{}", short, now.timestamp_millis())
}

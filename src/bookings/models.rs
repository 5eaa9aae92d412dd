use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::bookings::{cancellation_policy::CancellationTier, price_calculator::PricingResult};

/// Booking status enum representing the lifecycle of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    /// Blocking statuses occupy the property's calendar
    pub fn is_blocking(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled
                | BookingStatus::Rejected
                | BookingStatus::Completed
                | BookingStatus::NoShow
        )
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

/// Listing status managed by hosts and admins; only approved properties take bookings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyStatus {
    Pending,
    Approved,
    Rejected,
    Inactive,
}

/// Payment status of the payment intent paired with a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Ready,
    Done,
    Cancelled,
    Failed,
}

/// Rental property as seen by the booking flow
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Property {
    pub id: Uuid,
    pub host_id: String,
    pub name: String,
    pub price_per_night: Decimal,
    pub min_nights: i32,
    pub max_nights: i32,
    pub max_guests: i32,
    pub status: PropertyStatus,
}

/// Host-managed calendar entry for a single night
///
/// At most one row exists per (property, date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CalendarDay {
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub price_override: Option<Decimal>,
    pub available: bool,
}

/// Domain model representing a booking in the database
///
/// Money fields are a snapshot taken at creation and are never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub status: BookingStatus,
    pub nightly_rate: Decimal,
    pub number_of_nights: i32,
    pub accommodation_total: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_email: String,
    pub special_requests: Option<String>,
    pub cancellation_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment intent created alongside each booking
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub order_id: String,
    pub order_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_key: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row recorded for refunds
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub external_id: String,
    pub kind: String,
    pub amount: Decimal,
    pub status: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new booking row
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub user_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub nightly_rate: Decimal,
    pub number_of_nights: i32,
    pub accommodation_total: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_email: String,
    pub special_requests: Option<String>,
}

/// Insert payload for the payment intent paired with a new booking
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub order_id: String,
    pub order_name: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Everything the store needs to apply a guest cancellation
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub booking_id: Uuid,
    pub reason: String,
    pub refund_amount: Decimal,
    pub refund_rate: Decimal,
    pub tier: CancellationTier,
    pub policy_description: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Result of a committed cancellation
#[derive(Debug, Clone)]
pub struct CancellationRecord {
    pub booking: Booking,
    pub payment: Option<Payment>,
    pub refund_transaction: Option<PaymentTransaction>,
}

/// Settlement notice for a payment intent
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub payment_key: String,
    pub confirmed_at: DateTime<Utc>,
}

/// Guest contact details captured with the booking
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GuestInfo {
    #[validate(length(min = 1, message = "Guest name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Guest phone is required"))]
    pub phone: String,
    #[validate(email(message = "Guest email must be a valid email address"))]
    pub email: String,
}

/// Request DTO for creating a booking
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub property_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, message = "Guests must be at least 1"))]
    pub guests: i32,
    #[validate]
    pub guest_info: GuestInfo,
    #[validate(length(max = 1000, message = "Special requests must be at most 1000 characters"))]
    pub special_requests: Option<String>,
}

/// Request DTO for cancelling a booking
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelBookingRequest {
    pub reason: String,
}

/// Webhook payload sent by the payment collaborator once a payment settles
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,
    #[validate(length(min = 1, message = "Payment key is required"))]
    pub payment_key: String,
    pub amount: Decimal,
}

/// Query parameters for a price quote
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Query parameters for an availability check
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    pub property_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Defaults to 1
    pub guests: Option<i32>,
}

/// Query parameters for booking history
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

/// Payment summary returned after a booking is created
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentSummary {
    pub order_id: String,
    pub order_name: String,
    pub amount: Decimal,
    pub checkout_url: String,
}

/// Response DTO for booking creation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBookingResponse {
    pub booking: Booking,
    pub payment: PaymentSummary,
}

impl From<(Booking, Payment)> for CreateBookingResponse {
    fn from((booking, payment): (Booking, Payment)) -> Self {
        let checkout_url = format!("/booking/{}/checkout", booking.id);
        Self {
            payment: PaymentSummary {
                order_id: payment.order_id,
                order_name: payment.order_name,
                amount: payment.amount,
                checkout_url,
            },
            booking,
        }
    }
}

/// Refund summary returned after a cancellation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefundSummary {
    pub amount: Decimal,
    pub refund_rate: Decimal,
    pub tier: CancellationTier,
    pub policy: String,
    pub transaction_id: Option<String>,
}

/// Response DTO for booking cancellation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelBookingResponse {
    pub booking: Booking,
    pub refund: RefundSummary,
}

/// Response DTO for a settled payment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub booking: Booking,
    pub payment: Payment,
}

/// Response DTO for an availability check, priced when available
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub unavailable_dates: Vec<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PricingResult>,
}

/// Pagination metadata for list responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Response DTO for booking history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub pagination: Pagination,
}

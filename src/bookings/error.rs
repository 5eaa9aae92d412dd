use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::ErrorResponse;

/// Reason reported whenever a blocking booking already holds part of the range
pub const DATES_ALREADY_BOOKED: &str = "The selected dates are already booked";

/// Error types for booking operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Property not found: {0}")]
    PropertyNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Payment not found for order {0}")]
    PaymentNotFound(String),

    #[error("Dates unavailable: {0}")]
    DateRangeUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Booking cannot be cancelled: {0}")]
    NotCancellable(String),

    #[error("Invalid reason: {0}")]
    InvalidReason(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment amount mismatch: expected {expected}, got {actual}")]
    PaymentMismatch { expected: Decimal, actual: Decimal },

    #[error("Temporary failure, please retry: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BookingError {
    /// Machine-readable error code used in response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            BookingError::DateRangeUnavailable(_) => "DATE_RANGE_UNAVAILABLE",
            BookingError::ValidationError(_) => "VALIDATION_ERROR",
            BookingError::NotCancellable(_) => "NOT_CANCELLABLE",
            BookingError::InvalidReason(_) => "INVALID_REASON",
            BookingError::InvalidTransition(_) => "INVALID_TRANSITION",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::PaymentMismatch { .. } => "PAYMENT_MISMATCH",
            BookingError::Transient(_) => "TRANSIENT_ERROR",
            BookingError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::PropertyNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::DateRangeUnavailable(_)
            | BookingError::NotCancellable(_)
            | BookingError::InvalidTransition(_) => StatusCode::CONFLICT,
            BookingError::ValidationError(_)
            | BookingError::InvalidReason(_)
            | BookingError::PaymentMismatch { .. } => StatusCode::BAD_REQUEST,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Transient(_))
    }

    /// Message safe to show to clients
    fn client_message(&self) -> String {
        match self {
            BookingError::PropertyNotFound(_) => "Property not found".to_string(),
            BookingError::BookingNotFound(_) => "Booking not found".to_string(),
            BookingError::PaymentNotFound(_) => "Payment not found".to_string(),
            BookingError::DateRangeUnavailable(reason) => reason.clone(),
            BookingError::ValidationError(msg) => msg.clone(),
            BookingError::NotCancellable(msg) => msg.clone(),
            BookingError::InvalidReason(msg) => msg.clone(),
            BookingError::InvalidTransition(msg) => msg.clone(),
            BookingError::Forbidden(msg) => msg.clone(),
            BookingError::PaymentMismatch { .. } => {
                "Payment amount does not match the booking total".to_string()
            }
            BookingError::Transient(_) => {
                "The service is temporarily busy, please try again".to_string()
            }
            BookingError::DatabaseError(_) => "A database error occurred".to_string(),
        }
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => BookingError::Transient(err.to_string()),
                // exclusion_violation on the booking date-range constraint
                Some("23P01") => BookingError::DateRangeUnavailable(DATES_ALREADY_BOOKED.to_string()),
                _ => BookingError::DatabaseError(err.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                BookingError::Transient(err.to_string())
            }
            _ => BookingError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        BookingError::ValidationError(errors.to_string())
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            BookingError::DatabaseError(msg) => error!("Database error: {}", msg),
            BookingError::Transient(msg) => warn!("Transient persistence failure: {}", msg),
            BookingError::Forbidden(msg) => warn!("Forbidden booking access: {}", msg),
            BookingError::PaymentMismatch { expected, actual } => {
                warn!("Payment amount mismatch: expected {}, got {}", expected, actual)
            }
            other => debug!("Booking request rejected: {}", other),
        }

        let mut body = ErrorResponse::new(self.error_code(), self.client_message());
        if let BookingError::PaymentMismatch { expected, actual } = &self {
            body = body.with_details(json!({ "expected": expected, "actual": actual }));
        }
        (status, Json(body)).into_response()
    }
}

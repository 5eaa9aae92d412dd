// HTTP handlers for quote, availability, booking and payment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::bookings::{
    AvailabilityQuery, AvailabilityResponse, Booking, BookingError, BookingListQuery,
    BookingListResponse, CancelBookingRequest, CancelBookingResponse, ConfirmPaymentRequest,
    ConfirmPaymentResponse, CreateBookingRequest, CreateBookingResponse, PricingResult, QuoteQuery,
};
use crate::error::ErrorResponse;

/// Handler for GET /api/properties/{id}/quote
/// Prices a stay night by night
#[utoipa::path(
    get,
    path = "/api/properties/{id}/quote",
    params(
        ("id" = Uuid, Path, description = "Property ID"),
        QuoteQuery
    ),
    responses(
        (status = 200, description = "Price breakdown", body = PricingResult),
        (status = 400, description = "Check-out is not after check-in", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn quote_handler(
    State(state): State<crate::AppState>,
    Path(property_id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<PricingResult>, BookingError> {
    let price = state
        .booking_service
        .quote(property_id, query.check_in, query.check_out)
        .await?;

    Ok(Json(price))
}

/// Handler for GET /api/availability/check
/// Advisory availability check, priced when the stay is bookable
#[utoipa::path(
    get,
    path = "/api/availability/check",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability result", body = AvailabilityResponse),
        (status = 400, description = "Invalid range or guest count", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn check_availability_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, BookingError> {
    let response = state
        .booking_service
        .check_availability_with_price(
            query.property_id,
            query.check_in,
            query.check_out,
            query.guests.unwrap_or(1),
            Utc::now().date_naive(),
        )
        .await?;

    Ok(Json(response))
}

/// Handler for POST /api/bookings
/// Creates a PENDING booking and its payment intent for the authenticated user
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = CreateBookingResponse),
        (status = 400, description = "Invalid input data", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Property not found", body = ErrorResponse),
        (status = 409, description = "Dates unavailable", body = ErrorResponse),
        (status = 503, description = "Temporary failure, safe to retry", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn create_booking_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), BookingError> {
    let created = state
        .booking_service
        .create_booking(&user.user_id, request, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Handler for GET /api/bookings
/// Lists the authenticated user's bookings, newest first
#[utoipa::path(
    get,
    path = "/api/bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings page", body = BookingListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn list_bookings_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingListResponse>, BookingError> {
    let bookings = state
        .booking_service
        .list_user_bookings(&user.user_id, query)
        .await?;

    Ok(Json(bookings))
}

/// Handler for GET /api/bookings/{id}
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 403, description = "Booking belongs to another user", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn get_booking_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, BookingError> {
    let booking = state
        .booking_service
        .get_booking(&user.user_id, booking_id)
        .await?;

    Ok(Json(booking))
}

/// Handler for PATCH /api/bookings/{id}/cancel
/// Cancels a confirmed booking and applies the refund policy
#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = CancelBookingResponse),
        (status = 400, description = "Missing cancellation reason", body = ErrorResponse),
        (status = 403, description = "Booking belongs to another user", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not cancellable", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bookings"
)]
pub async fn cancel_booking_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<CancelBookingResponse>, BookingError> {
    let response = state
        .booking_service
        .cancel_booking(&user.user_id, booking_id, &request.reason, Utc::now())
        .await?;

    Ok(Json(response))
}

/// Handler for POST /api/payments/confirm
/// Settlement callback from the payment collaborator
#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment settled and booking confirmed", body = ConfirmPaymentResponse),
        (status = 400, description = "Amount does not match the payment intent", body = ErrorResponse),
        (status = 404, description = "Unknown order", body = ErrorResponse),
        (status = 409, description = "Payment already processed", body = ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn confirm_payment_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, BookingError> {
    let response = state
        .booking_service
        .confirm_payment(request, Utc::now())
        .await?;

    Ok(Json(response))
}

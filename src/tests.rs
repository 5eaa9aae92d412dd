// Handler tests for the Stay Booking API
// Runs the full router over the in-memory booking store

use super::*;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Days, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use crate::bookings::{
    memory_store::MemoryBookingStore, notifier::RecordingNotifier, AvailabilityResponse, Booking,
    BookingListResponse, BookingStatus, CalendarDay, CancelBookingResponse, CancellationTier,
    ConfirmPaymentResponse, CreateBookingResponse, PaymentStatus, PricingResult, Property,
    PropertyStatus,
};
use crate::error::ErrorResponse;

const TEST_SECRET: &str = "test_secret_key_for_testing_purposes";

// ============================================================================
// Test Helpers
// ============================================================================

struct TestApp {
    server: TestServer,
    store: Arc<MemoryBookingStore>,
    property: Property,
    tokens: TokenService,
}

impl TestApp {
    fn bearer(&self, user_id: &str) -> HeaderValue {
        let token = self.tokens.generate_access_token(user_id, 900);
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }
}

fn test_property() -> Property {
    Property {
        id: Uuid::new_v4(),
        host_id: "host_1".to_string(),
        name: "Gangneung Beach House".to_string(),
        price_per_night: dec!(120000),
        min_nights: 1,
        max_nights: 30,
        max_guests: 4,
        status: PropertyStatus::Approved,
    }
}

/// Helper function to create a test app over an in-memory store
async fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryBookingStore::new());
    let property = test_property();
    store.insert_property(property.clone()).await;

    let tokens = TokenService::new(TEST_SECRET.to_string());
    let state = AppState {
        booking_service: BookingService::new(store.clone(), Arc::new(RecordingNotifier::default())),
        token_service: tokens.clone(),
    };

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        property,
        tokens,
    }
}

/// A date `days` days from today (UTC)
fn days_from_now(days: u64) -> NaiveDate {
    Utc::now().date_naive().checked_add_days(Days::new(days)).unwrap()
}

fn booking_payload(property_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> serde_json::Value {
    json!({
        "property_id": property_id,
        "check_in": check_in,
        "check_out": check_out,
        "guests": 2,
        "guest_info": {
            "name": "Choi Yuna",
            "phone": "010-9876-5432",
            "email": "yuna@example.com"
        },
        "special_requests": "Late check-in"
    })
}

async fn create_booking(app: &TestApp, user: &str, check_in: NaiveDate, check_out: NaiveDate) -> CreateBookingResponse {
    let response = app
        .server
        .post("/api/bookings")
        .add_header(header::AUTHORIZATION, app.bearer(user))
        .json(&booking_payload(app.property.id, check_in, check_out))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<CreateBookingResponse>()
}

async fn confirm(app: &TestApp, created: &CreateBookingResponse) -> ConfirmPaymentResponse {
    let response = app
        .server
        .post("/api/payments/confirm")
        .json(&json!({
            "order_id": created.payment.order_id,
            "payment_key": "pk_live_123",
            "amount": created.payment.amount
        }))
        .await;
    response.assert_status_ok();
    response.json::<ConfirmPaymentResponse>()
}

// ============================================================================
// Quote & availability
// ============================================================================

#[tokio::test]
async fn test_quote_two_nights() {
    let app = create_test_app().await;
    let response = app
        .server
        .get(&format!(
            "/api/properties/{}/quote?check_in={}&check_out={}",
            app.property.id,
            days_from_now(30),
            days_from_now(32)
        ))
        .await;

    response.assert_status_ok();
    let price = response.json::<PricingResult>();
    assert_eq!(price.number_of_nights, 2);
    assert_eq!(price.accommodation_total, dec!(240000));
    assert_eq!(price.service_fee, dec!(24000));
    assert_eq!(price.total, dec!(264000));
}

#[tokio::test]
async fn test_quote_unknown_property_is_404() {
    let app = create_test_app().await;
    let response = app
        .server
        .get(&format!(
            "/api/properties/{}/quote?check_in={}&check_out={}",
            Uuid::new_v4(),
            days_from_now(30),
            days_from_now(32)
        ))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.error_code, "PROPERTY_NOT_FOUND");
}

#[tokio::test]
async fn test_quote_reversed_range_is_400() {
    let app = create_test_app().await;
    let response = app
        .server
        .get(&format!(
            "/api/properties/{}/quote?check_in={}&check_out={}",
            app.property.id,
            days_from_now(32),
            days_from_now(30)
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ErrorResponse>().error_code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_availability_includes_price_when_free() {
    let app = create_test_app().await;
    let response = app
        .server
        .get(&format!(
            "/api/availability/check?property_id={}&check_in={}&check_out={}&guests=2",
            app.property.id,
            days_from_now(30),
            days_from_now(32)
        ))
        .await;

    response.assert_status_ok();
    let body = response.json::<AvailabilityResponse>();
    assert!(body.available);
    assert_eq!(body.price.unwrap().total, dec!(264000));
}

#[tokio::test]
async fn test_availability_lists_blocked_dates() {
    let app = create_test_app().await;
    app.store
        .upsert_calendar_day(CalendarDay {
            property_id: app.property.id,
            date: days_from_now(31),
            price_override: None,
            available: false,
        })
        .await;

    let response = app
        .server
        .get(&format!(
            "/api/availability/check?property_id={}&check_in={}&check_out={}",
            app.property.id,
            days_from_now(30),
            days_from_now(33)
        ))
        .await;

    response.assert_status_ok();
    let body = response.json::<AvailabilityResponse>();
    assert!(!body.available);
    assert_eq!(body.unavailable_dates, vec![days_from_now(31)]);
    assert!(body.price.is_none());
}

// ============================================================================
// Booking lifecycle
// ============================================================================

#[tokio::test]
async fn test_create_booking_requires_token() {
    let app = create_test_app().await;
    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_payload(app.property.id, days_from_now(30), days_from_now(32)))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<ErrorResponse>().error_code, "MISSING_TOKEN");
}

#[tokio::test]
async fn test_create_booking_and_conflict() {
    let app = create_test_app().await;

    let created = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;
    assert_eq!(created.booking.status, BookingStatus::Pending);
    assert_eq!(created.booking.total_amount, dec!(264000));
    assert_eq!(created.booking.special_requests.as_deref(), Some("Late check-in"));
    assert_eq!(created.payment.amount, dec!(264000));
    assert_eq!(created.payment.checkout_url, format!("/booking/{}/checkout", created.booking.id));

    let response = app
        .server
        .post("/api/bookings")
        .add_header(header::AUTHORIZATION, app.bearer("user_2"))
        .json(&booking_payload(app.property.id, days_from_now(31), days_from_now(33)))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.error_code, "DATE_RANGE_UNAVAILABLE");
    assert_eq!(body.message, "The selected dates are already booked");
}

#[tokio::test]
async fn test_create_booking_invalid_email_is_400() {
    let app = create_test_app().await;
    let mut payload = booking_payload(app.property.id, days_from_now(30), days_from_now(32));
    payload["guest_info"]["email"] = json!("nope");

    let response = app
        .server
        .post("/api/bookings")
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_get_booking_owner_only() {
    let app = create_test_app().await;
    let created = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;

    let own = app
        .server
        .get(&format!("/api/bookings/{}", created.booking.id))
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .await;
    own.assert_status_ok();
    assert_eq!(own.json::<Booking>().id, created.booking.id);

    let other = app
        .server
        .get(&format!("/api/bookings/{}", created.booking.id))
        .add_header(header::AUTHORIZATION, app.bearer("user_2"))
        .await;
    other.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_bookings_filters_by_status() {
    let app = create_test_app().await;
    let first = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;
    create_booking(&app, "user_1", days_from_now(40), days_from_now(42)).await;
    confirm(&app, &first).await;

    let all = app
        .server
        .get("/api/bookings?page=1&limit=10")
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .await;
    all.assert_status_ok();
    let all = all.json::<BookingListResponse>();
    assert_eq!(all.pagination.total, 2);
    assert_eq!(all.pagination.total_pages, 1);

    let confirmed = app
        .server
        .get("/api/bookings?status=CONFIRMED")
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .await;
    let confirmed = confirmed.json::<BookingListResponse>();
    assert_eq!(confirmed.bookings.len(), 1);
    assert_eq!(confirmed.bookings[0].id, first.booking.id);

    let bad_limit = app
        .server
        .get("/api/bookings?limit=500")
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .await;
    bad_limit.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirm_then_cancel_with_full_refund() {
    let app = create_test_app().await;
    let created = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;

    let confirmed = confirm(&app, &created).await;
    assert_eq!(confirmed.booking.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.payment.status, PaymentStatus::Done);

    let response = app
        .server
        .patch(&format!("/api/bookings/{}/cancel", created.booking.id))
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .json(&json!({ "reason": "Schedule conflict" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<CancelBookingResponse>();
    assert_eq!(body.booking.status, BookingStatus::Cancelled);
    assert_eq!(body.refund.tier, CancellationTier::FullRefund);
    assert_eq!(body.refund.amount, dec!(264000));

    let again = app
        .server
        .patch(&format!("/api/bookings/{}/cancel", created.booking.id))
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .json(&json!({ "reason": "Schedule conflict" }))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<ErrorResponse>().error_code, "NOT_CANCELLABLE");
}

#[tokio::test]
async fn test_cancel_requires_reason() {
    let app = create_test_app().await;
    let created = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;
    confirm(&app, &created).await;

    let response = app
        .server
        .patch(&format!("/api/bookings/{}/cancel", created.booking.id))
        .add_header(header::AUTHORIZATION, app.bearer("user_1"))
        .json(&json!({ "reason": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ErrorResponse>().error_code, "INVALID_REASON");
}

#[tokio::test]
async fn test_confirm_payment_amount_mismatch() {
    let app = create_test_app().await;
    let created = create_booking(&app, "user_1", days_from_now(30), days_from_now(32)).await;

    let response = app
        .server
        .post("/api/payments/confirm")
        .json(&json!({
            "order_id": created.payment.order_id,
            "payment_key": "pk_live_123",
            "amount": "1000"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.error_code, "PAYMENT_MISMATCH");
    assert!(body.details.is_some());
}

#[tokio::test]
async fn test_transient_failure_is_503() {
    let app = create_test_app().await;
    app.store.fail_next_reads(1).await;

    let response = app
        .server
        .get(&format!(
            "/api/properties/{}/quote?check_in={}&check_out={}",
            app.property.id,
            days_from_now(30),
            days_from_now(32)
        ))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<ErrorResponse>().error_code, "TRANSIENT_ERROR");
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let response = app.server.get("/api/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<HealthResponse>().status, "ok");
}

pub mod auth;
pub mod bookings;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use bookings::{
    BookingNotifier, BookingService, LoggingNotifier, PgBookingStore, WebhookNotifier,
};
use config::AppConfig;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        bookings::handlers::quote_handler,
        bookings::handlers::check_availability_handler,
        bookings::handlers::create_booking_handler,
        bookings::handlers::list_bookings_handler,
        bookings::handlers::get_booking_handler,
        bookings::handlers::cancel_booking_handler,
        bookings::handlers::confirm_payment_handler,
    ),
    components(
        schemas(
            HealthResponse,
            error::ErrorResponse,
            bookings::Booking,
            bookings::BookingStatus,
            bookings::Payment,
            bookings::PaymentStatus,
            bookings::PricingResult,
            bookings::GuestInfo,
            bookings::CreateBookingRequest,
            bookings::CreateBookingResponse,
            bookings::PaymentSummary,
            bookings::CancelBookingRequest,
            bookings::CancelBookingResponse,
            bookings::RefundSummary,
            bookings::CancellationTier,
            bookings::ConfirmPaymentRequest,
            bookings::ConfirmPaymentResponse,
            bookings::AvailabilityResponse,
            bookings::BookingListResponse,
            bookings::Pagination,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "bookings", description = "Quotes, availability and booking lifecycle"),
        (name = "payments", description = "Payment settlement callbacks"),
        (name = "health", description = "Service liveness")
    ),
    info(
        title = "Stay Booking API",
        version = "1.0.0",
        description = "Availability, pricing and cancellation engine for vacation rentals"
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub booking_service: BookingService,
    pub token_service: TokenService,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Handler for GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds tracing and CORS middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(health_handler))
        .route("/api/properties/:id/quote", get(bookings::quote_handler))
        .route("/api/availability/check", get(bookings::check_availability_handler))
        .route(
            "/api/bookings",
            post(bookings::create_booking_handler).get(bookings::list_bookings_handler),
        )
        .route("/api/bookings/:id", get(bookings::get_booking_handler))
        .route("/api/bookings/:id/cancel", patch(bookings::cancel_booking_handler))
        .route("/api/payments/confirm", post(bookings::confirm_payment_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Pick the host notifier from configuration
fn build_notifier(config: &AppConfig) -> Arc<dyn BookingNotifier> {
    if let Some(url) = &config.booking_webhook_url {
        tracing::info!("Booking notifications go to webhook {}", url);
        return Arc::new(WebhookNotifier::new(url.clone()));
    }
    Arc::new(LoggingNotifier)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Stay Booking API - Starting...");

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Migrations completed successfully");

    let store = Arc::new(PgBookingStore::new(db_pool));
    let state = AppState {
        booking_service: BookingService::new(store, build_notifier(&config)),
        token_service: TokenService::new(config.jwt_secret.clone()),
    };

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests;

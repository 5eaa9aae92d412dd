// Booking notifications
//
// Hosts learn about new bookings through a notifier. Delivery runs after the
// booking has committed and never affects the booking outcome.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bookings::Booking;

/// Payload delivered when a booking is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub property_id: Uuid,
    pub property_name: String,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total_amount: Decimal,
}

impl BookingCreatedEvent {
    pub fn new(booking: &Booking, property_name: &str) -> Self {
        Self {
            booking_id: booking.id,
            property_id: booking.property_id,
            property_name: property_name.to_string(),
            guest_name: booking.guest_name.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            total_amount: booking.total_amount,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),
}

/// Destination for booking notifications
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotifierError>;
}

/// Notifier used when no webhook is configured
pub struct LoggingNotifier;

#[async_trait]
impl BookingNotifier for LoggingNotifier {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotifierError> {
        tracing::info!(
            "New booking {} for {} ({} to {}, {} guests)",
            event.booking_id,
            event.property_name,
            event.check_in,
            event.check_out,
            event.guests
        );
        Ok(())
    }
}

/// Posts booking events as JSON to a webhook URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl BookingNotifier for WebhookNotifier {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotifierError> {
        let response = self.client.post(&self.url).json(event).send().await?;

        if !response.status().is_success() {
            return Err(NotifierError::Status(response.status().as_u16()));
        }

        tracing::debug!("Delivered booking {} to webhook", event.booking_id);
        Ok(())
    }
}

/// Deliver an event in the background; failures are logged and dropped
pub fn spawn_booking_created(notifier: Arc<dyn BookingNotifier>, event: BookingCreatedEvent) {
    tokio::spawn(async move {
        if let Err(e) = notifier.booking_created(&event).await {
            tracing::warn!("Failed to notify host about booking {}: {}", event.booking_id, e);
        }
    });
}

/// Test notifier that records events, optionally failing every delivery
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: std::sync::Mutex<Vec<BookingCreatedEvent>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Default::default(),
            fail: true,
        }
    }

    pub fn recorded(&self) -> Vec<BookingCreatedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn booking_created(&self, event: &BookingCreatedEvent) -> Result<(), NotifierError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            Err(NotifierError::Status(503))
        } else {
            Ok(())
        }
    }
}

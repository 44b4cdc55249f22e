//! FitPass bookings client for Rust
//!
//! Booking lifecycle against the FitPass API: creation (regular and direct
//! payment flows), listing the caller's bookings, cancellation, and date
//! changes. All calls require a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fitpass_rust_auth::{SessionStore, UserRecord};
use fitpass_rust_catalog::{Gym, Plan, Ref};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

async fn api_error(response: reqwest::Response) -> BookingError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    BookingError::Api { status, message }
}

/// A booking linking the user to a gym and plan.
///
/// `status` is an open-ended backend string ("active", "Upcoming",
/// "cancelled", ...); bucketing and case handling live in the view layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<Ref<UserRecord>>,
    #[serde(default)]
    pub gym: Option<Ref<Gym>>,
    #[serde(default)]
    pub plan: Option<Ref<Plan>>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_by: Option<String>,
}

/// Payload for both booking-creation endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub gym_id: String,
    pub plan_id: String,
    pub amount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Payload for the date-change endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateUpdate {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Bookings client
pub struct BookingClient {
    base_url: String,
    http_client: Client,
    session: Arc<SessionStore>,
}

impl BookingClient {
    pub fn new(base_url: &str, http_client: Client, session: Arc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    fn token(&self) -> Result<String, BookingError> {
        self.session.token().ok_or(BookingError::MissingSession)
    }

    async fn post_booking(&self, url: String, booking: &NewBooking) -> Result<Booking, BookingError> {
        let token = self.token()?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(booking)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Creates a booking through the regular checkout flow.
    pub async fn create(&self, booking: &NewBooking) -> Result<Booking, BookingError> {
        self.post_booking(format!("{}/bookings", self.base_url), booking)
            .await
    }

    /// Creates a booking through the direct-payment flow used after the
    /// simulated gateway step.
    pub async fn create_direct(&self, booking: &NewBooking) -> Result<Booking, BookingError> {
        self.post_booking(format!("{}/bookings/create-direct", self.base_url), booking)
            .await
    }

    /// Lists the caller's bookings, newest first as served by the backend.
    pub async fn my_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        let token = self.token()?;
        let url = format!("{}/bookings/my", self.base_url);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Cancels a booking. Cancelling an already-cancelled booking is a
    /// backend error and is surfaced as [`BookingError::Api`]; the local
    /// record is never touched.
    pub async fn cancel(&self, booking_id: &str, reason: &str) -> Result<Booking, BookingError> {
        let token = self.token()?;
        let url = format!("{}/bookings/{}/cancel", self.base_url, booking_id);
        debug!("PUT {}", url);

        let payload = serde_json::json!({ "reason": reason });
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Moves a booking to new start/end dates.
    pub async fn update_date(
        &self,
        booking_id: &str,
        update: &DateUpdate,
    ) -> Result<Booking, BookingError> {
        let token = self.token()?;
        let url = format!("{}/bookings/{}/update-date", self.base_url, booking_id);
        debug!("PUT {}", url);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&token)
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }
}

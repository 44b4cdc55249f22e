//! FitPass catalog client for Rust
//!
//! Read access to the gym, membership-plan and review catalog, plus review
//! creation. Records that may arrive either as a bare id or as a populated
//! object are decoded once here into the [`Ref`] tagged union so downstream
//! code never probes raw JSON.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fitpass_rust_auth::SessionStore;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

async fn api_error(response: reqwest::Response) -> CatalogError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    CatalogError::Api { status, message }
}

/// A foreign-key field that the backend serves either as a bare id or as a
/// populated object, depending on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Populated(T),
    Id(String),
}

impl<T> Ref<T> {
    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Populated(value) => Some(value),
            Ref::Id(_) => None,
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Ref::Populated(_))
    }
}

/// A gym (venue) as listed in the catalog. Read-only from the client side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gym {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Free text; may embed a distance substring such as "3.2 km".
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    /// Single-session price used as the day-pass baseline in savings labels.
    #[serde(default)]
    pub day_pass_price: f64,
    #[serde(default)]
    pub max_base_discount: f64,
    #[serde(default)]
    pub best_discount: f64,
}

/// A membership plan offered by a gym.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub gym: Option<Ref<Gym>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    /// Promotional discount in percent, on top of the base price.
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub sessions: u32,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// A published review for a gym.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub owner_reply: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating a review on a completed booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub booking_id: String,
    pub gym_id: String,
    /// 1 to 5.
    pub rating: u8,
    pub comment: String,
}

/// Catalog client
pub struct CatalogClient {
    base_url: String,
    http_client: Client,
    session: Arc<SessionStore>,
}

impl CatalogClient {
    pub fn new(base_url: &str, http_client: Client, session: Arc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    /// Attaches the bearer token when a session is present. Catalog reads
    /// work anonymously as well.
    fn maybe_authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, CatalogError> {
        debug!("GET {}", url);
        let response = self.maybe_authed(self.http_client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Lists every gym in the catalog.
    pub async fn gyms(&self) -> Result<Vec<Gym>, CatalogError> {
        self.get_json(format!("{}/gyms", self.base_url)).await
    }

    /// Fetches a single gym by id.
    pub async fn gym(&self, gym_id: &str) -> Result<Gym, CatalogError> {
        self.get_json(format!("{}/gyms/{}", self.base_url, gym_id))
            .await
    }

    /// Lists the membership plans a gym offers.
    pub async fn plans_for_gym(&self, gym_id: &str) -> Result<Vec<Plan>, CatalogError> {
        self.get_json(format!("{}/plans/gym/{}", self.base_url, gym_id))
            .await
    }

    /// Lists the published reviews for a gym.
    pub async fn reviews_for_gym(&self, gym_id: &str) -> Result<Vec<Review>, CatalogError> {
        self.get_json(format!("{}/reviews/gym/{}", self.base_url, gym_id))
            .await
    }

    /// Creates a review for one of the caller's bookings. Requires a session.
    pub async fn create_review(&self, review: &NewReview) -> Result<Review, CatalogError> {
        let token = self.session.token().ok_or(CatalogError::MissingSession)?;
        let url = format!("{}/reviews", self.base_url);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(review)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }
}

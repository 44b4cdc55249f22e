//! FitPass Rust Client Library
//!
//! A Rust client for the FitPass gym marketplace API: venue and plan
//! catalog, booking lifecycle, authentication with OTP flows, profile
//! management, support chat, and the pure view-model derivation layer the
//! mobile screens render from.

pub mod config;
pub mod error;
pub mod screens;

pub use fitpass_rust_auth as auth;
pub use fitpass_rust_bookings as bookings;
pub use fitpass_rust_catalog as catalog;
pub use fitpass_rust_support as support;
pub use fitpass_rust_views as views;

use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use fitpass_rust_auth::{AuthClient, SessionStore};
use fitpass_rust_bookings::BookingClient;
use fitpass_rust_catalog::CatalogClient;
use fitpass_rust_support::SupportClient;

/// The main entry point for the FitPass client.
///
/// Owns the shared HTTP client and the session store, and hands both to
/// every service client, so there is a single explicit place the bearer
/// token lives.
pub struct Fitpass {
    config: ClientConfig,
    session: Arc<SessionStore>,
    auth: AuthClient,
    catalog: CatalogClient,
    bookings: BookingClient,
    support: Arc<SupportClient>,
}

impl Fitpass {
    /// Creates a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Fail early on an unusable base URL rather than on the first call.
        Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {}", config.base_url, e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let session = SessionStore::new();

        Ok(Self {
            auth: AuthClient::new(&config.base_url, http_client.clone(), session.clone()),
            catalog: CatalogClient::new(&config.base_url, http_client.clone(), session.clone()),
            bookings: BookingClient::new(&config.base_url, http_client.clone(), session.clone()),
            support: Arc::new(SupportClient::new(
                &config.base_url,
                http_client,
                session.clone(),
            )),
            config,
            session,
        })
    }

    /// Creates a client from `FITPASS_API_URL`, falling back to the
    /// production URL.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session store shared by all service clients.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Auth and profile operations.
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Gym, plan and review catalog operations.
    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// Booking lifecycle operations.
    pub fn bookings(&self) -> &BookingClient {
        &self.bookings
    }

    /// Support chat operations; `Arc` so a poller can share it.
    pub fn support(&self) -> &Arc<SupportClient> {
        &self.support
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::error::Error;
    pub use crate::Fitpass;
}

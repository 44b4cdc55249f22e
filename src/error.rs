//! Error handling for the FitPass client

use thiserror::Error;

/// Unified error type for the FitPass client
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration problems (bad base URL, unusable timeout)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication and profile errors
    #[error("Auth error: {0}")]
    Auth(#[from] fitpass_rust_auth::AuthError),

    /// Gym/plan/review catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] fitpass_rust_catalog::CatalogError),

    /// Booking lifecycle errors
    #[error("Booking error: {0}")]
    Booking(#[from] fitpass_rust_bookings::BookingError),

    /// Support chat errors
    #[error("Support error: {0}")]
    Support(#[from] fitpass_rust_support::SupportError),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid input from the caller (wrong flow stage, missing id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

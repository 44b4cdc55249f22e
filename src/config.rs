//! Configuration for the FitPass client

use std::time::Duration;

/// Production API base URL, used when `FITPASS_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.fitpass.fit/api";

/// Configuration for the FitPass client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the FitPass REST API.
    pub base_url: String,

    /// Timeout applied to every request by the shared HTTP client.
    pub request_timeout: Option<Duration>,

    /// Interval between support-chat poll cycles.
    pub chat_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            chat_poll_interval: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Reads the base URL from `FITPASS_API_URL`, falling back to the
    /// production URL.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("FITPASS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the support-chat poll interval
    pub fn with_chat_poll_interval(mut self, value: Duration) -> Self {
        self.chat_poll_interval = value;
        self
    }
}

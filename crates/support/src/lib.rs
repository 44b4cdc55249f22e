//! FitPass support-chat client for Rust
//!
//! The support thread is an ordered message exchange between the user and
//! admin roles, fetched over plain HTTP and refreshed by polling. The
//! [`ChatPoller`] runs a single task per lifetime: each cycle awaits the
//! prior request's completion before sleeping the interval, so slow
//! responses never stack up, and stopping (or dropping) the poller aborts
//! the task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fitpass_rust_auth::SessionStore;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Error type
#[derive(Error, Debug)]
pub enum SupportError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

async fn api_error(response: reqwest::Response) -> SupportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    SupportError::Api { status, message }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Admin,
}

/// One message in the support thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(alias = "_id")]
    pub id: String,
    pub sender: SenderRole,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
}

/// The full support thread for the authenticated user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCount {
    #[serde(default)]
    count: u32,
}

/// Support client
pub struct SupportClient {
    base_url: String,
    http_client: Client,
    session: Arc<SessionStore>,
}

impl SupportClient {
    pub fn new(base_url: &str, http_client: Client, session: Arc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    fn token(&self) -> Result<String, SupportError> {
        self.session.token().ok_or(SupportError::MissingSession)
    }

    /// Fetches the user's support thread.
    pub async fn chat_thread(&self) -> Result<ChatThread, SupportError> {
        let token = self.token()?;
        let url = format!("{}/tickets/chat/support", self.base_url);
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

    /// Appends a message to the support thread.
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, SupportError> {
        let token = self.token()?;
        let url = format!("{}/tickets/chat/message", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({ "text": text });
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Number of admin messages the user has not read yet.
    pub async fn unread_count(&self) -> Result<u32, SupportError> {
        let token = self.token()?;
        let url = format!("{}/tickets/user/unread-count", self.base_url);
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

        let unread: UnreadCount = response.json().await?;
        Ok(unread.count)
    }
}

/// One poll cycle's outcome, delivered on the poller channel.
#[derive(Debug)]
pub enum PollUpdate {
    Thread(ChatThread),
    Unread(u32),
    Failed(SupportError),
}

/// What a [`ChatPoller`] refreshes on each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    Thread,
    UnreadCount,
}

/// Interval poller for the support screen.
///
/// Exactly one in-flight request at a time: the next cycle is scheduled only
/// after the previous response (or failure) has been delivered.
pub struct ChatPoller {
    handle: JoinHandle<()>,
}

impl ChatPoller {
    /// Spawns the polling task and returns the poller plus the receiving end
    /// of its update channel. Failures are delivered as
    /// [`PollUpdate::Failed`] and polling continues.
    pub fn spawn(
        client: Arc<SupportClient>,
        target: PollTarget,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PollUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            info!("chat poller started ({:?}, every {:?})", target, interval);
            loop {
                let update = match target {
                    PollTarget::Thread => match client.chat_thread().await {
                        Ok(thread) => PollUpdate::Thread(thread),
                        Err(e) => PollUpdate::Failed(e),
                    },
                    PollTarget::UnreadCount => match client.unread_count().await {
                        Ok(count) => PollUpdate::Unread(count),
                        Err(e) => PollUpdate::Failed(e),
                    },
                };

                if let PollUpdate::Failed(e) = &update {
                    warn!("chat poll failed: {}", e);
                }

                // Receiver gone means the screen is done with us.
                if tx.send(update).is_err() {
                    break;
                }

                sleep(interval).await;
            }
        });

        (Self { handle }, rx)
    }

    /// Stops the polling task. Also happens on drop.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ChatPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_decodes_roles() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"_id":"m1","sender":"admin","text":"Hello","read":false}"#,
        )
        .unwrap();
        assert_eq!(message.sender, SenderRole::Admin);
        assert!(!message.read);
    }

    #[test]
    fn thread_defaults_to_empty() {
        let thread: ChatThread = serde_json::from_str("{}").unwrap();
        assert!(thread.messages.is_empty());
    }
}

//! FitPass Auth client for Rust
//!
//! This crate provides authentication against the FitPass API, including
//! login, registration with OTP verification, password reset, profile
//! management, and the shared in-memory session store used by the other
//! FitPass service clients.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

/// The authenticated user record as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// An access token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub user: UserRecord,
}

/// The user's editable profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Base64 data or a URL; treated as opaque by the client.
    #[serde(default)]
    pub image: Option<String>,
}

/// Fields accepted by the profile update call. `None` fields are omitted
/// from the request body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Backend acknowledgement carrying only a human-readable message
/// (registration, OTP resend, password-reset requests).
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// In-memory session holder shared by every FitPass service client.
///
/// There is deliberately no module-level token state: the store is created
/// by the top-level client and handed to each service client explicitly.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, session: Session) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session);
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn current(&self) -> Option<Session> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn token(&self) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|s| s.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Replaces the stored user record without touching the token.
    pub fn update_user(&self, user: UserRecord) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = guard.as_mut() {
            session.user = user;
        }
    }
}

/// Reads a failed response into an [`AuthError::Api`], preferring the
/// backend's `message` field over the raw body.
pub(crate) async fn api_error(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    AuthError::Api { status, message }
}

/// Auth client
pub struct AuthClient {
    base_url: String,
    http_client: Client,
    session: Arc<SessionStore>,
}

impl AuthClient {
    /// Creates a new auth client against the given API base URL.
    pub fn new(base_url: &str, http_client: Client, session: Arc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    /// The session store this client writes to on login/logout.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn token(&self) -> Result<String, AuthError> {
        self.session.token().ok_or(AuthError::MissingSession)
    }

    /// Logs in with email and password and stores the resulting session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/login", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session: Session = response.json().await?;
        self.session.set(session.clone());
        Ok(session)
    }

    /// Registers a new account. The backend answers with a message and
    /// mails an OTP; no session exists until [`verify_otp`](Self::verify_otp)
    /// succeeds.
    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, AuthError> {
        let url = format!("{}/auth/register", self.base_url);
        debug!("POST {}", url);

        let response = self.http_client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Exchanges a Google ID token for a FitPass session.
    pub async fn login_with_google(&self, id_token: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/google", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({ "idToken": id_token });
        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session: Session = response.json().await?;
        self.session.set(session.clone());
        Ok(session)
    }

    /// Confirms the OTP sent during registration and stores the session
    /// the backend issues on success.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/verify-otp", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({
            "email": email,
            "otp": otp,
        });

        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session: Session = response.json().await?;
        self.session.set(session.clone());
        Ok(session)
    }

    /// Requests a fresh OTP for a pending registration.
    pub async fn resend_otp(&self, email: &str) -> Result<MessageResponse, AuthError> {
        let url = format!("{}/auth/resend-otp", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({ "email": email });
        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Starts the password-reset flow by mailing a reset code.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, AuthError> {
        let url = format!("{}/auth/forgot-password", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({ "email": email });
        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Completes the password-reset flow with the mailed code.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<MessageResponse, AuthError> {
        let url = format!("{}/auth/reset-password", self.base_url);
        debug!("POST {}", url);

        let payload = serde_json::json!({
            "email": email,
            "otp": otp,
            "newPassword": new_password,
        });

        let response = self.http_client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Validates the stored token against the backend and refreshes the
    /// cached user record. Fails with [`AuthError::MissingSession`] when no
    /// session is stored.
    pub async fn check_session(&self) -> Result<UserRecord, AuthError> {
        let token = self.token()?;
        let url = format!("{}/auth/session", self.base_url);
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

        let user: UserRecord = response.json().await?;
        self.session.update_user(user.clone());
        Ok(user)
    }

    /// Logs out. The server call is best-effort; the local session is
    /// cleared even when it fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let url = format!("{}/auth/logout", self.base_url);
        debug!("POST {}", url);

        let mut request = self.http_client.post(&url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        let result = request.send().await;
        self.session.clear();

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!("logout returned {}", response.status());
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("logout request failed: {}", e);
                Ok(())
            }
        }
    }

    /// Fetches the authenticated user's profile.
    pub async fn profile(&self) -> Result<Profile, AuthError> {
        let token = self.token()?;
        let url = format!("{}/auth/profile", self.base_url);
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

    /// Updates the authenticated user's profile and returns the stored copy.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, AuthError> {
        let token = self.token()?;
        let url = format!("{}/auth/profile", self.base_url);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            user: UserRecord {
                id: "u1".to_string(),
                name: "Test".to_string(),
                email: "test@example.com".to_string(),
                phone: None,
                role: None,
            },
        }
    }

    #[test]
    fn store_set_and_clear() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated());

        store.set(session("tok-1"));
        assert_eq!(store.token().as_deref(), Some("tok-1"));

        store.clear();
        assert!(store.current().is_none());
    }

    #[test]
    fn store_update_user_keeps_token() {
        let store = SessionStore::new();
        store.set(session("tok-1"));

        let mut user = store.current().map(|s| s.user).unwrap();
        user.name = "Renamed".to_string();
        store.update_user(user);

        let current = store.current().unwrap();
        assert_eq!(current.access_token, "tok-1");
        assert_eq!(current.user.name, "Renamed");
    }

    #[test]
    fn user_record_accepts_mongo_id() {
        let user: UserRecord =
            serde_json::from_str(r#"{"_id":"abc","name":"A","email":"a@b.c"}"#).unwrap();
        assert_eq!(user.id, "abc");
    }
}

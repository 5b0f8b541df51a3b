//! HTTP client for a hosted auth + row API backend.
//!
//! Talks to a GoTrue-style auth service (`/auth/v1/*`) and a PostgREST-style
//! row API (`/rest/v1/*`). Requests are thin; status/body classification
//! lives in pure functions (`classify_failure`, `parse_*`) for testability.
//!
//! ERROR HANDLING
//! ==============
//! The row API reports failures as `{"code", "message"}` bodies. `PGRST116`
//! means a single-object request matched zero rows; `42501` (or HTTP
//! 401/403) means row-level security refused the read. Those two are kept
//! distinct from everything else because callers treat them differently.

use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::SessionBackend;
use crate::config::BackendConfig;
use crate::error::{BackendError, ConfigError};
use crate::model::{ProfileRecord, Session, SessionChange, UserRecord};

const EVENT_CAPACITY: usize = 32;
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const NO_ROWS_CODE: &str = "PGRST116";
const INSUFFICIENT_PRIVILEGE_CODE: &str = "42501";

// =============================================================================
// CLIENT
// =============================================================================

/// Access token plus the expiry (unix seconds) reported by the token grant.
/// The `/auth/v1/user` response does not carry the expiry, so it travels
/// with the token.
#[derive(Clone)]
struct Credentials {
    access_token: String,
    expires_at: Option<i64>,
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    credentials: RwLock<Option<Credentials>>,
    events: broadcast::Sender<SessionChange>,
}

impl HttpBackend {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            credentials: RwLock::new(None),
            events,
        })
    }

    /// Adopt an access token obtained elsewhere (e.g. a login redirect) and
    /// announce the resulting session to subscribers. `expires_at` is the
    /// unix-seconds expiry from the same token grant, when known.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the token could not be verified.
    pub async fn restore_session(
        &self,
        access_token: String,
        expires_at: Option<i64>,
    ) -> Result<Option<Session>, BackendError> {
        self.set_credentials(Some(Credentials { access_token, expires_at }));
        let session = self.current_session().await?;
        match &session {
            Some(s) => {
                info!(user_id = %s.user_id, expires_at = ?s.expires_at, "session restored");
                self.emit(SessionChange::signed_in(s.clone()));
            }
            None => self.set_credentials(None),
        }
        Ok(session)
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn token(&self) -> Option<String> {
        self.credentials().map(|c| c.access_token)
    }

    fn set_credentials(&self, credentials: Option<Credentials>) {
        *self
            .credentials
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = credentials;
    }

    fn emit(&self, change: SessionChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token().unwrap_or_else(|| self.anon_key.clone()))
    }

    async fn fetch_single(&self, url: &str) -> Result<String, BackendError> {
        let response = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(classify_failure(status, &body));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl SessionBackend for HttpBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(credentials) = self.credentials() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(auth_user_url(&self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", credentials.access_token))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        match status {
            200 => parse_auth_user(&body, credentials.expires_at).map(Some),
            // Expired or revoked token: there simply is no session.
            401 => {
                debug!("access token rejected; treating as signed out");
                Ok(None)
            }
            _ => Err(classify_failure(status, &body)),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = self.token();
        self.set_credentials(None);
        self.emit(SessionChange::signed_out());

        let Some(token) = token else {
            return Ok(());
        };

        let response = self
            .http
            .post(logout_url(&self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }

    async fn query_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError> {
        match self.fetch_single(&user_row_url(&self.base_url, user_id)).await {
            Ok(body) => parse_row(&body).map(Some),
            Err(BackendError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, BackendError> {
        let body = self
            .fetch_single(&profile_row_url(&self.base_url, user_id))
            .await?;
        parse_row(&body).map(Some)
    }
}

// =============================================================================
// ENDPOINTS
// =============================================================================

fn auth_user_url(base: &str) -> String {
    format!("{base}/auth/v1/user")
}

fn logout_url(base: &str) -> String {
    format!("{base}/auth/v1/logout")
}

fn user_row_url(base: &str, user_id: Uuid) -> String {
    format!("{base}/rest/v1/users?id=eq.{user_id}&select=*")
}

fn profile_row_url(base: &str, user_id: Uuid) -> String {
    format!("{base}/rest/v1/profiles?user_id=eq.{user_id}&select=*")
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn parse_auth_user(body: &str, expires_at: Option<i64>) -> Result<Session, BackendError> {
    let user: AuthUser = serde_json::from_str(body).map_err(|e| BackendError::Backend {
        code: "E_PARSE".into(),
        message: format!("auth user: {e}"),
    })?;
    Ok(Session { expires_at, ..Session::new(user.id) })
}

fn parse_row<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Backend { code: "E_PARSE".into(), message: e.to_string() })
}

/// Map a non-success response onto the error taxonomy.
fn classify_failure(status: u16, body: &str) -> BackendError {
    let api: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = api
        .message
        .clone()
        .unwrap_or_else(|| format!("HTTP {status}"));

    match api.code.as_deref() {
        Some(NO_ROWS_CODE) => BackendError::NotFound,
        Some(INSUFFICIENT_PRIVILEGE_CODE) => BackendError::AuthorizationPolicy(message),
        _ if status == 401 || status == 403 => BackendError::AuthorizationPolicy(message),
        None if matches!(status, 502..=504) => BackendError::Transport(message),
        Some(code) => BackendError::Backend { code: code.to_owned(), message },
        None => BackendError::Backend { code: status.to_string(), message },
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

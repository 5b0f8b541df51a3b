//! Session, identity and profile records plus the observable session tuple.
//!
//! DESIGN
//! ======
//! `SessionState` is the only value consumers ever see. Its three mutators
//! run under the store's write lock and keep the tuple consistent: a profile
//! is only ever present alongside the user it belongs to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// SESSION
// =============================================================================

/// The backend's assertion that a principal is currently authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    /// Expiry as seconds since the Unix epoch, when the backend reports one.
    pub expires_at: Option<i64>,
    pub access_token_present: bool,
}

impl Session {
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, expires_at: None, access_token_present: true }
    }
}

/// Kinds of session-change notifications delivered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One session-change notification: the event kind and the session it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

impl SessionChange {
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self { kind: SessionEventKind::SignedIn, session: Some(session) }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { kind: SessionEventKind::SignedOut, session: None }
    }
}

// =============================================================================
// USER / PROFILE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    JobSeeker,
    Employer,
    Admin,
    #[serde(other)]
    Unknown,
}

/// Application-level user row. Mirrors the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: UserRole,
    #[serde(default = "default_tier")]
    pub subscription_tier: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserRecord {
    /// Display name assembled from the name fields, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_owned(),
            (None, None) => self.email.clone(),
        }
    }
}

fn default_tier() -> String {
    "free".to_owned()
}

fn default_true() -> bool {
    true
}

/// Optional per-user extension row. Mirrors the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub completion_percentage: u8,
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// The observable `{user, profile, loading}` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<UserRecord>,
    pub profile: Option<ProfileRecord>,
    pub loading: bool,
}

impl SessionState {
    /// Freshly mounted state: nothing known yet, resolution pending.
    #[must_use]
    pub fn pending() -> Self {
        Self { user: None, profile: None, loading: true }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Replace the user. Clearing the user, or switching to a different id,
    /// drops the profile with it.
    pub(crate) fn set_user(&mut self, user: Option<UserRecord>) {
        let keep_profile = match (&user, &self.profile) {
            (Some(u), Some(p)) => u.id == p.user_id,
            _ => false,
        };
        if !keep_profile {
            self.profile = None;
        }
        self.user = user;
    }

    /// Replace the profile. Ignored when no matching user is populated.
    pub(crate) fn set_profile(&mut self, profile: Option<ProfileRecord>) {
        if let Some(p) = &profile {
            if self.user.as_ref().map_or(true, |u| u.id != p.user_id) {
                tracing::debug!(user_id = %p.user_id, "dropping profile without a matching user");
                return;
            }
        }
        self.profile = profile;
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Terminal "signed out" resolution: no user, no profile, not loading.
    pub(crate) fn settle_signed_out(&mut self) {
        self.set_user(None);
        self.set_loading(false);
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

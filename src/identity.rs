//! Identity fetcher: resolves a session's user id into user and profile rows.
//!
//! DESIGN
//! ======
//! The user row is mandatory, the profile row is best effort. Every backend
//! failure is absorbed here and reduced to "absent" plus a diagnostic, so the
//! caller only ever sees the resulting `Identity`. The user query always
//! precedes the profile query.
//!
//! `populate` wraps resolution in the identity-fetch guard and a drop guard
//! that clears `loading` on every exit path, including panics and task
//! cancellation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::SessionBackend;
use crate::config::SessionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::BackendError;
use crate::guard::{GuardKind, TimeoutGuard};
use crate::model::{ProfileRecord, UserRecord};
use crate::store::{CycleToken, SessionStore};

const PROFILE_TIMEOUT_CODE: &str = "W_PROFILE_QUERY_TIMEOUT";

/// Outcome of one resolution. `profile` is never set without `user`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<UserRecord>,
    pub profile: Option<ProfileRecord>,
}

/// Resolve `user_id` against the backend, absorbing every failure.
pub async fn resolve_identity(
    backend: &dyn SessionBackend,
    diagnostics: &Diagnostics,
    user_id: Uuid,
    profile_timeout: Duration,
) -> Identity {
    let user = match backend.query_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) | Err(BackendError::NotFound) => {
            info!(%user_id, "authenticated principal has no user row");
            return Identity::default();
        }
        Err(err @ BackendError::AuthorizationPolicy(_)) => {
            diagnostics.failure(
                &err,
                format_args!(
                    "user {user_id} (the users table access policy likely does not allow \
                     a principal to read its own row)"
                ),
            );
            return Identity::default();
        }
        Err(err) => {
            diagnostics.failure(&err, format_args!("user {user_id}"));
            return Identity::default();
        }
    };

    let profile = match tokio::time::timeout(profile_timeout, backend.query_profile_by_user_id(user_id)).await {
        Ok(Ok(Some(profile))) if profile.user_id == user_id => Some(profile),
        Ok(Ok(Some(profile))) => {
            debug!(%user_id, profile_user_id = %profile.user_id, "ignoring profile for another user");
            None
        }
        Ok(Ok(None) | Err(BackendError::NotFound)) => {
            debug!(%user_id, "no profile row yet");
            None
        }
        Ok(Err(err)) => {
            diagnostics.failure(&err, format_args!("profile for {user_id}"));
            None
        }
        Err(_) => {
            diagnostics.warning(
                PROFILE_TIMEOUT_CODE,
                format!("profile for {user_id} not returned within {}ms", profile_timeout.as_millis()),
            );
            None
        }
    };

    Identity { user: Some(user), profile }
}

// =============================================================================
// FETCHER
// =============================================================================

#[derive(Clone)]
pub(crate) struct IdentityFetcher {
    backend: Arc<dyn SessionBackend>,
    store: Arc<SessionStore>,
    diagnostics: Arc<Diagnostics>,
    config: SessionConfig,
}

impl IdentityFetcher {
    pub(crate) fn new(
        backend: Arc<dyn SessionBackend>,
        store: Arc<SessionStore>,
        diagnostics: Arc<Diagnostics>,
        config: SessionConfig,
    ) -> Self {
        Self { backend, store, diagnostics, config }
    }

    /// Resolve `user_id` and commit the result for the cycle `token`.
    pub(crate) async fn populate(&self, token: CycleToken, user_id: Uuid) {
        let guard = TimeoutGuard::arm(
            GuardKind::IdentityFetch,
            self.config.identity_fetch_timeout,
            token,
            self.store.clone(),
            self.diagnostics.clone(),
        );
        let _release = LoadingRelease { store: &self.store, token };

        let identity = resolve_identity(
            self.backend.as_ref(),
            &self.diagnostics,
            user_id,
            self.config.profile_query_timeout,
        )
        .await;
        guard.disarm();

        let authenticated = identity.user.is_some();
        let committed = self.store.commit(token, |state| {
            state.set_user(identity.user);
            state.set_profile(identity.profile);
            state.set_loading(false);
        });
        if committed {
            debug!(%user_id, authenticated, generation = token.generation(), "identity committed");
        } else {
            debug!(%user_id, generation = token.generation(), "discarding stale identity");
        }
    }
}

/// Clears `loading` for its cycle when dropped.
struct LoadingRelease<'a> {
    store: &'a SessionStore,
    token: CycleToken,
}

impl Drop for LoadingRelease<'_> {
    fn drop(&mut self) {
        self.store.commit(self.token, |state| state.set_loading(false));
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

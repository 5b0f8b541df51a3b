//! Provider/consumer boundary for session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The application mounts one `SessionProvider` and runs its UI work inside
//! `SessionProvider::scope`. Code in that scope reads state with
//! `use_session()`; the same call outside any scope is a usage error.
//! Dropping (or `unmount`ing) the provider tears everything down: the
//! backend subscription, the initial check, every in-flight fetch and guard.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::backend::SessionBackend;
use crate::config::SessionConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::UsageError;
use crate::model::SessionState;
use crate::reconciler::Reconciler;
use crate::store::SessionStore;

tokio::task_local! {
    static CURRENT_SESSION: SessionHandle;
}

// =============================================================================
// HANDLE
// =============================================================================

/// Read-only view of the provider's session state.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionState>,
    diagnostics: Arc<Diagnostics>,
}

impl SessionHandle {
    /// Latest `{user, profile, loading}`.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `false` once the provider is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the state is no longer loading and return it.
    pub async fn settled(&mut self) -> SessionState {
        if let Ok(state) = self.rx.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.state()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.snapshot()
    }
}

/// Current session state for code running inside a provider scope.
///
/// # Errors
///
/// Returns `UsageError::OutsideProvider` when called outside
/// `SessionProvider::scope`.
pub fn use_session() -> Result<SessionState, UsageError> {
    CURRENT_SESSION
        .try_with(SessionHandle::state)
        .map_err(|_| UsageError::OutsideProvider)
}

/// The scoped handle itself, for code that needs to await changes.
///
/// # Errors
///
/// Returns `UsageError::OutsideProvider` when called outside
/// `SessionProvider::scope`.
pub fn session_handle() -> Result<SessionHandle, UsageError> {
    CURRENT_SESSION
        .try_with(SessionHandle::clone)
        .map_err(|_| UsageError::OutsideProvider)
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct SessionProvider {
    reconciler: Reconciler,
    store: Arc<SessionStore>,
    diagnostics: Arc<Diagnostics>,
    initial_check: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl SessionProvider {
    /// Mount: subscribe to session changes and start the initial check.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn mount(backend: Arc<dyn SessionBackend>, config: SessionConfig) -> Self {
        let store = Arc::new(SessionStore::new());
        let diagnostics = Arc::new(Diagnostics::new());
        let reconciler = Reconciler::new(backend, store.clone(), diagnostics.clone(), config);

        // Subscribe before checking so no change between the two is missed.
        let changes = reconciler.subscribe();
        let listener = tokio::spawn(reconciler.clone().listen(changes));
        let initial_check = tokio::spawn(reconciler.clone().check_session());
        debug!("session provider mounted");

        Self { reconciler, store, diagnostics, initial_check, listener }
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { rx: self.store.subscribe(), diagnostics: self.diagnostics.clone() }
    }

    /// Run `fut` with this provider's state readable through `use_session`.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_SESSION.scope(self.handle(), fut).await
    }

    /// Synchronous counterpart of [`SessionProvider::scope`].
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT_SESSION.sync_scope(self.handle(), f)
    }

    /// End the backend session and settle locally as signed out. Backend
    /// failures are recorded as diagnostics, never returned.
    pub async fn sign_out(&self) {
        self.reconciler.sign_out().await;
    }

    /// Re-fetch user and profile for the current user, if any.
    pub async fn refresh(&self) {
        self.reconciler.refresh().await;
    }

    /// Tear down explicitly. Equivalent to dropping the provider.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.store.tear_down();
        self.listener.abort();
        self.initial_check.abort();
        debug!("session provider unmounted");
    }
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

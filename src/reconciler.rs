//! Session reconciler: drives the store from backend session state.
//!
//! STATES
//! ======
//! - Init: mount begins a cycle, asks the backend for the current session
//!   and arms the session-check guard.
//! - SessionResolved: a session hands off to the identity fetcher (which arms
//!   its own guard); no session commits the signed-out state.
//! - SessionCheckFailed: the check errored; the cycle settles signed out.
//! - Listening: runs for the whole mounted lifetime. Every notification
//!   begins a new cycle, so an older fetch still in flight can no longer
//!   write. A lag begins its recheck cycle where it is observed, so the
//!   retained events after it stay newer. Dropping the listener task drops
//!   its fetches with it.
//!
//! RACE POLICY
//! ===========
//! Guards only force an interim state. The operation's own result is
//! authoritative whenever it arrives, as long as its cycle is still the
//! newest one and the provider is still mounted.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::config::SessionConfig;
use crate::diagnostics::Diagnostics;
use crate::guard::{GuardKind, TimeoutGuard};
use crate::identity::IdentityFetcher;
use crate::model::{SessionChange, SessionState};
use crate::store::{CycleToken, SessionStore};

#[derive(Clone)]
pub(crate) struct Reconciler {
    backend: Arc<dyn SessionBackend>,
    store: Arc<SessionStore>,
    diagnostics: Arc<Diagnostics>,
    config: SessionConfig,
    fetcher: IdentityFetcher,
}

impl Reconciler {
    pub(crate) fn new(
        backend: Arc<dyn SessionBackend>,
        store: Arc<SessionStore>,
        diagnostics: Arc<Diagnostics>,
        config: SessionConfig,
    ) -> Self {
        let fetcher = IdentityFetcher::new(backend.clone(), store.clone(), diagnostics.clone(), config);
        Self { backend, store, diagnostics, config, fetcher }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.backend.subscribe()
    }

    /// Begin a cycle and check for an existing session.
    pub(crate) async fn check_session(self) {
        let Some(token) = self.store.begin_cycle() else {
            return;
        };
        self.check_session_for(token).await;
    }

    async fn check_session_for(&self, token: CycleToken) {
        let guard = TimeoutGuard::arm(
            GuardKind::SessionCheck,
            self.config.session_check_timeout,
            token,
            self.store.clone(),
            self.diagnostics.clone(),
        );
        let result = self.backend.current_session().await;
        guard.disarm();

        match result {
            Ok(Some(session)) => {
                debug!(user_id = %session.user_id, "existing session found");
                self.fetcher.populate(token, session.user_id).await;
            }
            Ok(None) => {
                debug!("no existing session");
                self.store.commit(token, SessionState::settle_signed_out);
            }
            Err(err) => {
                self.diagnostics.failure(&err, "session check failed");
                self.store.commit(token, SessionState::settle_signed_out);
            }
        }
    }

    /// Consume session-change notifications until the stream closes.
    pub(crate) async fn listen(self, mut changes: broadcast::Receiver<SessionChange>) {
        let mut in_flight = JoinSet::new();
        loop {
            let change = match changes.recv().await {
                Ok(change) => change,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session change listener lagged; re-checking session");
                    let Some(token) = self.store.begin_cycle() else {
                        continue;
                    };
                    let this = self.clone();
                    in_flight.spawn(async move { this.check_session_for(token).await });
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!("session change stream closed");
                    break;
                }
            };
            while in_flight.try_join_next().is_some() {}
            self.apply_change(change, &mut in_flight);
        }
        while in_flight.join_next().await.is_some() {}
    }

    fn apply_change(&self, change: SessionChange, in_flight: &mut JoinSet<()>) {
        let Some(token) = self.store.begin_cycle() else {
            return;
        };
        match change.session {
            Some(session) => {
                info!(kind = ?change.kind, user_id = %session.user_id, "session changed");
                let fetcher = self.fetcher.clone();
                in_flight.spawn(async move { fetcher.populate(token, session.user_id).await });
            }
            None => {
                info!(kind = ?change.kind, "session ended");
                self.store.commit(token, SessionState::settle_signed_out);
            }
        }
    }

    /// Re-resolve the currently populated user in a fresh cycle.
    pub(crate) async fn refresh(&self) {
        let Some(user_id) = self.store.snapshot().user.map(|u| u.id) else {
            debug!("refresh requested while signed out");
            return;
        };
        let Some(token) = self.store.begin_cycle() else {
            return;
        };
        self.fetcher.populate(token, user_id).await;
    }

    /// Ask the backend to end the session, then settle locally as signed out.
    pub(crate) async fn sign_out(&self) {
        if let Err(err) = self.backend.sign_out().await {
            self.diagnostics.failure(&err, "sign out failed");
        }
        if let Some(token) = self.store.begin_cycle() {
            self.store.commit(token, SessionState::settle_signed_out);
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;

//! Timeout guards that force the store out of the loading state.
//!
//! A guard is a spawned timer bound to one cycle token. If it outlives its
//! deadline it forces the signed-out state and records a warning; disarming
//! or dropping it aborts the timer, so a guard never outlives the operation
//! (or the provider) that armed it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::diagnostics::Diagnostics;
use crate::model::SessionState;
use crate::store::{CycleToken, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    SessionCheck,
    IdentityFetch,
}

impl GuardKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::SessionCheck => "W_SESSION_CHECK_TIMEOUT",
            Self::IdentityFetch => "W_IDENTITY_FETCH_TIMEOUT",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SessionCheck => "session check",
            Self::IdentityFetch => "identity fetch",
        }
    }
}

pub struct TimeoutGuard {
    kind: GuardKind,
    timer: Option<JoinHandle<()>>,
}

impl TimeoutGuard {
    /// Arm a deadline for the operation running under `token`.
    #[must_use]
    pub fn arm(
        kind: GuardKind,
        deadline: Duration,
        token: CycleToken,
        store: Arc<SessionStore>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if store.force(token, SessionState::settle_signed_out) {
                diagnostics.warning(
                    kind.code(),
                    format!(
                        "{} did not finish within {}ms; showing signed-out state",
                        kind.label(),
                        deadline.as_millis()
                    ),
                );
            }
        });
        tracing::trace!(guard = kind.label(), generation = token.generation(), "guard armed");
        Self { kind, timer: Some(timer) }
    }

    /// Cancel the deadline. Has no effect if it already fired.
    pub fn disarm(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::trace!(guard = self.kind.label(), "guard disarmed");
        }
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

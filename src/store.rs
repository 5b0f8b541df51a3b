//! Session store: the single owned instance of `SessionState`.
//!
//! DESIGN
//! ======
//! State lives in a `watch` channel so every consumer handle sees the latest
//! tuple and can await changes. All writes go through `send_if_modified`,
//! whose closure runs under the channel's write lock; the generation,
//! settled and torn-down checks happen inside that closure so a check and
//! its write are never interleaved with another commit.
//!
//! GENERATIONS
//! ===========
//! Each triggering event (mount, session-change notification, refresh,
//! sign-out) begins a cycle and receives a `CycleToken`. Only the newest
//! cycle may write. Operations `commit` their terminal result and mark the
//! cycle settled; timeout guards `force` an interim signed-out state but
//! stand down once the cycle has settled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::model::SessionState;

/// Marks the reconciliation cycle an asynchronous operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleToken(u64);

impl CycleToken {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

pub struct SessionStore {
    tx: watch::Sender<SessionState>,
    generation: AtomicU64,
    settled: AtomicU64,
    torn_down: AtomicBool,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::pending());
        Self { tx, generation: AtomicU64::new(0), settled: AtomicU64::new(0), torn_down: AtomicBool::new(false) }
    }

    /// Current tuple.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_current(&self, token: CycleToken) -> bool {
        !self.is_torn_down() && self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Start a new cycle, invalidating every older token, and mark the
    /// state as loading. Returns `None` once the store is torn down.
    pub(crate) fn begin_cycle(&self) -> Option<CycleToken> {
        let mut token = None;
        self.tx.send_if_modified(|state| {
            if self.is_torn_down() {
                return false;
            }
            let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            token = Some(CycleToken(next));
            let was_loading = state.loading;
            state.set_loading(true);
            !was_loading
        });
        token
    }

    /// Apply an operation's terminal result for `token` and settle the cycle.
    ///
    /// Returns `false` (writing nothing) if a newer cycle exists or the store
    /// has been torn down.
    pub(crate) fn commit(&self, token: CycleToken, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if !self.is_current(token) {
                return false;
            }
            applied = true;
            self.settled.store(token.0, Ordering::SeqCst);
            mutate(state, f)
        });
        applied
    }

    /// Apply a guard's forced state for `token` unless the cycle has already
    /// settled. Does not settle the cycle, so a later `commit` still wins.
    pub(crate) fn force(&self, token: CycleToken, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if !self.is_current(token) || self.settled.load(Ordering::SeqCst) == token.0 {
                return false;
            }
            applied = true;
            mutate(state, f)
        });
        applied
    }

    /// Freeze the store. No write of any kind is accepted afterwards.
    pub(crate) fn tear_down(&self) {
        self.tx.send_if_modified(|_| {
            self.torn_down.store(true, Ordering::SeqCst);
            false
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn mutate(state: &mut SessionState, f: impl FnOnce(&mut SessionState)) -> bool {
    let before = state.clone();
    f(state);
    *state != before
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

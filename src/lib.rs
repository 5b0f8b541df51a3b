//! Session authority for the job-portal client.
//!
//! ARCHITECTURE
//! ============
//! A mounted [`SessionProvider`] reconciles an external auth/data backend
//! ([`backend::SessionBackend`]) into one observable `{user, profile, loading}`
//! tuple. Backend failures, stalls and races are absorbed here; application
//! code only ever reads the tuple (via [`use_session`] inside a provider
//! scope) and never sees a backend error.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
mod guard;
pub mod identity;
pub mod model;
pub mod provider;
mod reconciler;
pub mod store;

pub use backend::{HttpBackend, SessionBackend};
pub use config::{BackendConfig, SessionConfig};
pub use diagnostics::{Diagnostic, Severity};
pub use error::{BackendError, ConfigError, ErrorCode, UsageError};
pub use guard::GuardKind;
pub use model::{ProfileRecord, Session, SessionChange, SessionEventKind, SessionState, UserRecord, UserRole};
pub use provider::{SessionHandle, SessionProvider, session_handle, use_session};

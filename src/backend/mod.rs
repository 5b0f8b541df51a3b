//! Backend seam: the external auth/data service the session core consumes.
//!
//! ARCHITECTURE
//! ============
//! The core never talks to the network directly. It holds an
//! `Arc<dyn SessionBackend>`; production wires in `http::HttpBackend`,
//! tests wire in a scripted mock. Session-change notifications are a
//! `broadcast` stream; dropping the receiver is the unsubscribe.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::BackendError;
use crate::model::{ProfileRecord, Session, SessionChange, UserRecord};

pub use http::HttpBackend;

#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    /// The session the backend currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Subscribe to session-change notifications. Delivery is at-least-once.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Exactly-one lookup of the application user row. Zero rows is `Ok(None)`.
    async fn query_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError>;

    /// At-most-one lookup of the profile row. A missing row may be reported
    /// either as `Ok(None)` or as `BackendError::NotFound`.
    async fn query_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, BackendError>;
}

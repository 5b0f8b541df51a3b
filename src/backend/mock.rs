//! Scripted in-memory backend for tests.
//!
//! Each query replies with a preset result after a preset delay, so tests
//! running on a paused clock can stage slow, failing and racing responses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use super::SessionBackend;
use crate::error::BackendError;
use crate::model::{ProfileRecord, Session, SessionChange, UserRecord, UserRole};

// =========================================================================
// Reply
// =========================================================================

#[derive(Clone)]
pub(crate) struct Reply<T> {
    delay: Duration,
    result: Result<T, BackendError>,
}

impl<T: Clone> Reply<T> {
    pub(crate) fn ok(value: T) -> Self {
        Self { delay: Duration::ZERO, result: Ok(value) }
    }

    pub(crate) fn err(err: BackendError) -> Self {
        Self { delay: Duration::ZERO, result: Err(err) }
    }

    pub(crate) fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn deliver(self) -> Result<T, BackendError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result
    }
}

// =========================================================================
// MockBackend
// =========================================================================

pub(crate) struct MockBackend {
    session: Mutex<Reply<Option<Session>>>,
    users: Mutex<HashMap<Uuid, Reply<Option<UserRecord>>>>,
    profiles: Mutex<HashMap<Uuid, Reply<Option<ProfileRecord>>>>,
    sign_out: Mutex<Result<(), BackendError>>,
    events: broadcast::Sender<SessionChange>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    /// No session, no rows.
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(Reply::ok(None)),
            users: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            sign_out: Mutex::new(Ok(())),
            events,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_session(self, reply: Reply<Option<Session>>) -> Self {
        self.set_session(reply);
        self
    }

    pub(crate) fn set_session(&self, reply: Reply<Option<Session>>) {
        *self.session.lock().unwrap() = reply;
    }

    pub(crate) fn with_user(self, user_id: Uuid, reply: Reply<Option<UserRecord>>) -> Self {
        self.users.lock().unwrap().insert(user_id, reply);
        self
    }

    pub(crate) fn with_profile(self, user_id: Uuid, reply: Reply<Option<ProfileRecord>>) -> Self {
        self.set_profile(user_id, reply);
        self
    }

    pub(crate) fn set_profile(&self, user_id: Uuid, reply: Reply<Option<ProfileRecord>>) {
        self.profiles.lock().unwrap().insert(user_id, reply);
    }

    pub(crate) fn with_sign_out(self, result: Result<(), BackendError>) -> Self {
        *self.sign_out.lock().unwrap() = result;
        self
    }

    pub(crate) fn emit(&self, change: SessionChange) {
        let _ = self.events.send(change);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl SessionBackend for MockBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        self.record("current_session".into());
        let reply = self.session.lock().unwrap().clone();
        reply.deliver().await
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record("sign_out".into());
        let result = self.sign_out.lock().unwrap().clone();
        if result.is_ok() {
            self.emit(SessionChange::signed_out());
        }
        result
    }

    async fn query_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError> {
        self.record(format!("user:{user_id}"));
        let reply = self.users.lock().unwrap().get(&user_id).cloned();
        match reply {
            Some(reply) => reply.deliver().await,
            None => Ok(None),
        }
    }

    async fn query_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, BackendError> {
        self.record(format!("profile:{user_id}"));
        let reply = self.profiles.lock().unwrap().get(&user_id).cloned();
        match reply {
            Some(reply) => reply.deliver().await,
            None => Err(BackendError::NotFound),
        }
    }
}

// =========================================================================
// Fixtures
// =========================================================================

pub(crate) fn user_record(id: Uuid) -> UserRecord {
    UserRecord {
        id,
        email: format!("{}@example.com", &id.simple().to_string()[..8]),
        first_name: Some("Grace".into()),
        last_name: Some("Hopper".into()),
        role: UserRole::JobSeeker,
        subscription_tier: "free".into(),
        is_active: true,
        is_verified: true,
        created_at: Some("2024-01-01T00:00:00Z".into()),
        updated_at: None,
    }
}

pub(crate) fn profile_record(user_id: Uuid) -> ProfileRecord {
    ProfileRecord {
        user_id,
        bio: Some("compiler person".into()),
        location: Some("Arlington".into()),
        skills: vec!["cobol".into(), "rust".into()],
        resume_url: None,
        completion_percentage: 60,
    }
}

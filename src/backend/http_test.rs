use super::*;
use crate::config::HttpTimeouts;
use crate::model::{SessionEventKind, UserRole};

fn test_config() -> BackendConfig {
    BackendConfig {
        base_url: "https://portal.example.test".into(),
        anon_key: "anon".into(),
        timeouts: HttpTimeouts { request_secs: 5, connect_secs: 1 },
    }
}

// =============================================================================
// classify_failure
// =============================================================================

#[test]
fn no_rows_code_is_not_found() {
    let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#;
    assert_eq!(classify_failure(406, body), BackendError::NotFound);
}

#[test]
fn insufficient_privilege_is_policy_error() {
    let body = r#"{"code":"42501","message":"permission denied for table users"}"#;
    assert_eq!(
        classify_failure(400, body),
        BackendError::AuthorizationPolicy("permission denied for table users".into())
    );
}

#[test]
fn forbidden_without_body_is_policy_error() {
    assert_eq!(classify_failure(403, ""), BackendError::AuthorizationPolicy("HTTP 403".into()));
}

#[test]
fn gateway_failure_is_transport() {
    assert_eq!(classify_failure(503, "<html>unavailable</html>"), BackendError::Transport("HTTP 503".into()));
}

#[test]
fn other_coded_failure_keeps_code() {
    let body = r#"{"code":"PGRST204","message":"column not found"}"#;
    assert_eq!(
        classify_failure(400, body),
        BackendError::Backend { code: "PGRST204".into(), message: "column not found".into() }
    );
}

#[test]
fn uncoded_failure_uses_status() {
    assert_eq!(
        classify_failure(418, "{}"),
        BackendError::Backend { code: "418".into(), message: "HTTP 418".into() }
    );
}

// =============================================================================
// parsing
// =============================================================================

#[test]
fn parse_auth_user_builds_session() {
    let id = Uuid::new_v4();
    let body = format!(r#"{{"id":"{id}","email":"a@b.c","aud":"authenticated"}}"#);
    let session = parse_auth_user(&body, None).unwrap();
    assert_eq!(session.user_id, id);
    assert!(session.access_token_present);
    assert_eq!(session.expires_at, None);
}

#[test]
fn parse_auth_user_carries_grant_expiry() {
    let id = Uuid::new_v4();
    let body = format!(r#"{{"id":"{id}","aud":"authenticated"}}"#);
    let session = parse_auth_user(&body, Some(1_767_225_600)).unwrap();
    assert_eq!(session.expires_at, Some(1_767_225_600));
}

#[test]
fn parse_auth_user_rejects_garbage() {
    let err = parse_auth_user("not json", Some(1)).unwrap_err();
    assert!(matches!(err, BackendError::Backend { code, .. } if code == "E_PARSE"));
}

#[test]
fn parse_row_reads_user_record() {
    let id = Uuid::new_v4();
    let body = format!(
        r#"{{"id":"{id}","email":"hr@acme.io","first_name":"Pat","role":"employer","subscription_tier":"pro","is_verified":true}}"#
    );
    let user: UserRecord = parse_row(&body).unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.role, UserRole::Employer);
    assert_eq!(user.subscription_tier, "pro");
    assert!(user.is_verified);
}

#[test]
fn parse_row_reads_profile_with_defaults() {
    let id = Uuid::new_v4();
    let body = format!(r#"{{"user_id":"{id}","bio":null}}"#);
    let profile: ProfileRecord = parse_row(&body).unwrap();
    assert_eq!(profile.user_id, id);
    assert!(profile.skills.is_empty());
    assert_eq!(profile.completion_percentage, 0);
}

#[test]
fn row_urls_filter_by_id() {
    let id = Uuid::nil();
    assert_eq!(
        user_row_url("https://x.test", id),
        "https://x.test/rest/v1/users?id=eq.00000000-0000-0000-0000-000000000000&select=*"
    );
    assert_eq!(
        profile_row_url("https://x.test", id),
        "https://x.test/rest/v1/profiles?user_id=eq.00000000-0000-0000-0000-000000000000&select=*"
    );
    assert_eq!(auth_user_url("https://x.test"), "https://x.test/auth/v1/user");
    assert_eq!(logout_url("https://x.test"), "https://x.test/auth/v1/logout");
}

// =============================================================================
// client without a token (no network)
// =============================================================================

#[tokio::test]
async fn no_token_means_no_session() {
    let backend = HttpBackend::new(&test_config()).unwrap();
    assert_eq!(backend.current_session().await, Ok(None));
}

#[tokio::test]
async fn sign_out_without_token_notifies_subscribers() {
    let backend = HttpBackend::new(&test_config()).unwrap();
    let mut rx = backend.subscribe();
    backend.sign_out().await.unwrap();

    let change = rx.recv().await.unwrap();
    assert_eq!(change.kind, SessionEventKind::SignedOut);
    assert!(change.session.is_none());
}

#[test]
fn bearer_falls_back_to_anon_key() {
    let backend = HttpBackend::new(&test_config()).unwrap();
    assert_eq!(backend.bearer(), "Bearer anon");
    backend.set_credentials(Some(Credentials { access_token: "user-jwt".into(), expires_at: None }));
    assert_eq!(backend.bearer(), "Bearer user-jwt");
}

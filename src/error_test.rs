use super::*;

// =============================================================================
// BackendError
// =============================================================================

#[test]
fn backend_error_codes_distinguish_policy_from_transport() {
    assert_eq!(BackendError::Transport("reset".into()).error_code(), "E_TRANSPORT");
    assert_eq!(BackendError::AuthorizationPolicy("rls".into()).error_code(), "E_ACCESS_POLICY");
    assert_eq!(BackendError::NotFound.error_code(), "E_NOT_FOUND");
    assert_eq!(
        BackendError::Backend { code: "XX000".into(), message: "boom".into() }.error_code(),
        "E_BACKEND"
    );
}

#[test]
fn only_transport_is_retryable() {
    assert!(BackendError::Transport("timeout".into()).retryable());
    assert!(!BackendError::AuthorizationPolicy("rls".into()).retryable());
    assert!(!BackendError::NotFound.retryable());
    assert!(!BackendError::Backend { code: "1".into(), message: "x".into() }.retryable());
}

#[test]
fn backend_error_display_includes_code_and_message() {
    let err = BackendError::Backend { code: "PGRST301".into(), message: "JWT expired".into() };
    assert_eq!(err.to_string(), "backend error PGRST301: JWT expired");
}

// =============================================================================
// UsageError / ConfigError
// =============================================================================

#[test]
fn usage_error_mentions_provider() {
    let err = UsageError::OutsideProvider;
    assert!(err.to_string().contains("SessionProvider"));
    assert_eq!(err.error_code(), "E_OUTSIDE_PROVIDER");
    assert!(!err.retryable());
}

#[test]
fn config_error_display() {
    let err = ConfigError::Invalid { var: "PORTAL_SESSION_CHECK_TIMEOUT_MS".into(), value: "soon".into() };
    assert_eq!(err.to_string(), "invalid value for PORTAL_SESSION_CHECK_TIMEOUT_MS: \"soon\"");
    assert_eq!(ConfigError::Missing { var: "X".into() }.error_code(), "E_CONFIG_MISSING");
}

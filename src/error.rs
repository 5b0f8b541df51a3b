//! Error taxonomy for the session authority.
//!
//! DESIGN
//! ======
//! Backend failures are absorbed inside the crate and surface only as the
//! eventual `{user, profile, loading}` value plus a diagnostic record.
//! `UsageError` is the one kind that reaches application code, because it
//! signals a programmer error (reading state outside a provider scope).

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable machine-readable code attached to every error kind.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Failures reported by the external auth/data backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Network failure or backend unavailable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Row-level access control rejected a read the principal should be allowed.
    #[error("access policy rejected read: {0}")]
    AuthorizationPolicy(String),

    /// The requested row does not exist.
    #[error("record not found")]
    NotFound,

    /// Any other error the backend reported.
    #[error("backend error {code}: {message}")]
    Backend { code: String, message: String },
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::AuthorizationPolicy(_) => "E_ACCESS_POLICY",
            Self::NotFound => "E_NOT_FOUND",
            Self::Backend { .. } => "E_BACKEND",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// =============================================================================
// USAGE
// =============================================================================

/// Misuse of the consumer API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("session state must be read inside a SessionProvider scope")]
    OutsideProvider,
}

impl ErrorCode for UsageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::OutsideProvider => "E_OUTSIDE_PROVIDER",
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: String },

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

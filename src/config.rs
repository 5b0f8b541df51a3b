//! Configuration parsed from environment variables.
//!
//! Parsing goes through a lookup closure so tests can feed a map instead of
//! mutating the process environment.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SESSION_CHECK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_IDENTITY_FETCH_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_PROFILE_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// SESSION TIMEOUTS
// =============================================================================

/// Deadlines for the two timeout guards and the profile query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub session_check_timeout: Duration,
    pub identity_fetch_timeout: Duration,
    pub profile_query_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_check_timeout: Duration::from_millis(DEFAULT_SESSION_CHECK_TIMEOUT_MS),
            identity_fetch_timeout: Duration::from_millis(DEFAULT_IDENTITY_FETCH_TIMEOUT_MS),
            profile_query_timeout: Duration::from_millis(DEFAULT_PROFILE_QUERY_TIMEOUT_MS),
        }
    }
}

impl SessionConfig {
    /// Optional:
    /// - `PORTAL_SESSION_CHECK_TIMEOUT_MS`: default 10000
    /// - `PORTAL_IDENTITY_FETCH_TIMEOUT_MS`: default 8000
    /// - `PORTAL_PROFILE_QUERY_TIMEOUT_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns an error if a value is present but not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            session_check_timeout: Duration::from_millis(parse_positive(
                &lookup,
                "PORTAL_SESSION_CHECK_TIMEOUT_MS",
                DEFAULT_SESSION_CHECK_TIMEOUT_MS,
            )?),
            identity_fetch_timeout: Duration::from_millis(parse_positive(
                &lookup,
                "PORTAL_IDENTITY_FETCH_TIMEOUT_MS",
                DEFAULT_IDENTITY_FETCH_TIMEOUT_MS,
            )?),
            profile_query_timeout: Duration::from_millis(parse_positive(
                &lookup,
                "PORTAL_PROFILE_QUERY_TIMEOUT_MS",
                DEFAULT_PROFILE_QUERY_TIMEOUT_MS,
            )?),
        })
    }
}

// =============================================================================
// BACKEND CONNECTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
}

impl BackendConfig {
    /// Required:
    /// - `PORTAL_BACKEND_URL`
    /// - `PORTAL_BACKEND_ANON_KEY`
    ///
    /// Optional:
    /// - `PORTAL_HTTP_REQUEST_TIMEOUT_SECS`: default 15
    /// - `PORTAL_HTTP_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns an error if a required var is missing or a timeout is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns an error if a required var is missing or a timeout is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = required(&lookup, "PORTAL_BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();
        let anon_key = required(&lookup, "PORTAL_BACKEND_ANON_KEY")?;
        let timeouts = HttpTimeouts {
            request_secs: parse_positive(&lookup, "PORTAL_HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_positive(&lookup, "PORTAL_HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(Self { base_url, anon_key, timeouts })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing { var: key.into() })
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::Invalid { var: key.into(), value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

//! Diagnostic records for absorbed failures.
//!
//! Every failure the core swallows is logged through `tracing` and kept in a
//! small bounded log so callers (and tests) can tell a timeout warning apart
//! from a real backend error.

use std::collections::VecDeque;
use std::sync::Mutex;

use std::fmt::Display;

use serde::Serialize;
use tracing::{error, warn};

use crate::error::ErrorCode;

const MAX_DIAGNOSTICS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    /// Whether repeating the failed call could succeed. Always false for warnings.
    pub retryable: bool,
}

#[derive(Default)]
pub struct Diagnostics {
    entries: Mutex<VecDeque<Diagnostic>>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        warn!(code, %message, "session diagnostic");
        self.push(Diagnostic { severity: Severity::Warning, code, message, retryable: false });
    }

    /// Record an absorbed error, prefixed with what was being attempted.
    pub fn failure(&self, err: &impl ErrorCode, context: impl Display) {
        let code = err.error_code();
        let retryable = err.retryable();
        let message = format!("{context}: {err}");
        error!(code, retryable, %message, "session diagnostic");
        self.push(Diagnostic { severity: Severity::Error, code, message, retryable });
    }

    /// All retained records, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn with_severity(&self, severity: Severity) -> Vec<Diagnostic> {
        self.lock()
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }

    fn push(&self, diagnostic: Diagnostic) {
        let mut entries = self.lock();
        if entries.len() == MAX_DIAGNOSTICS {
            entries.pop_front();
        }
        entries.push_back(diagnostic);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Diagnostic>> {
        // A poisoned log is still a valid log.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

use serde::Serialize;
use thiserror::Error;

/// The stable wire codes every component maps its failures to (spec §7).
/// `CircuitOpen` is never surfaced as an error; it only ever appears as
/// a field on `SyncResult` and a job's terminal status, so it has no
/// variant here; see [`ErrorKind::is_terminal_failure`] for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    AuthExpired,
    RateLimited,
    UpstreamError,
    DependencyMissing,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::AuthExpired => "AUTH_EXPIRED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::UpstreamError => "UPSTREAM_ERROR",
            ErrorKind::DependencyMissing => "DEPENDENCY_MISSING",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// The error type every component's public contract produces. Pipelines
/// propagate these without rewrapping (spec §7 propagation policy).
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct MidasError {
    pub kind: ErrorKind,
    pub message: String,
    /// Present only for `RATE_LIMITED` errors with a known cooldown.
    pub retry_after_seconds: Option<u64>,
}

impl MidasError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_seconds: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthExpired, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: u64) -> Self {
        Self::new(ErrorKind::RateLimited, message).with_retry_after(retry_after_seconds)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, message)
    }

    pub fn dependency_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyMissing, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

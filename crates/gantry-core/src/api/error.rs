use std::{fmt, time::Duration};

use thiserror::Error;

/// Retry classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Timeout, connection failure, 5xx, rate limiting. Retried by the client.
    Transient,
    /// Schema rejection, auth failure, not-found, undecodable response. Never retried.
    Permanent,
}

impl ApiErrorKind {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiErrorKind::Transient => "transient",
            ApiErrorKind::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Failure of a single [`ResourceApi`](super::ResourceApi) operation.
///
/// `message` is the remote error text, verbatim.
#[derive(Debug, Clone, Error)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// Operation name, e.g. `create_template`.
    pub operation: &'static str,
    /// HTTP status, when the failure came with one.
    pub status: Option<u16>,
    pub message: String,
    /// Number of attempts made before giving up.
    pub attempts: u32,
    /// Server-requested delay before the next attempt.
    pub retry_after: Option<Duration>,
}

impl ApiError {
    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transient,
            operation,
            status: None,
            message: message.into(),
            attempts: 1,
            retry_after: None,
        }
    }

    pub fn permanent(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Permanent,
            ..Self::transient(operation, message)
        }
    }

    /// Attach the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a server-requested retry delay.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        self.kind == ApiErrorKind::Transient
    }

    /// Escalate a transient failure whose retry budget ran out.
    ///
    /// The result is permanent: callers above the client never retry.
    pub fn exhausted(mut self, attempts: u32) -> Self {
        self.kind = ApiErrorKind::Permanent;
        self.attempts = attempts;
        self.retry_after = None;
        self
    }

    /// Rewrite the message, keeping the classification.
    pub fn map_message(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.message = f(&self.message);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.operation)?;
        match self.status {
            Some(status) => write!(f, " (HTTP {status}, {})", self.kind)?,
            None => write!(f, " ({})", self.kind)?,
        }
        if self.attempts > 1 {
            write!(f, " after {} attempts", self.attempts)?;
        }
        write!(f, ": {}", self.message)
    }
}

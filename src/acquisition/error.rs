use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// What an unrecoverable failure rules out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// This strategy cannot serve the key; the next strategy may.
    Strategy,
    /// The resource itself is gone; no strategy can serve it.
    Content,
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorScope::Strategy => f.write_str("strategy"),
            ErrorScope::Content => f.write_str("content"),
        }
    }
}

/// Failure reported by a single [`Strategy`](super::Strategy) attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("retriable: {reason}")]
    Retriable { reason: String },

    #[error("unrecoverable ({scope}): {reason}")]
    Unrecoverable { scope: ErrorScope, reason: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

impl SourceError {
    pub fn retriable(reason: impl Into<String>) -> Self {
        SourceError::Retriable {
            reason: reason.into(),
        }
    }

    /// This strategy is unusable for the key (missing tool, bad credentials).
    pub fn strategy_unavailable(reason: impl Into<String>) -> Self {
        SourceError::Unrecoverable {
            scope: ErrorScope::Strategy,
            reason: reason.into(),
        }
    }

    /// The resource does not exist anywhere (deleted, private, blocked).
    pub fn content_unavailable(reason: impl Into<String>) -> Self {
        SourceError::Unrecoverable {
            scope: ErrorScope::Content,
            reason: reason.into(),
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        SourceError::RateLimited { retry_after }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, SourceError::Retriable { .. })
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Why an acquisition produced no payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("all strategies exhausted after {attempts} attempts (last error: {last_error})")]
    Exhausted { attempts: u32, last_error: String },

    #[error("strategy '{strategy}' reported the content unavailable: {reason}")]
    Aborted { strategy: String, reason: String },

    #[error("acquisition exceeded its {budget:?} budget")]
    TimedOut { budget: Duration },

    #[error("no strategies registered")]
    NoStrategies,
}

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

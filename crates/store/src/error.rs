//! Error surface for all external adapters.
//!
//! Callers branch on [`StoreErrorKind`], never on message text: retry loops
//! look at `is_retryable()`, the engine maps `Fatal`/exhausted-retry errors to
//! upstream-unavailable, and conditional updates report `Conflict`.

use std::fmt;

use thiserror::Error;

/// Classification of an adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// The requested entity does not exist.
    NotFound,
    /// The upstream asked us to slow down; retry with a longer delay.
    RateLimited,
    /// A transient fault (timeout, 5xx, connection reset); retry.
    Transient,
    /// A conditional update lost the race.
    Conflict,
    /// A permanent failure; never retried.
    Fatal,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StoreErrorKind::NotFound => "not_found",
            StoreErrorKind::RateLimited => "rate_limited",
            StoreErrorKind::Transient => "transient",
            StoreErrorKind::Conflict => "conflict",
            StoreErrorKind::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// An adapter failure with its classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} store error: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::RateLimited, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Transient, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Conflict, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Fatal, message)
    }

    /// Only rate-limit and transient faults are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::RateLimited | StoreErrorKind::Transient
        )
    }
}

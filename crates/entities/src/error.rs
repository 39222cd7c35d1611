//! Error types produced by the `entities` crate.
use thiserror::Error;

/// Validation failures for domain entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntityError {
    #[error("missing required identifier: {0}")]
    MissingId(&'static str),
    #[error("invalid NAICS code: {0}")]
    InvalidNaics(String),
    #[error("too many NAICS codes: {0} (maximum 10)")]
    TooManyNaics(usize),
    #[error("invalid employee bucket: {0}")]
    InvalidEmployeeBucket(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid schedule expression: {0}")]
    InvalidSchedule(String),
}

//! Error types for plume.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are grouped
//! the way callers react to them: bounds and configuration problems go back to
//! the immediate caller, per-document parse failures are skipped by the build
//! pipeline, and storage errors abort the current build or compaction.

use thiserror::Error;

/// Result type alias for plume operations.
pub type Result<T> = std::result::Result<T, PlumeError>;

/// Main error type for plume.
#[derive(Error, Debug)]
pub enum PlumeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("Too many query terms: {count} (limit {limit})")]
    TooManyTerms { count: usize, limit: usize },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlumeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PlumeError::InvalidArgument(msg.into())
    }

    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        PlumeError::OutOfBounds(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        PlumeError::InvalidState(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PlumeError::NotFound(msg.into())
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        PlumeError::Corrupted(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PlumeError::Parse(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        PlumeError::InvalidConfig(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PlumeError::Internal(msg.into())
    }

    /// Whether this error only says that a term or record is absent.
    ///
    /// Readers that merge several sources treat such a miss as an empty list.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlumeError::NotFound(_))
    }
}

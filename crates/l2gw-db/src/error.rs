//! Error types for persistence operations.

use std::io;
use thiserror::Error;

/// Result type alias for persistence operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by an [`L2gwStore`](crate::L2gwStore).
#[derive(Debug, Error)]
pub enum DbError {
    /// Row lookup by id found nothing.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity family (e.g. "gateway", "remote mac").
        kind: &'static str,
        /// The id that did not resolve.
        id: String,
    },

    /// A uniqueness constraint was violated.
    #[error("{kind} already exists: {key}")]
    Duplicate {
        kind: &'static str,
        key: String,
    },

    /// Commit or rollback was requested with no open transaction.
    #[error("no open transaction")]
    NoTransaction,

    /// A state snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DbError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn duplicate(kind: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

//! # Ledger Error Types
//!
//! What callers of [`LedgerService`](crate::LedgerService) see when an
//! operation fails. Every failure means the operation's transaction was
//! rolled back and nothing was persisted.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ────────────────► InvalidInput           │
//! │                                                                         │
//! │  DbError::NotFound ────────────────────────────► NotFound               │
//! │  DbError::UniqueViolation ─────────────────────► Conflict               │
//! │  DbError::LockTimeout / QueryFailed / ... ─────► Storage (logged)       │
//! │                                                                         │
//! │  stock guard rejected a decrement ─────────────► InsufficientStock      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entity missing, or owned by another tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request is well-formed but clashes with stored state
    /// (duplicate invoice number, paying a cash sale as if on credit).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// Storage failure, including lock-wait timeouts.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

/// Machine-readable error codes, e.g. for the report binary's JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidInput,
    Conflict,
    InsufficientStock,
    LockTimeout,
    StorageError,
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::InvalidInput(_) => ErrorCode::InvalidInput,
            LedgerError::Conflict(_) => ErrorCode::Conflict,
            LedgerError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            LedgerError::Storage(DbError::LockTimeout) => ErrorCode::LockTimeout,
            LedgerError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::UniqueViolation { field, .. } => {
                LedgerError::Conflict(format!("duplicate value for {}", field))
            }
            DbError::LockTimeout => {
                tracing::warn!("Gave up waiting for the database write lock");
                LedgerError::Storage(DbError::LockTimeout)
            }
            other => {
                tracing::error!(error = %other, "Ledger storage failure");
                LedgerError::Storage(other)
            }
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::from(DbError::from(err))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        let err = LedgerError::from(DbError::not_found("Sale", "s1"));
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Sale"));

        let err = LedgerError::from(DbError::duplicate("purchases.invoice_number", "PO-1"));
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err = LedgerError::from(DbError::LockTimeout);
        assert_eq!(err.code(), ErrorCode::LockTimeout);

        let err = LedgerError::from(DbError::QueryFailed("boom".into()));
        assert_eq!(err.code(), ErrorCode::StorageError);
    }

    #[test]
    fn test_core_error_is_invalid_input() {
        let err = LedgerError::from(CoreError::AmbiguousPaymentTarget);
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}

//! Error types for versakv core.

use crate::types::TransactionId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in versakv core operations.
///
/// Missing data is not an error: reads report it through
/// [`ReadResult`](crate::ReadResult). Errors are reserved for aborted
/// transactions, broken bookkeeping, and I/O.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] versakv_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transaction aborted itself and its writes were rolled back.
    #[error("transaction {tid} aborted: {reason}")]
    TransactionAborted {
        /// The aborted transaction.
        tid: TransactionId,
        /// Reason for abort.
        reason: String,
    },

    /// Engine bookkeeping is inconsistent with the request.
    ///
    /// Raised for operations on a transaction that was never begun or has
    /// already terminated, and for lock releases by a non-owner. These are
    /// caller bugs; see [`CoreError::is_fatal`].
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// A snapshot could not be decoded.
    #[error("snapshot corrupted: {message}")]
    SnapshotCorrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Invalid database directory or format.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Another process holds the database directory.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,
}

impl CoreError {
    /// Creates a transaction aborted error.
    pub fn transaction_aborted(tid: TransactionId, reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            tid,
            reason: reason.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates the invariant violation for an unknown or finished transaction.
    pub fn unknown_transaction(tid: TransactionId) -> Self {
        Self::invariant_violation(format!("{tid} is not an active transaction"))
    }

    /// Creates a snapshot corrupted error.
    pub fn snapshot_corrupted(message: impl Into<String>) -> Self {
        Self::SnapshotCorrupted {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for errors that must never be handled softly.
    ///
    /// A fatal error means the engine's transaction bookkeeping and the
    /// caller disagree. Continuing is possible but the caller is expected
    /// to treat it as a bug and usually halt.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Returns true if the error reports a self-aborted transaction.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::TransactionAborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violations_are_fatal() {
        assert!(CoreError::unknown_transaction(TransactionId::new(3)).is_fatal());
        assert!(!CoreError::transaction_aborted(TransactionId::new(3), "x").is_fatal());
        assert!(!CoreError::DatabaseLocked.is_fatal());
    }

    #[test]
    fn aborted_message_names_transaction() {
        let err = CoreError::transaction_aborted(TransactionId::new(7), "key A not found");
        assert!(err.is_aborted());
        assert_eq!(err.to_string(), "transaction txn:7 aborted: key A not found");
    }
}

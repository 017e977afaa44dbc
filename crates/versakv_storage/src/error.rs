//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The staged blob could not be moved over the live one.
    #[error("failed to publish {staged} over {target}: {source}")]
    Publish {
        /// Temporary file holding the new blob.
        staged: PathBuf,
        /// Live file that should have been replaced.
        target: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

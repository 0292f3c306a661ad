//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in a log backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the log.
    #[error("read past end of log: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// Requested read offset.
        offset: u64,
        /// Requested read length.
        len: usize,
        /// Current log size.
        size: u64,
    },

    /// Truncation target is beyond the current log size.
    #[error("cannot truncate to {target}: log is only {size} bytes")]
    TruncateBeyondEnd {
        /// Requested new size.
        target: u64,
        /// Current log size.
        size: u64,
    },
}

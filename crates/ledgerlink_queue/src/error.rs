//! Queue error types.

use ledgerlink_storage::StorageError;
use thiserror::Error;

/// Errors raised by the offline queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying log storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A journal record could not be serialized.
    #[error("journal encode error: {0}")]
    Encode(String),

    /// The journal contains a frame that fails validation.
    #[error("corrupt journal at offset {offset}: {detail}")]
    CorruptJournal {
        /// Byte offset of the bad frame.
        offset: u64,
        /// What failed.
        detail: String,
    },

    /// The referenced entry does not exist or is already retired.
    #[error("no pending entry with sequence {seq}")]
    UnknownEntry {
        /// The sequence number that was looked up.
        seq: u64,
    },
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

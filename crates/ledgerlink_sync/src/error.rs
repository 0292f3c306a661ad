//! Sync coordinator errors.

use ledgerlink_protocol::{TransientReason, ValidationError};
use ledgerlink_queue::QueueError;
use thiserror::Error;

/// Errors raised by the sync coordinator.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The offline queue failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The submitted record is structurally invalid.
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// A read query needed the engine and the engine was not available.
    /// Reads are never queued, so there is nothing to fall back to.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(TransientReason),
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

//! Durable offline queue for ledger engine submissions.
//!
//! Business events submitted while the engine is unreachable land here,
//! journaled to an append-only log so they survive restarts, and are
//! replayed in enqueue order once connectivity returns.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod error;
mod journal;
mod queue;

pub use entry::{BackoffPolicy, QueueEntry, TerminalKind};
pub use error::{QueueError, QueueResult};
pub use journal::compute_crc32;
pub use queue::{Disposition, Enqueued, OfflineQueue};

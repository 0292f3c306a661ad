//! # LedgerLink Storage
//!
//! Append-only byte stores backing the durable offline queue.
//!
//! Backends are opaque: they know nothing about journal framing or queue
//! entries. The queue crate owns all record interpretation; a backend only
//! guarantees that appended bytes come back unchanged and that a flushed
//! append survives process termination.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::LogBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;

//! Log backend trait definition.

use crate::error::StorageResult;

/// A low-level append-only byte store.
///
/// The offline queue journal is written through this trait. Backends treat
/// the log as a flat byte sequence: `append` extends it, `read_at` returns
/// previously written bytes, `truncate` discards a suffix (used when the
/// queue checkpoints). Framing, checksums, and entry semantics all live in
/// the queue crate.
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_at` returns exactly the bytes previously appended there
/// - after `sync` returns, all appended data survives a crash
/// - backends are `Send + Sync` so the queue can be shared across the
///   foreground submission path and the background drain thread
pub trait LogBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range extends past the end of the log or on I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log, returning the write offset.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// Stronger than `flush`: after this returns, appended data is on disk.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current log size in bytes (the next append offset).
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the log to `new_size` bytes, discarding everything after.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` exceeds the current size or on I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}

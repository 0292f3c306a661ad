//! In-memory log backend for testing.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory log backend.
///
/// Holds the whole log in a `Vec<u8>`. Used by queue unit tests and by
/// callers that want an ephemeral queue with no durability.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend seeded with existing bytes.
    ///
    /// Useful for replay and corruption tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the full log contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                target: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_offsets() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"abc").unwrap(), 0);
        assert_eq!(backend.append(b"defg").unwrap(), 3);
        assert_eq!(backend.size().unwrap(), 7);
    }

    #[test]
    fn read_back_exact_bytes() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();
        backend.append(b"world").unwrap();
        assert_eq!(backend.read_at(5, 5).unwrap(), b"world");
    }

    #[test]
    fn read_past_end_rejected() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"xy").unwrap();
        assert!(matches!(
            backend.read_at(1, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn truncate_discards_suffix() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"keepdrop").unwrap();
        backend.truncate(4).unwrap();
        assert_eq!(backend.data(), b"keep");
        assert!(matches!(
            backend.truncate(100),
            Err(StorageError::TruncateBeyondEnd { .. })
        ));
    }
}

//! File-based log backend for persistent queues.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-backed log.
///
/// This is the production backend for the offline queue journal. Queued
/// submissions survive process restarts once `sync` has returned.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<FileInner>,
}

#[derive(Debug)]
struct FileInner {
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens or creates a log file at the given path.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileInner { file, size }),
        })
    }

    /// Opens a log file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Fails if directories cannot be created or the file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        inner.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        inner.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut inner = self.inner.lock();
        if data.is_empty() {
            return Ok(inner.size);
        }

        let offset = inner.size;
        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(data)?;
        inner.size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.lock().file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let inner = self.inner.lock();
        inner.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().size)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if new_size > inner.size {
            return Err(StorageError::TruncateBeyondEnd {
                target: new_size,
                size: inner.size,
            });
        }
        inner.file.set_len(new_size)?;
        inner.size = new_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.log");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"first").unwrap();
            backend.append(b"second").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(0, 5).unwrap(), b"first");
        assert_eq!(backend.read_at(5, 6).unwrap(), b"second");
    }

    #[test]
    fn truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.log");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"abcdef").unwrap();
        backend.truncate(3).unwrap();
        let offset = backend.append(b"xyz").unwrap();
        assert_eq!(offset, 3);
        assert_eq!(backend.read_at(0, 6).unwrap(), b"abcxyz");
    }

    #[test]
    fn create_dirs_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/queue.log");
        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.path(), path.as_path());
    }
}

//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory storage backend.
///
/// The byte buffer lives behind an `Arc`, so a writer and any number of
/// readers can observe the same stream through [`InMemoryBackend::share`].
/// Closing one handle does not affect the others.
///
/// Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral containers that don't need persistence
///
/// # Example
///
/// ```rust
/// use segstream_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let offset = backend.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
///
/// let reader = backend.share();
/// assert_eq!(reader.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
    closed: bool,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            closed: false,
        }
    }

    /// Returns a new open handle over the same buffer.
    #[must_use]
    pub fn share(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            closed: false,
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.check_open()?;
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        self.check_open()?;
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_open()
    }

    fn size(&self) -> StorageResult<u64> {
        self.check_open()?;
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_open()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_appends_and_reads() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);

        assert_eq!(backend.append(b"first\n").unwrap(), 0);
        assert_eq!(backend.append(b"second\n").unwrap(), 6);
        assert_eq!(backend.size().unwrap(), 13);
        assert_eq!(&backend.read_at(6, 7).unwrap(), b"second\n");
        assert!(backend.read_at(13, 0).unwrap().is_empty());
    }

    #[test]
    fn memory_read_must_fit() {
        let backend = InMemoryBackend::with_data(vec![1; 8]);
        for (offset, len) in [(9, 0), (4, 5), (16, 8)] {
            assert!(matches!(
                backend.read_at(offset, len),
                Err(StorageError::ReadPastEnd { size: 8, .. })
            ));
        }
    }

    #[test]
    fn memory_with_data() {
        let backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert_eq!(backend.size().unwrap(), 9);
        assert_eq!(backend.read_at(0, 9).unwrap(), b"preloaded");
    }

    #[test]
    fn memory_shared_handles_see_appends() {
        let mut writer = InMemoryBackend::new();
        let reader = writer.share();

        writer.append(b"abc").unwrap();
        assert_eq!(reader.read_at(0, 3).unwrap(), b"abc");
    }

    #[test]
    fn memory_close_only_affects_one_handle() {
        let mut writer = InMemoryBackend::with_data(b"abc".to_vec());
        let reader = writer.share();

        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(matches!(writer.size(), Err(StorageError::Closed)));
        assert!(matches!(writer.append(b"x"), Err(StorageError::Closed)));

        assert!(!reader.is_closed());
        assert_eq!(reader.size().unwrap(), 3);
    }

    proptest! {
        #[test]
        fn memory_appends_are_contiguous(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)) {
            let mut backend = InMemoryBackend::new();
            let mut expected = Vec::new();
            for chunk in &chunks {
                let offset = backend.append(chunk).unwrap();
                prop_assert_eq!(offset, expected.len() as u64);
                expected.extend_from_slice(chunk);
            }
            prop_assert_eq!(backend.read_at(0, expected.len()).unwrap(), expected);
        }
    }
}

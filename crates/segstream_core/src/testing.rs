//! Test-only backends.

use segstream_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observes whether a [`FaultyBackend`] has been closed.
#[derive(Debug, Clone, Default)]
pub(crate) struct CloseFlag(Arc<AtomicBool>);

impl CloseFlag {
    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory backend that can be told to fail on close.
#[derive(Debug)]
pub(crate) struct FaultyBackend {
    inner: InMemoryBackend,
    fail_close: bool,
    closed: CloseFlag,
}

impl FaultyBackend {
    pub(crate) fn healthy(data: &[u8]) -> (Self, CloseFlag) {
        Self::build(data, false)
    }

    pub(crate) fn failing_close(data: &[u8]) -> (Self, CloseFlag) {
        Self::build(data, true)
    }

    fn build(data: &[u8], fail_close: bool) -> (Self, CloseFlag) {
        let closed = CloseFlag::default();
        let backend = Self {
            inner: InMemoryBackend::with_data(data.to_vec()),
            fail_close,
            closed: closed.clone(),
        };
        (backend, closed)
    }
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn close(&mut self) -> StorageResult<()> {
        let first = !self.inner.is_closed();
        self.inner.close()?;
        self.closed.0.store(true, Ordering::SeqCst);
        if self.fail_close && first {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected close failure",
            )));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

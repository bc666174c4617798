//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store holding one stream of a container.
///
/// Storage backends are **opaque byte stores**. They provide simple
/// operations for positioned reads, appends and flushing. The container
/// owns all format interpretation - backends do not understand entries,
/// segments or offset indexes.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` pushes all appended data to the OS
/// - after `close`, every operation except `close` fails with
///   [`StorageError::Closed`](crate::StorageError::Closed); `close` itself
///   is idempotent
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - The backend is closed
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush` - it ensures that
    /// file metadata (size, timestamps) is also durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Releases the underlying resource.
    ///
    /// Calling `close` on an already closed backend succeeds without doing
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the resource fails. The backend is
    /// considered closed afterwards regardless.
    fn close(&mut self) -> StorageResult<()>;

    /// Returns `true` once `close` has been called.
    fn is_closed(&self) -> bool;
}

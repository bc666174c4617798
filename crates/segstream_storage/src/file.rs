//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Data survives process restarts. Readers open files with
/// [`FileBackend::open_read_only`], writers with [`FileBackend::create`].
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
/// - `close()` drops the file handle, releasing any lock held on it
///
/// # Example
///
/// ```no_run
/// use segstream_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::create(Path::new("stream.dat")).unwrap();
/// let offset = backend.append(b"persistent data").unwrap();
/// backend.sync().unwrap();
/// backend.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<Option<File>>,
    size: RwLock<u64>,
    writable: bool,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// If the file exists, it is opened for reading and appending.
    /// If it doesn't exist, a new file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file, true)
    }

    /// Opens an existing file for reading only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Self::from_file(path, file, false)
    }

    /// Creates a new, empty file for appending.
    ///
    /// Fails if the file already exists: container streams are written
    /// once and never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists or cannot be created.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::from_file(path, file, true)
    }

    /// Opens or creates a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn from_file(path: &Path, file: File, writable: bool) -> StorageResult<Self> {
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(Some(file)),
            size: RwLock::new(size),
            writable,
        })
    }

    /// Takes a non-blocking exclusive advisory lock on the file.
    ///
    /// The lock is held until the backend is closed or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock.
    pub fn lock_exclusive(&self) -> StorageResult<()> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(StorageError::Closed)?;
        file.try_lock_exclusive().map_err(|_| StorageError::Locked {
            path: self.path.clone(),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;

        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        let mut size = self.size.write();

        if data.is_empty() {
            return Ok(*size);
        }

        if !self.writable {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} was opened read-only", self.path.display()),
            )));
        }

        let offset = *size;
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut guard = self.file.write();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        if self.file.read().is_none() {
            return Err(StorageError::Closed);
        }
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(StorageError::Closed)?;
        if self.writable {
            file.sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(mut file) = self.file.write().take() else {
            return Ok(());
        };
        if self.writable {
            file.flush()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.read().is_none()
    }
}

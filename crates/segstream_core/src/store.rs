//! Where container streams live.
//!
//! A [`StreamStore`] maps a [`StreamId`] and a [`StreamRole`] to a storage
//! backend. [`DirectoryStore`] keeps each stream in its own file,
//! `<root>/<id>.<suffix>`; [`MemoryStore`] keeps them in shared buffers.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::provider::CompoundProvider;
use crate::reader::CompoundReader;
use crate::triad::Triad;
use crate::types::{StreamId, StreamRole};
use crate::writer::ContainerWriter;
use parking_lot::Mutex;
use segstream_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Source of the backends that make up containers.
pub trait StreamStore {
    /// Creates a new, empty stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream already exists or cannot be created.
    fn create(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>>;

    /// Opens an existing stream for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream does not exist or cannot be opened.
    fn open(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>>;

    /// Returns `true` if the container's data stream exists.
    fn exists(&self, id: &StreamId) -> bool;
}

/// File-per-stream store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    lock_writer: bool,
}

impl DirectoryStore {
    /// Creates a store rooted at `root` with default settings.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, &Config::default())
    }

    /// Creates a store rooted at `root`.
    ///
    /// With [`Config::lock_writer`] set, creating a data stream takes an
    /// exclusive advisory lock on its file for as long as the writer holds it.
    #[must_use]
    pub fn with_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            root: root.into(),
            lock_writer: config.lock_writer,
        }
    }

    /// The directory holding the stream files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one stream file.
    #[must_use]
    pub fn path_of(&self, id: &StreamId, role: StreamRole) -> PathBuf {
        self.root.join(format!("{}.{}", id, role.suffix()))
    }
}

impl StreamStore for DirectoryStore {
    fn create(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_of(id, role);
        let backend = FileBackend::create(&path)?;
        if self.lock_writer && role == StreamRole::Data {
            backend.lock_exclusive()?;
        }
        debug!(path = %path.display(), %role, "stream created");
        Ok(Box::new(backend))
    }

    fn open(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>> {
        let path = self.path_of(id, role);
        Ok(Box::new(FileBackend::open_read_only(&path)?))
    }

    fn exists(&self, id: &StreamId) -> bool {
        self.path_of(id, StreamRole::Data).exists()
    }
}

/// In-memory store.
///
/// Backends handed out by [`StreamStore::open`] share their buffer with the
/// writer, so readers see everything written so far.
#[derive(Debug, Default)]
pub struct MemoryStore {
    streams: Mutex<HashMap<(StreamId, StreamRole), InMemoryBackend>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of all containers with a data stream, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self
            .streams
            .lock()
            .keys()
            .filter(|(_, role)| *role == StreamRole::Data)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl StreamStore for MemoryStore {
    fn create(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>> {
        let mut streams = self.streams.lock();
        let key = (id.clone(), role);
        if streams.contains_key(&key) {
            return Err(CoreError::invalid_state(format!(
                "{role} stream of {id} already exists"
            )));
        }
        let backend = InMemoryBackend::new();
        let handle = backend.share();
        streams.insert(key, backend);
        Ok(Box::new(handle))
    }

    fn open(&self, id: &StreamId, role: StreamRole) -> CoreResult<Box<dyn StorageBackend>> {
        let streams = self.streams.lock();
        let backend = streams.get(&(id.clone(), role)).ok_or_else(|| {
            CoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{role} stream of {id} not found"),
            ))
        })?;
        Ok(Box::new(backend.share()))
    }

    fn exists(&self, id: &StreamId) -> bool {
        self.streams
            .lock()
            .contains_key(&(id.clone(), StreamRole::Data))
    }
}

/// Collects the three backends of a container, closing the ones already
/// obtained if a later one fails.
fn triad_from<F>(mut get: F) -> CoreResult<Triad>
where
    F: FnMut(StreamRole) -> CoreResult<Box<dyn StorageBackend>>,
{
    let mut taken: Vec<Box<dyn StorageBackend>> = Vec::with_capacity(StreamRole::ALL.len());
    for role in StreamRole::ALL {
        match get(role) {
            Ok(backend) => taken.push(backend),
            Err(err) => {
                for backend in &mut taken {
                    if let Err(close_err) = backend.close() {
                        warn!(error = %close_err, "failed to release stream");
                    }
                }
                return Err(err);
            }
        }
    }
    let mut taken = taken.into_iter();
    match (taken.next(), taken.next(), taken.next()) {
        (Some(data), Some(boundary), Some(segment)) => Ok(Triad::new(data, boundary, segment)),
        _ => Err(CoreError::invalid_state("incomplete stream triad")),
    }
}

/// Creates a new container and returns its writer.
///
/// # Errors
///
/// Returns an error if any of the three streams cannot be created, or if the
/// data stream is locked by another writer.
pub fn create_writer(
    store: &dyn StreamStore,
    id: &StreamId,
    config: &Config,
) -> CoreResult<ContainerWriter> {
    let triad = triad_from(|role| store.create(id, role))?;
    ContainerWriter::new(triad, config)
}

/// Opens an existing container for reading.
///
/// # Errors
///
/// Returns an error if a stream is missing or the indexes are inconsistent
/// with the data.
pub fn open_reader(store: &dyn StreamStore, id: &StreamId) -> CoreResult<CompoundReader> {
    let triad = triad_from(|role| store.open(id, role))?;
    CompoundReader::open(triad)
}

/// Opens an existing container behind the provider interface.
///
/// # Errors
///
/// Same as [`open_reader`].
pub fn open_provider(store: &dyn StreamStore, id: &StreamId) -> CoreResult<CompoundProvider> {
    open_reader(store, id).map(CompoundProvider::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InputStreamProvider;
    use crate::writer::{SegmentSink, SegmentWriter};
    use segstream_storage::StorageError;
    use tempfile::tempdir;

    fn write_lines(store: &dyn StreamStore, id: &StreamId, entries: &[&[u8]]) {
        let mut writer = create_writer(store, id, &Config::default()).unwrap();
        let segment_writer = SegmentWriter::default();
        for entry in entries {
            segment_writer.write(*entry, &mut writer, false).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn directory_store_file_names() {
        let store = DirectoryStore::new("/tmp/containers");
        let id = StreamId::new("000123");
        assert_eq!(
            store.path_of(&id, StreamRole::Data),
            PathBuf::from("/tmp/containers/000123.dat")
        );
        assert_eq!(
            store.path_of(&id, StreamRole::BoundaryIndex),
            PathBuf::from("/tmp/containers/000123.bdy.idx")
        );
        assert_eq!(
            store.path_of(&id, StreamRole::SegmentIndex),
            PathBuf::from("/tmp/containers/000123.seg.idx")
        );
    }

    #[test]
    fn directory_round_trip() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("store"));
        let id = StreamId::new("s1");

        assert!(!store.exists(&id));
        write_lines(&store, &id, &[b"a\nb\n", b"c\n"]);
        assert!(store.exists(&id));

        let mut provider = open_provider(&store, &id).unwrap();
        assert_eq!(provider.stream_count(), 2);
        let segments = provider.segment_input_stream(0).unwrap();
        assert_eq!(segments.segment_count(), 2);
        assert_eq!(segments.read_segment(1).unwrap(), b"b\n");
        provider.close().unwrap();
    }

    #[test]
    fn directory_refuses_second_container_with_same_id() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let id = StreamId::new("dup");
        write_lines(&store, &id, &[b"x"]);

        let result = create_writer(&store, &id, &Config::default());
        assert!(matches!(result, Err(CoreError::Storage(StorageError::Io(_)))));
    }

    #[test]
    fn directory_writer_holds_lock() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let id = StreamId::new("locked");
        let _writer = create_writer(&store, &id, &Config::default()).unwrap();

        let intruder = FileBackend::open(&store.path_of(&id, StreamRole::Data)).unwrap();
        assert!(matches!(
            intruder.lock_exclusive(),
            Err(StorageError::Locked { .. })
        ));
    }

    #[test]
    fn missing_container_fails_to_open() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let result = open_reader(&store, &StreamId::new("absent"));
        assert!(matches!(result, Err(CoreError::Storage(StorageError::Io(_)))));
    }

    #[test]
    fn memory_store_shares_buffers() {
        let store = MemoryStore::new();
        let id = StreamId::new("mem");
        write_lines(&store, &id, &[b"one\ntwo\nthree\n"]);

        let mut reader = open_reader(&store, &id).unwrap();
        assert_eq!(reader.input_stream_count(), 1);
        let stream = reader.input_stream(0).unwrap();
        assert_eq!(stream.segment_count(), 3);
        assert_eq!(store.ids(), vec![id.clone()]);
    }

    #[test]
    fn memory_store_rejects_duplicate_and_missing() {
        let store = MemoryStore::new();
        let id = StreamId::new("m");
        store.create(&id, StreamRole::Data).unwrap();
        assert!(matches!(
            store.create(&id, StreamRole::Data),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            store.open(&id, StreamRole::SegmentIndex),
            Err(CoreError::Io(_))
        ));
    }
}

//! Test fixtures for container tests.
//!
//! Provides helpers for creating containers backed by memory or by a
//! temporary directory.

use segstream_core::{
    create_writer, open_provider, open_reader, CompoundProvider, CompoundReader, Config,
    ContainerWriter, DirectoryStore, MemoryStore, SegmentSink, SegmentWriter, StreamId,
    StreamStore,
};
use std::path::Path;
use tempfile::TempDir;

/// Id given to the container of every [`TestContainer`].
pub const TEST_CONTAINER_ID: &str = "test";

/// A test container with automatic cleanup.
pub struct TestContainer {
    store: Box<dyn StreamStore>,
    id: StreamId,
    config: Config,
    _temp_dir: Option<TempDir>,
}

impl TestContainer {
    /// Creates a container in memory.
    pub fn memory() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            id: StreamId::new(TEST_CONTAINER_ID),
            config: Config::default(),
            _temp_dir: None,
        }
    }

    /// Creates a container in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a container in a temporary directory with a custom config.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = DirectoryStore::with_config(temp_dir.path(), &config);
        Self {
            store: Box::new(store),
            id: StreamId::new(TEST_CONTAINER_ID),
            config,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Replaces the config used by [`writer`](Self::writer) and
    /// [`write_entries`](Self::write_entries).
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns the store holding the container.
    pub fn store(&self) -> &dyn StreamStore {
        self.store.as_ref()
    }

    /// Returns the container id.
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Returns the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the temporary directory, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Creates the container and returns its writer.
    pub fn writer(&self) -> ContainerWriter {
        create_writer(self.store(), &self.id, &self.config).expect("Failed to create writer")
    }

    /// Opens the container for reading.
    pub fn reader(&self) -> CompoundReader {
        open_reader(self.store(), &self.id).expect("Failed to open reader")
    }

    /// Opens the container as an input stream provider.
    pub fn provider(&self) -> CompoundProvider {
        open_provider(self.store(), &self.id).expect("Failed to open provider")
    }

    /// Writes every input as one entry through a [`SegmentWriter`], so
    /// segments follow the detected content type.
    pub fn write_entries<I: AsRef<[u8]>>(&self, inputs: &[I]) {
        let mut writer = self.writer();
        let segment_writer = SegmentWriter::new(self.config.clone());
        for input in inputs {
            segment_writer
                .write(input.as_ref(), &mut writer, false)
                .expect("Failed to write entry");
        }
        writer.close().expect("Failed to close writer");
    }

    /// Writes entries whose segments are given explicitly.
    ///
    /// Empty segments other than a lone one collapse into their neighbours,
    /// since a boundary at an already recorded position is ignored.
    pub fn write_segmented<E, S>(&self, entries: &[E])
    where
        E: AsRef<[S]>,
        S: AsRef<[u8]>,
    {
        let mut writer = self.writer();
        for segments in entries {
            writer.put_next_entry().expect("Failed to start entry");
            for (k, segment) in segments.as_ref().iter().enumerate() {
                if k > 0 {
                    writer.add_segment().expect("Failed to add segment");
                }
                writer
                    .write_all(segment.as_ref())
                    .expect("Failed to write segment");
            }
            writer.close_entry().expect("Failed to close entry");
        }
        writer.close().expect("Failed to close writer");
    }
}

/// Runs a test with a temporary file-backed container.
pub fn with_temp_container<F, R>(f: F) -> R
where
    F: FnOnce(&TestContainer) -> R,
{
    let container = TestContainer::file();
    f(&container)
}

/// Runs a test with an in-memory container.
pub fn with_memory_container<F, R>(f: F) -> R
where
    F: FnOnce(&TestContainer) -> R,
{
    let container = TestContainer::memory();
    f(&container)
}

/// Test data builders for common scenarios.
pub mod scenarios {
    use super::*;

    /// Text of `line_count` lines numbered from `first`.
    pub fn numbered_lines(first: usize, line_count: usize) -> String {
        (first..first + line_count)
            .map(|i| format!("line {i}\n"))
            .collect()
    }

    /// XML document with one `<record>` child per entry of `values`.
    pub fn record_document(values: &[&str]) -> String {
        let mut doc = String::from("<?xml version=\"1.0\"?>\n<records>");
        for value in values {
            doc.push_str("<record>");
            doc.push_str(value);
            doc.push_str("</record>");
        }
        doc.push_str("</records>\n");
        doc
    }

    /// Creates a container of `entry_count` text entries with
    /// `lines_per_entry` lines each.
    pub fn lines_container(entry_count: usize, lines_per_entry: usize) -> TestContainer {
        let container = TestContainer::memory();
        let inputs: Vec<String> = (0..entry_count)
            .map(|entry| numbered_lines(entry * lines_per_entry, lines_per_entry))
            .collect();
        container.write_entries(&inputs);
        container
    }

    /// Creates a container holding a text entry, an XML entry, and an empty
    /// entry, in that order.
    pub fn mixed_container() -> TestContainer {
        let container = TestContainer::memory();
        container.write_entries(&[
            numbered_lines(0, 3),
            record_document(&["a", "b"]),
            String::new(),
        ]);
        container
    }
}

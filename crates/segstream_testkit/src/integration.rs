//! Cross-crate integration test helpers.
//!
//! Provides a harness that writes entries while remembering them, then
//! checks every read path of the container against what was written.

use crate::fixtures::TestContainer;
use segstream_core::{
    ContainerWriter, InputStreamProvider, SegmentSelection, SegmentSink, SegmentWriter,
};
use segstream_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A test harness for integration testing.
pub struct ContainerHarness {
    /// The container under test.
    pub container: TestContainer,
    writer: Option<ContainerWriter>,
    segment_writer: SegmentWriter,
    entries: Vec<Vec<u8>>,
    segments: Vec<Option<Vec<Vec<u8>>>>,
}

impl ContainerHarness {
    /// Creates a harness over an in-memory container.
    pub fn new() -> Self {
        Self::with_container(TestContainer::memory())
    }

    /// Creates a harness over a file-backed container.
    pub fn file() -> Self {
        Self::with_container(TestContainer::file())
    }

    fn with_container(container: TestContainer) -> Self {
        let writer = container.writer();
        let segment_writer = SegmentWriter::new(container.config().clone());
        Self {
            container,
            writer: Some(writer),
            segment_writer,
            entries: Vec::new(),
            segments: Vec::new(),
        }
    }

    fn writer(&mut self) -> &mut ContainerWriter {
        self.writer.as_mut().expect("Harness writer already finished")
    }

    /// Writes `input` as one entry through the segment writer. Returns the
    /// entry ordinal.
    pub fn put_input(&mut self, input: &[u8]) -> u64 {
        let segment_writer = self.segment_writer.clone();
        segment_writer
            .write(input, self.writer(), false)
            .expect("Failed to write entry");
        self.entries.push(input.to_vec());
        self.segments.push(None);
        self.entries.len() as u64 - 1
    }

    /// Writes one entry made of the given non-empty segments. Returns the
    /// entry ordinal.
    pub fn put_segments(&mut self, segments: &[Vec<u8>]) -> u64 {
        let writer = self.writer();
        writer.put_next_entry().expect("Failed to start entry");
        for (k, segment) in segments.iter().enumerate() {
            if k > 0 {
                writer.add_segment().expect("Failed to add segment");
            }
            writer.write_all(segment).expect("Failed to write segment");
        }
        writer.close_entry().expect("Failed to close entry");
        self.entries.push(segments.concat());
        self.segments.push(Some(segments.to_vec()));
        self.entries.len() as u64 - 1
    }

    /// Closes the writer. Further puts panic.
    pub fn finish(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.close().expect("Failed to close writer");
        }
    }

    /// Verifies every tracked entry through the compound reader, the
    /// nested reader, and the provider.
    pub fn verify_all(&mut self) {
        self.finish();

        let mut reader = self.container.reader();
        assert_eq!(reader.input_stream_count(), self.tracked_count() as u64);
        reader.nested().validate().expect("Invalid boundary index");
        reader
            .segment_index()
            .validate()
            .expect("Invalid segment index");

        for (ordinal, expected) in self.entries.iter().enumerate() {
            let ordinal = ordinal as u64;
            let stream = reader.input_stream(ordinal).expect("Failed to open entry");
            let range = stream.range();

            let mut whole = Vec::new();
            stream
                .selected(&SegmentSelection::new())
                .expect("Failed to select segments")
                .read_to_end(&mut whole)
                .expect("Failed to read entry");
            assert_eq!(&whole, expected, "Entry data mismatch for {ordinal}");

            let mut joined = Vec::new();
            for k in 0..stream.segment_count() {
                let segment_range = stream.segment_range(k).expect("Missing segment");
                assert!(range.start <= segment_range.start && segment_range.end <= range.end);
                joined.extend(stream.read_segment(k).expect("Failed to read segment"));
            }
            assert_eq!(&joined, expected, "Segment data mismatch for {ordinal}");

            if let Some(segments) = &self.segments[ordinal as usize] {
                assert_eq!(stream.segment_count(), segments.len() as u64);
                for (k, segment) in segments.iter().enumerate() {
                    assert_eq!(&stream.read_segment(k as u64).unwrap(), segment);
                }
            }
        }
        reader.close().expect("Failed to close reader");

        let mut provider = self.container.provider();
        assert_eq!(provider.stream_count(), self.tracked_count() as u64);
        for (ordinal, expected) in self.entries.iter().enumerate() {
            let mut bytes = Vec::new();
            provider
                .stream(ordinal as u64)
                .expect("Failed to open stream")
                .read_to_end(&mut bytes)
                .expect("Failed to read stream");
            assert_eq!(&bytes, expected, "Provider data mismatch for {ordinal}");
        }
        provider.close().expect("Failed to close provider");
    }

    /// Returns the count of tracked entries.
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ContainerHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts close calls on a [`WatchedBackend`].
#[derive(Debug, Clone, Default)]
pub struct CloseWatch(Arc<AtomicUsize>);

impl CloseWatch {
    /// Number of times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` once `close` was called at least once.
    pub fn closed(&self) -> bool {
        self.close_calls() > 0
    }
}

/// In-memory backend recording close calls, optionally failing them.
#[derive(Debug)]
pub struct WatchedBackend {
    inner: InMemoryBackend,
    fail_close: bool,
    handle: CloseWatch,
}

impl WatchedBackend {
    /// Creates a backend over `data` whose close succeeds.
    pub fn new(data: Vec<u8>) -> (Self, CloseWatch) {
        Self::build(data, false)
    }

    /// Creates a backend over `data` whose close fails.
    pub fn failing_close(data: Vec<u8>) -> (Self, CloseWatch) {
        Self::build(data, true)
    }

    fn build(data: Vec<u8>, fail_close: bool) -> (Self, CloseWatch) {
        let handle = CloseWatch::default();
        let backend = Self {
            inner: InMemoryBackend::with_data(data),
            fail_close,
            handle: handle.clone(),
        };
        (backend, handle)
    }
}

impl StorageBackend for WatchedBackend {
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
        self.handle.0.fetch_add(1, Ordering::SeqCst);
        self.inner.close()?;
        if self.fail_close {
            return Err(StorageError::Io(std::io::Error::other("injected close failure")));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

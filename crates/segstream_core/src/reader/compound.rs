//! Entries and their segments, through one handle.

use super::nested::NestedReader;
use super::segment::SegmentStream;
use crate::error::CoreResult;
use crate::index::OffsetIndex;
use crate::triad::{CloseErrors, Triad};
use crate::types::StreamRole;
use tracing::warn;

/// Reader over a complete container.
///
/// Wraps a [`NestedReader`] and the segment index. Every entry is handed out
/// as a [`SegmentStream`] that borrows the reader, so at most one entry is in
/// use at a time.
///
/// # Example
///
/// ```rust
/// use segstream_core::{CompoundReader, Config, ContainerWriter, SegmentSink, SegmentWriter, Triad};
/// use segstream_storage::InMemoryBackend;
///
/// let (data, boundary, segment) = (InMemoryBackend::new(), InMemoryBackend::new(), InMemoryBackend::new());
/// let readers = Triad::new(Box::new(data.share()), Box::new(boundary.share()), Box::new(segment.share()));
///
/// let triad = Triad::new(Box::new(data), Box::new(boundary), Box::new(segment));
/// let mut writer = ContainerWriter::new(triad, &Config::default()).unwrap();
/// SegmentWriter::default().write(&b"a\nb\n"[..], &mut writer, true).unwrap();
///
/// let mut reader = CompoundReader::open(readers).unwrap();
/// let entry = reader.next_input_stream(0).unwrap();
/// assert_eq!(entry.segment_count(), 2);
/// assert_eq!(entry.read_segment(1).unwrap(), b"b\n");
/// ```
pub struct CompoundReader {
    nested: NestedReader,
    segments: OffsetIndex,
    closed: bool,
}

impl CompoundReader {
    /// Opens a container.
    ///
    /// # Errors
    ///
    /// Returns any validation error from [`NestedReader::open`] or from
    /// opening the segment index. Streams already taken over are closed
    /// before returning.
    pub fn open(triad: Triad) -> CoreResult<Self> {
        let Triad {
            data,
            boundary,
            segment,
        } = triad;
        let mut nested = NestedReader::open(data, boundary)?;
        match OffsetIndex::open(segment) {
            Ok(segments) => Ok(Self::from_parts(nested, segments)),
            Err(err) => {
                if let Err(close_err) = nested.close() {
                    warn!(error = %close_err, "failed to close container after open failure");
                }
                Err(err)
            }
        }
    }

    /// Combines an entry reader with a segment index.
    #[must_use]
    pub fn from_parts(nested: NestedReader, segments: OffsetIndex) -> Self {
        Self {
            nested,
            segments,
            closed: false,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn input_stream_count(&self) -> u64 {
        self.nested.entry_count()
    }

    /// Opens the entry `skip` positions after the last one opened.
    ///
    /// # Errors
    ///
    /// See [`NestedReader::next_entry`].
    pub fn next_input_stream(&mut self, skip: u64) -> CoreResult<SegmentStream<'_>> {
        self.nested.next_entry(skip)?;
        self.current_stream()
    }

    /// Opens entry `ordinal`.
    ///
    /// # Errors
    ///
    /// See [`NestedReader::open_entry`].
    pub fn input_stream(&mut self, ordinal: u64) -> CoreResult<SegmentStream<'_>> {
        self.nested.open_entry(ordinal)?;
        self.current_stream()
    }

    fn current_stream(&mut self) -> CoreResult<SegmentStream<'_>> {
        let range = self.nested.entry_range()?;
        self.nested.close_entry()?;
        SegmentStream::new(self.nested.data(), &self.segments, range)
    }

    /// The entry-level reader.
    #[must_use]
    pub fn nested(&self) -> &NestedReader {
        &self.nested
    }

    /// The entry-level reader, for cursor-based byte access.
    pub fn nested_mut(&mut self) -> &mut NestedReader {
        &mut self.nested
    }

    /// The segment index.
    #[must_use]
    pub fn segment_index(&self) -> &OffsetIndex {
        &self.segments
    }

    /// Returns `true` once the reader has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes all three streams. Idempotent.
    ///
    /// The segment index is closed even if closing the entry reader fails.
    ///
    /// # Errors
    ///
    /// Returns the first close failure.
    pub fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut errors = CloseErrors::new();
        errors.record("entry reader", self.nested.close());
        errors.record(StreamRole::SegmentIndex, self.segments.close());
        errors.finish()
    }
}

impl std::fmt::Debug for CompoundReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundReader")
            .field("nested", &self.nested)
            .field("segments", &self.segments)
            .field("closed", &self.closed)
            .finish()
    }
}

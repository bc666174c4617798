//! The consumer-facing view of a stored stream.
//!
//! Code that pages through or processes stored streams only sees an
//! [`InputStreamProvider`]; it never handles the three container streams
//! directly.

use crate::error::{CoreError, CoreResult};
use crate::index::OffsetIndex;
use crate::reader::{CompoundReader, RangeReader, SegmentStream};
use crate::triad::CloseErrors;
use crate::types::{ByteRange, StreamRole};
use segstream_storage::{InMemoryBackend, StorageBackend};

/// Random access to the streams held by one container.
///
/// Stream numbers are **zero-based**: valid numbers are
/// `0..stream_count()`.
pub trait InputStreamProvider {
    /// Number of streams available.
    fn stream_count(&self) -> u64;

    /// Bytes of stream `stream_no`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if `stream_no >= stream_count()`,
    /// or [`CoreError::InvalidState`] after [`close`](Self::close).
    fn stream(&mut self, stream_no: u64) -> CoreResult<RangeReader<'_>>;

    /// Segments of stream `stream_no`.
    ///
    /// # Errors
    ///
    /// Same as [`stream`](Self::stream).
    fn segment_input_stream(&mut self, stream_no: u64) -> CoreResult<SegmentStream<'_>>;

    /// Releases every underlying resource. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first close failure.
    fn close(&mut self) -> CoreResult<()>;
}

/// Provider over a complete container.
#[derive(Debug)]
pub struct CompoundProvider {
    reader: CompoundReader,
}

impl CompoundProvider {
    /// Wraps an open container reader.
    #[must_use]
    pub fn new(reader: CompoundReader) -> Self {
        Self { reader }
    }

    /// The wrapped reader.
    #[must_use]
    pub fn reader(&self) -> &CompoundReader {
        &self.reader
    }

    /// Unwraps the reader.
    #[must_use]
    pub fn into_inner(self) -> CompoundReader {
        self.reader
    }
}

impl InputStreamProvider for CompoundProvider {
    fn stream_count(&self) -> u64 {
        self.reader.input_stream_count()
    }

    fn stream(&mut self, stream_no: u64) -> CoreResult<RangeReader<'_>> {
        self.reader.nested().entry_reader(stream_no)
    }

    fn segment_input_stream(&mut self, stream_no: u64) -> CoreResult<SegmentStream<'_>> {
        self.reader.input_stream(stream_no)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.reader.close()
    }
}

/// Provider over a bare data stream with no indexes.
///
/// Exposes exactly one stream made of one segment.
pub struct RawProvider {
    data: Box<dyn StorageBackend>,
    no_segments: OffsetIndex,
    size: u64,
    closed: bool,
}

impl RawProvider {
    /// Wraps a data stream.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the size cannot be read.
    pub fn new(data: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let size = data.size()?;
        let no_segments = OffsetIndex::open(Box::new(InMemoryBackend::new()))?;
        Ok(Self {
            data,
            no_segments,
            size,
            closed: false,
        })
    }

    fn range(&self, stream_no: u64) -> CoreResult<ByteRange> {
        if self.closed {
            return Err(CoreError::invalid_state("provider is closed"));
        }
        if stream_no != 0 {
            return Err(CoreError::entry_out_of_range(stream_no, 1));
        }
        Ok(ByteRange::new(0, self.size))
    }
}

impl InputStreamProvider for RawProvider {
    fn stream_count(&self) -> u64 {
        1
    }

    fn stream(&mut self, stream_no: u64) -> CoreResult<RangeReader<'_>> {
        let range = self.range(stream_no)?;
        Ok(RangeReader::new(self.data.as_ref(), range))
    }

    fn segment_input_stream(&mut self, stream_no: u64) -> CoreResult<SegmentStream<'_>> {
        let range = self.range(stream_no)?;
        SegmentStream::new(self.data.as_ref(), &self.no_segments, range)
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut errors = CloseErrors::new();
        errors.record(StreamRole::Data, self.data.close());
        errors.record(StreamRole::SegmentIndex, self.no_segments.close());
        errors.finish()
    }
}

impl std::fmt::Debug for RawProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawProvider")
            .field("size", &self.size)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

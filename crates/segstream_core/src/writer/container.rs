//! Append-only container writer.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::OffsetIndexWriter;
use crate::triad::{CloseErrors, Triad};
use crate::types::StreamRole;
use segstream_storage::StorageBackend;
use tracing::{debug, warn};

/// Destination of a [`SegmentWriter`](super::SegmentWriter).
///
/// The sink accepts entries one at a time. Segment boundaries are absolute
/// data stream positions inside the open entry.
pub trait SegmentSink {
    /// Starts a new entry at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if an entry is already open or
    /// the sink is closed.
    fn put_next_entry(&mut self) -> CoreResult<()>;

    /// Appends bytes to the open entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open, or a storage
    /// error.
    fn write_all(&mut self, bytes: &[u8]) -> CoreResult<()>;

    /// Current data stream position.
    fn position(&self) -> u64;

    /// Records a segment boundary at the current position.
    ///
    /// # Errors
    ///
    /// See [`SegmentSink::add_segment_at`].
    fn add_segment(&mut self) -> CoreResult<()> {
        let position = self.position();
        self.add_segment_at(position)
    }

    /// Records a segment boundary at an already written position of the
    /// open entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open or the
    /// position lies outside the bytes written so far for the entry.
    fn add_segment_at(&mut self, position: u64) -> CoreResult<()>;

    /// Ends the open entry. Does nothing if no entry is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the boundary index cannot be written.
    fn close_entry(&mut self) -> CoreResult<()>;

    /// Flushes all streams.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    fn flush(&mut self) -> CoreResult<()>;

    /// Ends any open entry and releases every stream. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first failure; all streams are closed regardless.
    fn close(&mut self) -> CoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    EntryClosed,
    EntryOpen { start: u64, last_boundary: u64 },
    Closed,
}

/// Writes entries into the three streams of a container.
///
/// The boundary index receives `0` when the writer is created and the end
/// offset of every entry when it is closed, so a container with `n` entries
/// has `n + 1` boundary offsets. Segment boundaries go to the segment index
/// in the order they are added.
///
/// # Example
///
/// ```rust
/// use segstream_core::{Config, ContainerWriter, SegmentSink, Triad};
/// use segstream_storage::InMemoryBackend;
///
/// let triad = Triad::new(
///     Box::new(InMemoryBackend::new()),
///     Box::new(InMemoryBackend::new()),
///     Box::new(InMemoryBackend::new()),
/// );
/// let mut writer = ContainerWriter::new(triad, &Config::default()).unwrap();
/// writer.put_next_entry().unwrap();
/// writer.write_all(b"first\n").unwrap();
/// writer.add_segment().unwrap();
/// writer.write_all(b"second\n").unwrap();
/// writer.close_entry().unwrap();
/// writer.close().unwrap();
/// assert_eq!(writer.entry_count(), 1);
/// ```
pub struct ContainerWriter {
    data: Box<dyn StorageBackend>,
    boundaries: OffsetIndexWriter,
    segments: OffsetIndexWriter,
    state: WriterState,
    position: u64,
    entry_count: u64,
    sync_on_close: bool,
}

impl ContainerWriter {
    /// Creates a writer over three empty streams.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if any stream already holds data,
    /// or a storage error.
    pub fn new(triad: Triad, config: &Config) -> CoreResult<Self> {
        let Triad {
            data,
            boundary,
            segment,
        } = triad;

        let size = data.size()?;
        if size != 0 {
            return Err(CoreError::invalid_state(format!(
                "data stream already holds {size} bytes"
            )));
        }
        let mut boundaries = OffsetIndexWriter::new(boundary)?;
        let segments = OffsetIndexWriter::new(segment)?;
        boundaries.push(0)?;

        debug!("container writer opened");
        Ok(Self {
            data,
            boundaries,
            segments,
            state: WriterState::EntryClosed,
            position: 0,
            entry_count: 0,
            sync_on_close: config.sync_on_close,
        })
    }

    /// Number of completed entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of segment boundaries written so far.
    #[must_use]
    pub fn segment_boundary_count(&self) -> u64 {
        self.segments.len()
    }

    /// Returns `true` while an entry is open.
    #[must_use]
    pub fn is_entry_open(&self) -> bool {
        matches!(self.state, WriterState::EntryOpen { .. })
    }

    /// Returns `true` once the writer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    fn ensure_not_closed(&self) -> CoreResult<()> {
        if self.state == WriterState::Closed {
            return Err(CoreError::invalid_state("writer is closed"));
        }
        Ok(())
    }
}

impl SegmentSink for ContainerWriter {
    fn put_next_entry(&mut self) -> CoreResult<()> {
        match self.state {
            WriterState::EntryClosed => {
                self.state = WriterState::EntryOpen {
                    start: self.position,
                    last_boundary: self.position,
                };
                Ok(())
            }
            WriterState::EntryOpen { .. } => {
                Err(CoreError::invalid_state("previous entry is still open"))
            }
            WriterState::Closed => Err(CoreError::invalid_state("writer is closed")),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> CoreResult<()> {
        if !self.is_entry_open() {
            self.ensure_not_closed()?;
            return Err(CoreError::invalid_state("no entry is open"));
        }
        self.data.append(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn add_segment_at(&mut self, position: u64) -> CoreResult<()> {
        let WriterState::EntryOpen {
            start,
            last_boundary,
        } = self.state
        else {
            self.ensure_not_closed()?;
            return Err(CoreError::invalid_state("no entry is open"));
        };

        // A boundary at the entry start or a repeated boundary would only
        // produce an empty segment.
        if position == start || position == last_boundary {
            return Ok(());
        }
        if position < last_boundary || position > self.position {
            return Err(CoreError::invalid_state(format!(
                "segment boundary {position} outside [{last_boundary}, {}]",
                self.position
            )));
        }

        self.segments.push(position)?;
        self.state = WriterState::EntryOpen {
            start,
            last_boundary: position,
        };
        Ok(())
    }

    fn close_entry(&mut self) -> CoreResult<()> {
        match self.state {
            WriterState::EntryOpen { start, .. } => {
                self.boundaries.push(self.position)?;
                self.entry_count += 1;
                self.state = WriterState::EntryClosed;
                debug!(
                    entry = self.entry_count - 1,
                    bytes = self.position - start,
                    "entry closed"
                );
                Ok(())
            }
            WriterState::EntryClosed => Ok(()),
            WriterState::Closed => Err(CoreError::invalid_state("writer is closed")),
        }
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.ensure_not_closed()?;
        self.data.flush()?;
        self.boundaries.backend_mut().flush()?;
        self.segments.backend_mut().flush()?;
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }

        let mut errors = CloseErrors::new();
        if self.is_entry_open() {
            errors.record("open entry", self.close_entry());
        }
        if self.sync_on_close {
            errors.record(StreamRole::Data, self.data.sync());
            errors.record(StreamRole::BoundaryIndex, self.boundaries.backend_mut().sync());
            errors.record(StreamRole::SegmentIndex, self.segments.backend_mut().sync());
        }
        errors.record(StreamRole::Data, self.data.close());
        errors.record(StreamRole::BoundaryIndex, self.boundaries.backend_mut().close());
        errors.record(StreamRole::SegmentIndex, self.segments.backend_mut().close());
        self.state = WriterState::Closed;

        debug!(
            entries = self.entry_count,
            segment_boundaries = self.segments.len(),
            bytes = self.position,
            "container writer closed"
        );
        errors.finish()
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if self.state != WriterState::Closed {
            if let Err(err) = self.close() {
                warn!(error = %err, "failed to close container writer on drop");
            }
        }
    }
}

impl std::fmt::Debug for ContainerWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerWriter")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("entry_count", &self.entry_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FaultyBackend;
    use segstream_codec::decode_offsets;
    use segstream_storage::InMemoryBackend;

    struct Handles {
        data: InMemoryBackend,
        boundary: InMemoryBackend,
        segment: InMemoryBackend,
    }

    fn writer() -> (ContainerWriter, Handles) {
        let data = InMemoryBackend::new();
        let boundary = InMemoryBackend::new();
        let segment = InMemoryBackend::new();
        let handles = Handles {
            data: data.share(),
            boundary: boundary.share(),
            segment: segment.share(),
        };
        let triad = Triad::new(Box::new(data), Box::new(boundary), Box::new(segment));
        let writer = ContainerWriter::new(triad, &Config::default()).unwrap();
        (writer, handles)
    }

    #[test]
    fn new_writer_records_origin() {
        let (writer, handles) = writer();
        assert_eq!(decode_offsets(&handles.boundary.data()).unwrap(), vec![0]);
        assert_eq!(writer.entry_count(), 0);
        assert_eq!(writer.position(), 0);
    }

    #[test]
    fn entries_and_segments_land_in_indexes() {
        let (mut writer, handles) = writer();

        writer.put_next_entry().unwrap();
        writer.write_all(b"aaa").unwrap();
        writer.add_segment().unwrap();
        writer.write_all(b"bb").unwrap();
        writer.close_entry().unwrap();

        writer.put_next_entry().unwrap();
        writer.write_all(b"cccc").unwrap();
        writer.close_entry().unwrap();
        writer.close().unwrap();

        assert_eq!(handles.data.data(), b"aaabbcccc");
        assert_eq!(decode_offsets(&handles.boundary.data()).unwrap(), vec![0, 5, 9]);
        assert_eq!(decode_offsets(&handles.segment.data()).unwrap(), vec![3]);
        assert_eq!(writer.entry_count(), 2);
    }

    #[test]
    fn empty_entry() {
        let (mut writer, handles) = writer();
        writer.put_next_entry().unwrap();
        writer.close_entry().unwrap();
        writer.close().unwrap();
        assert_eq!(decode_offsets(&handles.boundary.data()).unwrap(), vec![0, 0]);
    }

    #[test]
    fn boundary_at_entry_start_is_ignored() {
        let (mut writer, handles) = writer();
        writer.put_next_entry().unwrap();
        writer.add_segment().unwrap();
        writer.write_all(b"xy").unwrap();
        writer.add_segment_at(1).unwrap();
        writer.add_segment_at(1).unwrap();
        writer.close().unwrap();
        assert_eq!(decode_offsets(&handles.segment.data()).unwrap(), vec![1]);
    }

    #[test]
    fn boundary_must_lie_in_written_bytes() {
        let (mut writer, _handles) = writer();
        writer.put_next_entry().unwrap();
        writer.write_all(b"abcdef").unwrap();
        writer.add_segment_at(4).unwrap();

        assert!(matches!(
            writer.add_segment_at(7),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            writer.add_segment_at(2),
            Err(CoreError::InvalidState { .. })
        ));
        writer.close_entry().unwrap();

        writer.put_next_entry().unwrap();
        writer.write_all(b"gh").unwrap();
        assert!(matches!(
            writer.add_segment_at(5),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn cursor_protocol() {
        let (mut writer, _handles) = writer();
        assert!(matches!(
            writer.write_all(b"x"),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            writer.add_segment(),
            Err(CoreError::InvalidState { .. })
        ));
        writer.close_entry().unwrap();

        writer.put_next_entry().unwrap();
        assert!(matches!(
            writer.put_next_entry(),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn close_ends_open_entry_and_is_idempotent() {
        let (mut writer, handles) = writer();
        writer.put_next_entry().unwrap();
        writer.write_all(b"tail").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert_eq!(decode_offsets(&handles.boundary.data()).unwrap(), vec![0, 4]);
        assert!(matches!(
            writer.put_next_entry(),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            writer.write_all(b"x"),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn drop_closes_open_entry() {
        let (mut writer, handles) = writer();
        writer.put_next_entry().unwrap();
        writer.write_all(b"abc").unwrap();
        drop(writer);
        assert_eq!(decode_offsets(&handles.boundary.data()).unwrap(), vec![0, 3]);
    }

    #[test]
    fn refuses_non_empty_streams() {
        let triad = Triad::new(
            Box::new(InMemoryBackend::with_data(b"old".to_vec())),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        );
        assert!(matches!(
            ContainerWriter::new(triad, &Config::default()),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn close_closes_every_stream_on_failure() {
        let (data, data_closed) = FaultyBackend::failing_close(b"");
        let (boundary, boundary_closed) = FaultyBackend::healthy(b"");
        let (segment, segment_closed) = FaultyBackend::healthy(b"");
        let triad = Triad::new(Box::new(data), Box::new(boundary), Box::new(segment));

        let mut writer = ContainerWriter::new(triad, &Config::default()).unwrap();
        writer.put_next_entry().unwrap();
        writer.write_all(b"x").unwrap();

        assert!(writer.close().is_err());
        assert!(data_closed.get());
        assert!(boundary_closed.get());
        assert!(segment_closed.get());
        writer.close().unwrap();
    }
}

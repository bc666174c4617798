//! Random access to the segments of one entry.

use super::range::{RangeReader, SelectedReader};
use super::selection::{SegmentSelection, SelectionMode};
use crate::error::{CoreError, CoreResult};
use crate::index::OffsetIndex;
use crate::types::ByteRange;
use segstream_storage::StorageBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    SegmentClosed,
    SegmentOpen {
        ordinal: u64,
        range: ByteRange,
        pos: u64,
    },
    Closed,
}

/// Segments of one entry.
///
/// The segment index holds absolute boundary offsets for the whole
/// container. The offsets strictly inside the entry's range cut it into
/// segments, so an entry with `k` interior boundaries has `k + 1` segments
/// and an entry without any has exactly one.
///
/// Construction locates the entry's boundaries with two binary searches over
/// the index; after that every segment lookup is at most two positioned
/// reads. The stream borrows its container and does not own any resource.
pub struct SegmentStream<'a> {
    data: &'a dyn StorageBackend,
    index: &'a OffsetIndex,
    range: ByteRange,
    first: u64,
    interior: u64,
    next: u64,
    state: SegmentState,
}

impl<'a> SegmentStream<'a> {
    /// Creates a segment view of `range`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Corrupt`] if `range` lies past the end of the
    /// data stream, or a storage error.
    pub fn new(
        data: &'a dyn StorageBackend,
        index: &'a OffsetIndex,
        range: ByteRange,
    ) -> CoreResult<Self> {
        let size = data.size()?;
        if range.end > size {
            return Err(CoreError::corrupt(format!(
                "entry {range} extends past data size {size}"
            )));
        }

        let first = index.partition_point(0, index.len(), |offset| offset <= range.start)?;
        let end = index.partition_point(first, index.len(), |offset| offset < range.end)?;

        Ok(Self {
            data,
            index,
            range,
            first,
            interior: end - first,
            next: 0,
            state: SegmentState::SegmentClosed,
        })
    }

    /// Byte range of the whole entry.
    #[must_use]
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Number of segments. Always at least one.
    #[must_use]
    pub fn segment_count(&self) -> u64 {
        self.interior + 1
    }

    /// Ordinal that [`next_segment(0)`](Self::next_segment) would open.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Returns `true` once the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == SegmentState::Closed
    }

    /// Byte range of segment `ordinal`, without touching the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] for a missing segment,
    /// [`CoreError::Corrupt`] if the index is inconsistent, or
    /// [`CoreError::InvalidState`] if the stream is closed.
    pub fn segment_range(&self, ordinal: u64) -> CoreResult<ByteRange> {
        if self.is_closed() {
            return Err(CoreError::invalid_state("segment stream is closed"));
        }
        if ordinal >= self.segment_count() {
            return Err(CoreError::segment_out_of_range(ordinal, self.segment_count()));
        }
        let start = if ordinal == 0 {
            self.range.start
        } else {
            self.index.get(self.first + ordinal - 1)?
        };
        let end = if ordinal == self.interior {
            self.range.end
        } else {
            self.index.get(self.first + ordinal)?
        };
        if start > end || start < self.range.start || end > self.range.end {
            return Err(CoreError::corrupt(format!(
                "segment {ordinal} spans [{start}, {end}) outside entry {}",
                self.range
            )));
        }
        Ok(ByteRange::new(start, end))
    }

    /// Ordinal of the segment containing absolute data offset `pos`, or
    /// `None` if `pos` is outside this entry.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or [`CoreError::InvalidState`] if the stream
    /// is closed.
    pub fn segment_at_byte_offset(&self, pos: u64) -> CoreResult<Option<u64>> {
        if self.is_closed() {
            return Err(CoreError::invalid_state("segment stream is closed"));
        }
        if !self.range.contains(pos) {
            return Ok(None);
        }
        let end = self.first + self.interior;
        let found = self
            .index
            .partition_point(self.first, end, |offset| offset <= pos)?;
        Ok(Some(found - self.first))
    }

    /// Opens the segment `skip` positions after the cursor and returns its
    /// ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if a segment is already open or
    /// the stream is closed, and [`CoreError::OutOfRange`] if the target
    /// segment does not exist.
    pub fn next_segment(&mut self, skip: u64) -> CoreResult<u64> {
        self.ensure_ready()?;
        let target = self.next.saturating_add(skip);
        self.open_at(target)
    }

    /// Opens segment `ordinal` directly.
    ///
    /// # Errors
    ///
    /// Same as [`next_segment`](Self::next_segment).
    pub fn open_segment(&mut self, ordinal: u64) -> CoreResult<u64> {
        self.ensure_ready()?;
        self.open_at(ordinal)
    }

    fn ensure_ready(&self) -> CoreResult<()> {
        match self.state {
            SegmentState::SegmentClosed => Ok(()),
            SegmentState::SegmentOpen { ordinal, .. } => Err(CoreError::invalid_state(format!(
                "segment {ordinal} is still open"
            ))),
            SegmentState::Closed => Err(CoreError::invalid_state("segment stream is closed")),
        }
    }

    fn open_at(&mut self, ordinal: u64) -> CoreResult<u64> {
        let range = self.segment_range(ordinal)?;
        self.state = SegmentState::SegmentOpen {
            ordinal,
            range,
            pos: range.start,
        };
        self.next = ordinal + 1;
        Ok(ordinal)
    }

    fn open_range(&self) -> CoreResult<ByteRange> {
        match self.state {
            SegmentState::SegmentOpen { range, .. } => Ok(range),
            _ => Err(CoreError::invalid_state("no segment is open")),
        }
    }

    /// Absolute data offset where the open segment starts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no segment is open.
    pub fn segment_byte_offset_start(&self) -> CoreResult<u64> {
        self.open_range().map(|range| range.start)
    }

    /// Absolute data offset one past the end of the open segment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no segment is open.
    pub fn segment_byte_offset_end(&self) -> CoreResult<u64> {
        self.open_range().map(|range| range.end)
    }

    /// Reads from the open segment. Returns `0` at the end of the segment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no segment is open, or a
    /// storage error.
    pub fn read(&mut self, buf: &mut [u8]) -> CoreResult<usize> {
        let SegmentState::SegmentOpen {
            ordinal,
            range,
            pos,
        } = self.state
        else {
            return Err(CoreError::invalid_state("no segment is open"));
        };
        let len = (buf.len() as u64).min(range.end - pos) as usize;
        if len == 0 {
            return Ok(0);
        }
        let bytes = self.data.read_at(pos, len)?;
        buf[..len].copy_from_slice(&bytes);
        self.state = SegmentState::SegmentOpen {
            ordinal,
            range,
            pos: pos + len as u64,
        };
        Ok(len)
    }

    /// Reads segment `ordinal` in full, independently of the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`segment_range`](Self::segment_range), plus storage errors.
    pub fn read_segment(&self, ordinal: u64) -> CoreResult<Vec<u8>> {
        let range = self.segment_range(ordinal)?;
        Ok(self.data.read_at(range.start, range.len() as usize)?)
    }

    /// Returns an independent reader over segment `ordinal`.
    ///
    /// # Errors
    ///
    /// Same as [`segment_range`](Self::segment_range).
    pub fn segment_reader(&self, ordinal: u64) -> CoreResult<RangeReader<'a>> {
        let range = self.segment_range(ordinal)?;
        Ok(RangeReader::new(self.data, range))
    }

    /// Returns a reader yielding the selected segments in ascending order.
    ///
    /// Adjacent selected segments are read as one range. Excluding segments
    /// costs one index lookup per excluded ordinal, whatever the entry size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if the selection names a segment the
    /// entry does not have, or [`CoreError::InvalidState`] if the stream is
    /// closed.
    pub fn selected(&self, selection: &SegmentSelection) -> CoreResult<SelectedReader<'a>> {
        if self.is_closed() {
            return Err(CoreError::invalid_state("segment stream is closed"));
        }
        if let Some(&last) = selection.listed().last() {
            if last >= self.segment_count() {
                return Err(CoreError::segment_out_of_range(last, self.segment_count()));
            }
        }

        let mut ranges: Vec<ByteRange> = Vec::new();
        match selection.mode() {
            SelectionMode::Only(set) => {
                for &ordinal in set {
                    let range = self.segment_range(ordinal)?;
                    match ranges.last_mut() {
                        Some(previous) if previous.end == range.start => previous.end = range.end,
                        _ => ranges.push(range),
                    }
                }
            }
            SelectionMode::AllExcept(set) => {
                let mut cursor = self.range.start;
                for &ordinal in set {
                    let skipped = self.segment_range(ordinal)?;
                    if skipped.start > cursor {
                        ranges.push(ByteRange::new(cursor, skipped.start));
                    }
                    cursor = cursor.max(skipped.end);
                }
                if cursor < self.range.end {
                    ranges.push(ByteRange::new(cursor, self.range.end));
                }
            }
        }
        Ok(SelectedReader::new(self.data, ranges))
    }

    /// Closes the open segment. Does nothing if none is open.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the stream is closed.
    pub fn close_segment(&mut self) -> CoreResult<()> {
        match self.state {
            SegmentState::SegmentOpen { .. } => {
                self.state = SegmentState::SegmentClosed;
                Ok(())
            }
            SegmentState::SegmentClosed => Ok(()),
            SegmentState::Closed => Err(CoreError::invalid_state("segment stream is closed")),
        }
    }

    /// Closes the stream. Idempotent.
    ///
    /// The underlying streams belong to the container and stay open.
    pub fn close(&mut self) {
        self.state = SegmentState::Closed;
    }
}

impl std::fmt::Debug for SegmentStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentStream")
            .field("range", &self.range)
            .field("segments", &self.segment_count())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

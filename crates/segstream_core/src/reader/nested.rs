//! Random access to the entries of a container.

use super::range::RangeReader;
use crate::error::{CoreError, CoreResult};
use crate::index::OffsetIndex;
use crate::triad::CloseErrors;
use crate::types::{ByteRange, StreamRole};
use segstream_storage::StorageBackend;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    EntryClosed,
    EntryOpen {
        ordinal: u64,
        range: ByteRange,
        pos: u64,
    },
    Closed,
}

/// Reader over the data stream and the boundary index.
///
/// Entry `i` spans `[boundary[i], boundary[i + 1])` of the data stream.
/// Entries are opened one at a time, either relative to the cursor with
/// [`next_entry`](Self::next_entry) or directly with
/// [`open_entry`](Self::open_entry). Ordinals are zero-based.
///
/// An empty boundary index over a non-empty data stream is read as a single
/// entry covering all the data.
pub struct NestedReader {
    data: Box<dyn StorageBackend>,
    boundaries: OffsetIndex,
    data_size: u64,
    entry_count: u64,
    next: u64,
    state: CursorState,
}

impl NestedReader {
    /// Opens a reader and checks that the boundary index fits the data.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the boundary index is not a whole
    /// number of offsets, [`CoreError::Corrupt`] if it does not start at `0`
    /// or its last offset lies past the end of the data, or a storage error.
    pub fn open(data: Box<dyn StorageBackend>, boundary: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let data_size = data.size()?;
        let boundaries = OffsetIndex::open(boundary)?;
        if !boundaries.is_empty() {
            let first = boundaries.get(0)?;
            if first != 0 {
                return Err(CoreError::corrupt(format!(
                    "boundary index starts at {first}, not 0"
                )));
            }
        }

        let entry_count = match boundaries.last()? {
            None if data_size > 0 => 1,
            None => 0,
            Some(last) if last > data_size => {
                return Err(CoreError::corrupt(format!(
                    "boundary index ends at {last} but data stream holds {data_size} bytes"
                )));
            }
            Some(_) => boundaries.len() - 1,
        };

        debug!(entries = entry_count, bytes = data_size, "container opened");
        Ok(Self {
            data,
            boundaries,
            data_size,
            entry_count,
            next: 0,
            state: CursorState::EntryClosed,
        })
    }

    /// Number of entries in the container.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Size of the data stream.
    #[must_use]
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Ordinal that [`next_entry(0)`](Self::next_entry) would open.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Ordinal of the open entry, if any.
    #[must_use]
    pub fn entry_ordinal(&self) -> Option<u64> {
        match self.state {
            CursorState::EntryOpen { ordinal, .. } => Some(ordinal),
            _ => None,
        }
    }

    /// Returns `true` once the reader has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Byte range of entry `ordinal`, without touching the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] for a missing entry,
    /// [`CoreError::Corrupt`] for a decreasing boundary pair, or
    /// [`CoreError::InvalidState`] if the reader is closed.
    pub fn entry_range_at(&self, ordinal: u64) -> CoreResult<ByteRange> {
        if self.is_closed() {
            return Err(CoreError::invalid_state("reader is closed"));
        }
        if ordinal >= self.entry_count {
            return Err(CoreError::entry_out_of_range(ordinal, self.entry_count));
        }
        if self.boundaries.is_empty() {
            return Ok(ByteRange::new(0, self.data_size));
        }
        let start = self.boundaries.get(ordinal)?;
        let end = self.boundaries.get(ordinal + 1)?;
        if start > end {
            return Err(CoreError::corrupt(format!(
                "entry {ordinal} starts at {start} but ends at {end}"
            )));
        }
        Ok(ByteRange::new(start, end))
    }

    /// Opens the entry `skip` positions after the cursor and returns its
    /// ordinal. `next_entry(0)` opens the entry following the last one
    /// opened.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if an entry is already open or
    /// the reader is closed, and [`CoreError::OutOfRange`] if the target
    /// entry does not exist.
    pub fn next_entry(&mut self, skip: u64) -> CoreResult<u64> {
        self.ensure_ready()?;
        let target = self.next.saturating_add(skip);
        self.open_at(target)
    }

    /// Opens entry `ordinal` directly.
    ///
    /// # Errors
    ///
    /// Same as [`next_entry`](Self::next_entry).
    pub fn open_entry(&mut self, ordinal: u64) -> CoreResult<u64> {
        self.ensure_ready()?;
        self.open_at(ordinal)
    }

    fn ensure_ready(&self) -> CoreResult<()> {
        match self.state {
            CursorState::EntryClosed => Ok(()),
            CursorState::EntryOpen { ordinal, .. } => Err(CoreError::invalid_state(format!(
                "entry {ordinal} is still open"
            ))),
            CursorState::Closed => Err(CoreError::invalid_state("reader is closed")),
        }
    }

    fn open_at(&mut self, ordinal: u64) -> CoreResult<u64> {
        let range = self.entry_range_at(ordinal)?;
        self.state = CursorState::EntryOpen {
            ordinal,
            range,
            pos: range.start,
        };
        self.next = ordinal + 1;
        Ok(ordinal)
    }

    /// Byte range of the open entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open.
    pub fn entry_range(&self) -> CoreResult<ByteRange> {
        match self.state {
            CursorState::EntryOpen { range, .. } => Ok(range),
            _ => Err(CoreError::invalid_state("no entry is open")),
        }
    }

    /// Absolute data stream offset where the open entry starts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open.
    pub fn entry_byte_offset_start(&self) -> CoreResult<u64> {
        self.entry_range().map(|range| range.start)
    }

    /// Absolute data stream offset one past the end of the open entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open.
    pub fn entry_byte_offset_end(&self) -> CoreResult<u64> {
        self.entry_range().map(|range| range.end)
    }

    /// Reads from the open entry. Returns `0` at the end of the entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open, or a storage
    /// error.
    pub fn read(&mut self, buf: &mut [u8]) -> CoreResult<usize> {
        let CursorState::EntryOpen {
            ordinal,
            range,
            pos,
        } = self.state
        else {
            return Err(CoreError::invalid_state("no entry is open"));
        };
        let len = (buf.len() as u64).min(range.end - pos) as usize;
        if len == 0 {
            return Ok(0);
        }
        let bytes = self.data.read_at(pos, len)?;
        buf[..len].copy_from_slice(&bytes);
        self.state = CursorState::EntryOpen {
            ordinal,
            range,
            pos: pos + len as u64,
        };
        Ok(len)
    }

    /// Reads the rest of the open entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if no entry is open, or a storage
    /// error.
    pub fn read_entry_to_end(&mut self) -> CoreResult<Vec<u8>> {
        let CursorState::EntryOpen {
            ordinal,
            range,
            pos,
        } = self.state
        else {
            return Err(CoreError::invalid_state("no entry is open"));
        };
        let bytes = self.data.read_at(pos, (range.end - pos) as usize)?;
        self.state = CursorState::EntryOpen {
            ordinal,
            range,
            pos: range.end,
        };
        Ok(bytes)
    }

    /// Returns an independent reader over entry `ordinal`.
    ///
    /// # Errors
    ///
    /// Same as [`entry_range_at`](Self::entry_range_at).
    pub fn entry_reader(&self, ordinal: u64) -> CoreResult<RangeReader<'_>> {
        let range = self.entry_range_at(ordinal)?;
        Ok(RangeReader::new(self.data.as_ref(), range))
    }

    /// Closes the open entry. Does nothing if none is open.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the reader is closed.
    pub fn close_entry(&mut self) -> CoreResult<()> {
        match self.state {
            CursorState::EntryOpen { .. } => {
                self.state = CursorState::EntryClosed;
                Ok(())
            }
            CursorState::EntryClosed => Ok(()),
            CursorState::Closed => Err(CoreError::invalid_state("reader is closed")),
        }
    }

    /// Releases the data stream and the boundary index. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first close failure; both streams are closed regardless.
    pub fn close(&mut self) -> CoreResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.state = CursorState::Closed;
        let mut errors = CloseErrors::new();
        errors.record(StreamRole::Data, self.data.close());
        errors.record(StreamRole::BoundaryIndex, self.boundaries.close());
        errors.finish()
    }

    /// Checks every boundary offset: non-decreasing and within the data.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] or [`CoreError::Corrupt`] describing the
    /// first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        self.boundaries.validate()?;
        if let Some(last) = self.boundaries.last()? {
            if last > self.data_size {
                return Err(CoreError::corrupt(format!(
                    "boundary index ends at {last} past data size {}",
                    self.data_size
                )));
            }
        }
        Ok(())
    }

    /// The boundary index.
    #[must_use]
    pub fn boundary_index(&self) -> &OffsetIndex {
        &self.boundaries
    }

    pub(crate) fn data(&self) -> &dyn StorageBackend {
        self.data.as_ref()
    }
}

impl std::fmt::Debug for NestedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedReader")
            .field("entry_count", &self.entry_count)
            .field("next", &self.next)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

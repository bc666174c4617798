//! Byte range views over the data stream.

use crate::error::CoreResult;
use crate::types::ByteRange;
use segstream_storage::StorageBackend;
use std::io::{self, Read};

/// Sequential reader over one byte range of the data stream.
///
/// Each `read` call is a positioned read, so several `RangeReader`s over the
/// same backend do not interfere with each other.
pub struct RangeReader<'a> {
    data: &'a dyn StorageBackend,
    range: ByteRange,
    pos: u64,
}

impl<'a> RangeReader<'a> {
    pub(crate) fn new(data: &'a dyn StorageBackend, range: ByteRange) -> Self {
        Self {
            data,
            range,
            pos: range.start,
        }
    }

    /// The full range this reader covers.
    #[must_use]
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.range.end - self.pos
    }

    /// Reads everything that is left in one positioned read.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn read_remaining(&mut self) -> CoreResult<Vec<u8>> {
        let bytes = self.data.read_at(self.pos, self.remaining() as usize)?;
        self.pos = self.range.end;
        Ok(bytes)
    }
}

impl Read for RangeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = (buf.len() as u64).min(self.remaining()) as usize;
        if len == 0 {
            return Ok(0);
        }
        let bytes = self
            .data
            .read_at(self.pos, len)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        buf[..len].copy_from_slice(&bytes);
        self.pos += len as u64;
        Ok(len)
    }
}

impl std::fmt::Debug for RangeReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeReader")
            .field("range", &self.range)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}

/// Sequential reader over several disjoint byte ranges, in order.
pub struct SelectedReader<'a> {
    data: &'a dyn StorageBackend,
    ranges: Vec<ByteRange>,
    current: usize,
    pos: u64,
}

impl<'a> SelectedReader<'a> {
    pub(crate) fn new(data: &'a dyn StorageBackend, ranges: Vec<ByteRange>) -> Self {
        let pos = ranges.first().map_or(0, |range| range.start);
        Self {
            data,
            ranges,
            current: 0,
            pos,
        }
    }

    /// The ranges this reader yields, merged where adjacent.
    #[must_use]
    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    /// Total number of bytes this reader yields.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.ranges.iter().map(|range| range.len()).sum()
    }
}

impl Read for SelectedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(range) = self.ranges.get(self.current).copied() {
            let available = range.end - self.pos;
            if available == 0 {
                self.current += 1;
                if let Some(next) = self.ranges.get(self.current) {
                    self.pos = next.start;
                }
                continue;
            }
            let len = (buf.len() as u64).min(available) as usize;
            let bytes = self
                .data
                .read_at(self.pos, len)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            buf[..len].copy_from_slice(&bytes);
            self.pos += len as u64;
            return Ok(len);
        }
        Ok(0)
    }
}

impl std::fmt::Debug for SelectedReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedReader")
            .field("ranges", &self.ranges)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

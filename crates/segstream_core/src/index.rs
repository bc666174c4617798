//! Offset index access on top of a storage backend.
//!
//! Both the boundary index and the segment index are flat arrays of
//! fixed-width offsets (see `segstream_codec`). Reading slot `i` is a single
//! positioned read of 8 bytes at `i * 8`, so lookups never scan the file.

use crate::error::{CoreError, CoreResult};
use segstream_codec::{
    decode_offset, encode_offset, slot_position, validate_monotonic, CodecError, OffsetDecoder,
    OFFSET_WIDTH,
};
use segstream_storage::StorageBackend;

/// Number of slots decoded per read when loading a whole index.
const BULK_READ_SLOTS: u64 = 8 * 1024;

/// Read-only view of an offset index.
///
/// The slot count is computed once when the index is opened; the index is
/// immutable afterwards.
pub struct OffsetIndex {
    backend: Box<dyn StorageBackend>,
    len: u64,
}

impl OffsetIndex {
    /// Opens an index stored in `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined or is not a whole
    /// number of slots.
    pub fn open(backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let size = backend.size()?;
        if size % OFFSET_WIDTH as u64 != 0 {
            return Err(CodecError::invalid_length(size as usize).into());
        }
        Ok(Self {
            backend,
            len: size / OFFSET_WIDTH as u64,
        })
    }

    /// Number of offsets in the index.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the index holds no offsets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the offset in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if `index >= len()`, or a storage
    /// error if the read fails.
    pub fn get(&self, index: u64) -> CoreResult<u64> {
        if index >= self.len {
            return Err(CoreError::OutOfRange {
                kind: "offset",
                requested: index,
                available: self.len,
            });
        }
        let bytes = self.backend.read_at(slot_position(index), OFFSET_WIDTH)?;
        Ok(decode_offset(&bytes)?)
    }

    /// Reads the last offset, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn last(&self) -> CoreResult<Option<u64>> {
        if self.len == 0 {
            return Ok(None);
        }
        self.get(self.len - 1).map(Some)
    }

    /// Binary search over slots `[lo, hi)`.
    ///
    /// Assumes `pred` is `true` for a (possibly empty) prefix of the slots
    /// and `false` for the rest, and returns the index of the first slot for
    /// which it is `false` (or `hi`). Costs O(log n) positioned reads.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a read fails.
    pub fn partition_point<P>(&self, lo: u64, hi: u64, mut pred: P) -> CoreResult<u64>
    where
        P: FnMut(u64) -> bool,
    {
        let mut lo = lo;
        let mut hi = hi.min(self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.get(mid)?) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Loads every offset into memory.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a read fails.
    pub fn read_all(&self) -> CoreResult<Vec<u64>> {
        let mut offsets = Vec::with_capacity(self.len as usize);
        let mut slot = 0;
        while slot < self.len {
            let count = (self.len - slot).min(BULK_READ_SLOTS);
            let bytes = self
                .backend
                .read_at(slot_position(slot), count as usize * OFFSET_WIDTH)?;
            offsets.extend(OffsetDecoder::new(&bytes)?);
            slot += count;
        }
        Ok(offsets)
    }

    /// Checks that the offsets never decrease. Reads the whole index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] naming the first decreasing slot.
    pub fn validate(&self) -> CoreResult<()> {
        validate_monotonic(&self.read_all()?)?;
        Ok(())
    }

    /// Closes the underlying backend. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the backend's close error.
    pub fn close(&mut self) -> CoreResult<()> {
        self.backend.close()?;
        Ok(())
    }

    /// Returns `true` once the backend has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }
}

impl std::fmt::Debug for OffsetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetIndex")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Append-only writer for an offset index.
///
/// Offsets must be pushed in non-decreasing order.
pub struct OffsetIndexWriter {
    backend: Box<dyn StorageBackend>,
    last: Option<u64>,
    len: u64,
}

impl OffsetIndexWriter {
    /// Creates a writer appending to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the backend already holds data.
    pub fn new(backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let size = backend.size()?;
        if size != 0 {
            return Err(CoreError::invalid_state(format!(
                "index stream already holds {size} bytes"
            )));
        }
        Ok(Self {
            backend,
            last: None,
            len: 0,
        })
    }

    /// Appends one offset.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if `offset` is smaller than the last
    /// offset written, or a storage error if the append fails.
    pub fn push(&mut self, offset: u64) -> CoreResult<()> {
        if let Some(previous) = self.last {
            if offset < previous {
                return Err(CodecError::NonMonotonic {
                    position: self.len as usize,
                    previous,
                    next: offset,
                }
                .into());
            }
        }
        self.backend.append(&encode_offset(offset))?;
        self.last = Some(offset);
        self.len += 1;
        Ok(())
    }

    /// Last offset written, if any.
    #[must_use]
    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Number of offsets written.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn StorageBackend {
        self.backend.as_mut()
    }
}

impl std::fmt::Debug for OffsetIndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetIndexWriter")
            .field("len", &self.len)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use segstream_codec::encode_offsets;
    use segstream_storage::InMemoryBackend;

    fn index_of(offsets: &[u64]) -> OffsetIndex {
        let bytes = encode_offsets(offsets).unwrap();
        OffsetIndex::open(Box::new(InMemoryBackend::with_data(bytes))).unwrap()
    }

    #[test]
    fn open_rejects_partial_slot() {
        let backend = InMemoryBackend::with_data(vec![0; 9]);
        let result = OffsetIndex::open(Box::new(backend));
        assert!(matches!(
            result,
            Err(CoreError::Codec(CodecError::InvalidLength { len: 9 }))
        ));
    }

    #[test]
    fn get_reads_single_slot() {
        let index = index_of(&[0, 6, 12, 18]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.get(2).unwrap(), 12);
        assert_eq!(index.last().unwrap(), Some(18));
    }

    #[test]
    fn get_out_of_range() {
        let index = index_of(&[0, 6]);
        assert!(matches!(
            index.get(2),
            Err(CoreError::OutOfRange { requested: 2, available: 2, .. })
        ));
    }

    #[test]
    fn empty_index_has_no_last() {
        let index = index_of(&[]);
        assert!(index.is_empty());
        assert_eq!(index.last().unwrap(), None);
    }

    #[test]
    fn partition_point_matches_slice() {
        let offsets = [3, 3, 7, 10, 10, 10, 15];
        let index = index_of(&offsets);
        for needle in 0..18 {
            let expected = offsets.partition_point(|&o| o <= needle) as u64;
            let actual = index.partition_point(0, index.len(), |o| o <= needle).unwrap();
            assert_eq!(actual, expected, "needle {needle}");
        }
    }

    #[test]
    fn partition_point_respects_bounds() {
        let index = index_of(&[1, 2, 3, 4, 5]);
        assert_eq!(index.partition_point(1, 3, |o| o < 100).unwrap(), 3);
        assert_eq!(index.partition_point(2, 99, |o| o < 4).unwrap(), 3);
    }

    #[test]
    fn read_all_and_validate() {
        let index = index_of(&[0, 1, 1, 9]);
        assert_eq!(index.read_all().unwrap(), vec![0, 1, 1, 9]);
        index.validate().unwrap();
    }

    #[test]
    fn validate_detects_decrease() {
        let mut bytes = Vec::new();
        for offset in [0u64, 9, 4] {
            bytes.extend_from_slice(&offset.to_be_bytes());
        }
        let index = OffsetIndex::open(Box::new(InMemoryBackend::with_data(bytes))).unwrap();
        assert!(matches!(
            index.validate(),
            Err(CoreError::Codec(CodecError::NonMonotonic { position: 2, .. }))
        ));
    }

    #[test]
    fn writer_appends_big_endian_slots() {
        let backend = InMemoryBackend::new();
        let shared = backend.share();
        let mut writer = OffsetIndexWriter::new(Box::new(backend)).unwrap();
        writer.push(0).unwrap();
        writer.push(258).unwrap();

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.last(), Some(258));
        assert_eq!(&shared.data()[8..], &[0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn writer_rejects_decreasing_offset() {
        let mut writer = OffsetIndexWriter::new(Box::new(InMemoryBackend::new())).unwrap();
        writer.push(10).unwrap();
        assert!(matches!(
            writer.push(4),
            Err(CoreError::Codec(CodecError::NonMonotonic { .. }))
        ));
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn writer_requires_empty_backend() {
        let backend = InMemoryBackend::with_data(vec![0; 8]);
        assert!(matches!(
            OffsetIndexWriter::new(Box::new(backend)),
            Err(CoreError::InvalidState { .. })
        ));
    }

    proptest! {
        #[test]
        fn partition_point_agrees_with_slice_search(
            gaps in prop::collection::vec(0u64..100, 0..64),
            needle in 0u64..4000,
        ) {
            let offsets: Vec<u64> = gaps
                .iter()
                .scan(0u64, |next, gap| {
                    *next += gap;
                    Some(*next)
                })
                .collect();
            let index = index_of(&offsets);
            let expected = offsets.partition_point(|&offset| offset <= needle) as u64;
            prop_assert_eq!(
                index.partition_point(0, index.len(), |offset| offset <= needle).unwrap(),
                expected
            );
            prop_assert_eq!(index.read_all().unwrap(), offsets);
        }
    }
}

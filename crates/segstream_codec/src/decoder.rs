//! Offset index decoder.

use crate::error::{CodecError, CodecResult};
use crate::OFFSET_WIDTH;
use bytes::Buf;

/// Decode one 8-byte slot.
///
/// # Errors
///
/// Returns [`CodecError::InvalidLength`] unless `bytes` is exactly 8 bytes.
pub fn decode_offset(bytes: &[u8]) -> CodecResult<u64> {
    if bytes.len() != OFFSET_WIDTH {
        return Err(CodecError::invalid_length(bytes.len()));
    }
    let mut buf = bytes;
    Ok(buf.get_u64())
}

/// Decode a whole index and check that it is monotonic.
///
/// # Errors
///
/// Returns an error if the length is not a multiple of 8 or the offsets
/// decrease anywhere.
pub fn decode_offsets(bytes: &[u8]) -> CodecResult<Vec<u64>> {
    let offsets: Vec<u64> = OffsetDecoder::new(bytes)?.collect();
    validate_monotonic(&offsets)?;
    Ok(offsets)
}

/// Checks that `offsets` never decrease.
///
/// # Errors
///
/// Returns [`CodecError::NonMonotonic`] naming the first offending position.
pub fn validate_monotonic(offsets: &[u64]) -> CodecResult<()> {
    for (position, pair) in offsets.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(CodecError::NonMonotonic {
                position: position + 1,
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

/// Iterates over the offsets stored in an encoded index.
///
/// The decoder does not check monotonicity; use [`validate_monotonic`] or
/// [`decode_offsets`] for that.
#[derive(Debug, Clone)]
pub struct OffsetDecoder<'a> {
    data: &'a [u8],
}

impl<'a> OffsetDecoder<'a> {
    /// Create a new decoder for the given bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidLength`] if the input is not a whole
    /// number of slots.
    pub fn new(data: &'a [u8]) -> CodecResult<Self> {
        if data.len() % OFFSET_WIDTH != 0 {
            return Err(CodecError::invalid_length(data.len()));
        }
        Ok(Self { data })
    }

    /// Number of offsets not yet decoded.
    pub fn remaining(&self) -> usize {
        self.data.len() / OFFSET_WIDTH
    }
}

impl Iterator for OffsetDecoder<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.get_u64())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for OffsetDecoder<'_> {}

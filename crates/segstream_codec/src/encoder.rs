//! Offset index encoder.

use crate::error::{CodecError, CodecResult};
use crate::OFFSET_WIDTH;
use bytes::{BufMut, BytesMut};

/// Encode a single offset into its 8-byte big-endian slot.
#[must_use]
pub fn encode_offset(offset: u64) -> [u8; OFFSET_WIDTH] {
    offset.to_be_bytes()
}

/// Encode a whole index.
///
/// # Errors
///
/// Returns [`CodecError::NonMonotonic`] if the offsets decrease anywhere.
pub fn encode_offsets(offsets: &[u64]) -> CodecResult<Vec<u8>> {
    let mut encoder = OffsetEncoder::with_capacity(offsets.len());
    for &offset in offsets {
        encoder.push(offset)?;
    }
    Ok(encoder.into_bytes())
}

/// An incremental offset index encoder.
///
/// Rejects any offset smaller than the previously pushed one, so a
/// finished buffer is always a valid index.
#[derive(Debug, Default)]
pub struct OffsetEncoder {
    buffer: BytesMut,
    last: Option<u64>,
    count: usize,
}

impl OffsetEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new encoder with room for `count` offsets.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(count * OFFSET_WIDTH),
            last: None,
            count: 0,
        }
    }

    /// Append one offset.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NonMonotonic`] if `offset` is smaller than the
    /// last offset pushed.
    pub fn push(&mut self, offset: u64) -> CodecResult<()> {
        if let Some(previous) = self.last {
            if offset < previous {
                return Err(CodecError::NonMonotonic {
                    position: self.count,
                    previous,
                    next: offset,
                });
            }
        }
        self.buffer.put_u64(offset);
        self.last = Some(offset);
        self.count += 1;
        Ok(())
    }

    /// Number of offsets pushed so far.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing has been pushed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_big_endian() {
        assert_eq!(encode_offset(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            encode_offset(0x0102_0304_0506_0708),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn encoder_accepts_equal_offsets() {
        let mut encoder = OffsetEncoder::new();
        encoder.push(5).unwrap();
        encoder.push(5).unwrap();
        assert_eq!(encoder.len(), 2);
        assert_eq!(encoder.as_bytes().len(), 16);
    }

    #[test]
    fn encoder_rejects_decreasing_offset() {
        let mut encoder = OffsetEncoder::new();
        encoder.push(10).unwrap();
        let err = encoder.push(9).unwrap_err();
        assert_eq!(
            err,
            CodecError::NonMonotonic {
                position: 1,
                previous: 10,
                next: 9
            }
        );
        // The rejected offset is not written.
        assert_eq!(encoder.len(), 1);
    }

    #[test]
    fn encode_offsets_rejects_unsorted() {
        assert!(encode_offsets(&[0, 8, 4]).is_err());
    }
}

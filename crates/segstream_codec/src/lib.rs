//! # SegStream Codec
//!
//! Fixed-width encoding for the offset index files of a segmented stream
//! container (the boundary index and the segment index).
//!
//! ## Format
//!
//! An index file is a flat array of offsets:
//!
//! ```text
//! | offset[0] (8) | offset[1] (8) | ... | offset[n-1] (8) |
//! ```
//!
//! - Every offset is an unsigned 64-bit integer, **big-endian**
//! - No header, no footer; `len(file) == 8 * n`
//! - Offsets are monotonically non-decreasing
//!
//! Because every slot has the same width, offset `i` lives at byte
//! `i * 8` and can be fetched with one positioned read.
//!
//! ## Usage
//!
//! ```
//! use segstream_codec::{decode_offsets, encode_offsets};
//!
//! let bytes = encode_offsets(&[0, 12, 40]).unwrap();
//! assert_eq!(bytes.len(), 24);
//! assert_eq!(decode_offsets(&bytes).unwrap(), vec![0, 12, 40]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{decode_offset, decode_offsets, validate_monotonic, OffsetDecoder};
pub use encoder::{encode_offset, encode_offsets, OffsetEncoder};
pub use error::{CodecError, CodecResult};

/// Width in bytes of one encoded offset.
pub const OFFSET_WIDTH: usize = 8;

/// Byte position of slot `index` inside an index file.
#[must_use]
pub const fn slot_position(index: u64) -> u64 {
    index * OFFSET_WIDTH as u64
}

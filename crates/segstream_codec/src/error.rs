//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding an offset index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input is not a whole number of offset slots.
    #[error("invalid index length: {len} bytes is not a multiple of 8")]
    InvalidLength {
        /// Length of the rejected input in bytes.
        len: usize,
    },

    /// An offset is smaller than the one before it.
    #[error("offsets not monotonic at position {position}: {previous} > {next}")]
    NonMonotonic {
        /// Index of the offending offset.
        position: usize,
        /// The preceding offset.
        previous: u64,
        /// The offending offset.
        next: u64,
    },
}

impl CodecError {
    /// Create an invalid length error.
    pub fn invalid_length(len: usize) -> Self {
        Self::InvalidLength { len }
    }
}

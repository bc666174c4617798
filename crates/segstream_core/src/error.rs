//! Error types for container operations.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while writing or reading a container.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] segstream_storage::StorageError),

    /// Offset codec error.
    #[error("codec error: {0}")]
    Codec(#[from] segstream_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An entry or segment ordinal beyond the available count was requested.
    #[error("{kind} {requested} out of range: {available} available")]
    OutOfRange {
        /// What was requested ("entry" or "segment").
        kind: &'static str,
        /// The requested ordinal.
        requested: u64,
        /// The number of items that exist.
        available: u64,
    },

    /// The cursor protocol was violated.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violation.
        message: String,
    },

    /// The index streams are inconsistent with the data stream.
    #[error("container corrupted: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },
}

impl CoreError {
    /// Creates an out-of-range error for an entry ordinal.
    pub fn entry_out_of_range(requested: u64, available: u64) -> Self {
        Self::OutOfRange {
            kind: "entry",
            requested,
            available,
        }
    }

    /// Creates an out-of-range error for a segment ordinal.
    pub fn segment_out_of_range(requested: u64, available: u64) -> Self {
        Self::OutOfRange {
            kind: "segment",
            requested,
            available,
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the underlying byte streams.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

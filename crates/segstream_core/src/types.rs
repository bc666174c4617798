//! Core type definitions for segmented stream containers.

use std::fmt;

/// Opaque identity of one container inside a stream store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(String);

impl StreamId {
    /// Creates a new stream ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The three byte streams that make up one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamRole {
    /// Concatenated entry payloads.
    Data,
    /// Offsets delimiting entries.
    BoundaryIndex,
    /// Offsets delimiting segments inside entries.
    SegmentIndex,
}

impl StreamRole {
    /// All roles, in the order they are created and closed.
    pub const ALL: [StreamRole; 3] = [
        StreamRole::Data,
        StreamRole::BoundaryIndex,
        StreamRole::SegmentIndex,
    ];

    /// File name suffix used for this role on disk.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            StreamRole::Data => "dat",
            StreamRole::BoundaryIndex => "bdy.idx",
            StreamRole::SegmentIndex => "seg.idx",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamRole::Data => "data",
            StreamRole::BoundaryIndex => "boundary-index",
            StreamRole::SegmentIndex => "segment-index",
        };
        f.write_str(name)
    }
}

/// A half-open range `[start, end)` of absolute data-stream positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteRange {
    /// First byte of the range.
    pub start: u64,
    /// One past the last byte of the range.
    pub end: u64,
}

impl ByteRange {
    /// Creates a new range. `end` is clamped to be at least `start`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        let end = if end < start { start } else { end };
        Self { start, end }
    }

    /// Number of bytes covered.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if the range covers no bytes.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `pos` lies inside the range.
    #[must_use]
    pub const fn contains(self, pos: u64) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// How the segment writer splits an input into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// One segment per first-level child element of the document root.
    Xml,
    /// One segment per line.
    Text,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Xml => f.write_str("xml"),
            ContentType::Text => f.write_str("text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_suffixes() {
        assert_eq!(StreamRole::Data.suffix(), "dat");
        assert_eq!(StreamRole::BoundaryIndex.suffix(), "bdy.idx");
        assert_eq!(StreamRole::SegmentIndex.suffix(), "seg.idx");
    }

    #[test]
    fn byte_range_clamps() {
        let range = ByteRange::new(10, 4);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
    }

    #[test]
    fn byte_range_contains() {
        let range = ByteRange::new(4, 8);
        assert!(range.contains(4));
        assert!(range.contains(7));
        assert!(!range.contains(8));
        assert_eq!(format!("{range}"), "[4, 8)");
    }

    #[test]
    fn stream_id_display() {
        let id = StreamId::from("feed-42");
        assert_eq!(format!("{id}"), "feed-42");
    }
}

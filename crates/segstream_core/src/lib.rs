//! # SegStream Core
//!
//! Segmented stream containers with random access to entries and to the
//! segments inside them.
//!
//! A container is three byte streams:
//!
//! ```text
//! <id>.dat      entry bytes, concatenated
//! <id>.bdy.idx  offsets delimiting entries    (entry_count + 1 offsets)
//! <id>.seg.idx  offsets delimiting segments   (interior boundaries only)
//! ```
//!
//! Both index files are flat arrays of big-endian `u64` offsets, so finding
//! entry `n` or segment `k` costs a fixed number of positioned reads.
//!
//! This crate provides:
//! - [`ContainerWriter`] and [`SegmentWriter`] for writing containers,
//!   splitting XML inputs per record and text inputs per line
//! - [`NestedReader`], [`CompoundReader`] and [`SegmentStream`] for reading
//! - [`InputStreamProvider`], the interface downstream consumers use
//! - [`StreamStore`] implementations placing containers on disk or in memory
//!
//! ## Example
//!
//! ```rust
//! use segstream_core::{
//!     create_writer, open_provider, Config, InputStreamProvider, MemoryStore, SegmentSink,
//!     SegmentWriter, StreamId,
//! };
//!
//! let store = MemoryStore::new();
//! let id = StreamId::new("example");
//!
//! let mut writer = create_writer(&store, &id, &Config::default()).unwrap();
//! SegmentWriter::default()
//!     .write(&b"line1\nline2\nline3\n"[..], &mut writer, true)
//!     .unwrap();
//!
//! let mut provider = open_provider(&store, &id).unwrap();
//! assert_eq!(provider.stream_count(), 1);
//! let segments = provider.segment_input_stream(0).unwrap();
//! assert_eq!(segments.segment_count(), 3);
//! assert_eq!(segments.read_segment(2).unwrap(), b"line3\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod index;
mod provider;
mod reader;
mod store;
mod triad;
mod types;
mod writer;

#[cfg(test)]
mod testing;

pub use config::{Config, DEFAULT_COPY_BUFFER_SIZE, DEFAULT_XML_LOOKAHEAD};
pub use error::{CoreError, CoreResult};
pub use index::{OffsetIndex, OffsetIndexWriter};
pub use provider::{CompoundProvider, InputStreamProvider, RawProvider};
pub use reader::{
    CompoundReader, NestedReader, RangeReader, SegmentSelection, SegmentStream, SelectedReader,
};
pub use store::{create_writer, open_provider, open_reader, DirectoryStore, MemoryStore, StreamStore};
pub use triad::Triad;
pub use types::{ByteRange, ContentType, StreamId, StreamRole};
pub use writer::{detect_content_type, ContainerWriter, SegmentSink, SegmentWriter};

/// Crate version, as recorded by tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Container writing.
//!
//! [`ContainerWriter`] appends entries and boundaries to the three streams.
//! [`SegmentWriter`] drives any [`SegmentSink`] from an input stream,
//! choosing XML record or text line segmentation from the first bytes.

mod container;
mod scanner;
mod segment_writer;

pub use container::{ContainerWriter, SegmentSink};
pub use segment_writer::{detect_content_type, SegmentWriter};

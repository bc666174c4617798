//! Container reading.
//!
//! - [`NestedReader`]: entries by ordinal, over the data stream and the
//!   boundary index
//! - [`CompoundReader`]: adds the segment index and hands out one
//!   [`SegmentStream`] per entry
//! - [`SegmentStream`]: segments of one entry by ordinal, plus
//!   [`SegmentSelection`] based partial reads

mod compound;
mod nested;
mod range;
mod segment;
mod selection;

pub use compound::CompoundReader;
pub use nested::NestedReader;
pub use range::{RangeReader, SelectedReader};
pub use segment::SegmentStream;
pub use selection::SegmentSelection;

//! # SegStream Testkit
//!
//! Test utilities for SegStream.
//!
//! This crate provides:
//! - Test fixtures creating containers in memory or in temporary directories
//! - Property-based test generators using proptest
//! - An integration harness tracking what was written to a container
//! - Fixed container layouts with their expected index bytes
//!
//! ## Usage
//!
//! ```rust
//! use segstream_testkit::prelude::*;
//!
//! with_temp_container(|container| {
//!     container.write_entries(&["a\nb\n", "c\n"]);
//!     let reader = container.reader();
//!     assert_eq!(reader.input_stream_count(), 2);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;

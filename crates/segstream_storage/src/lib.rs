//! # SegStream Storage
//!
//! Byte-store backends for segmented stream containers.
//!
//! A container is made of three byte streams (data, boundary index and
//! segment index). Each of them lives in a backend from this crate.
//! Backends are **opaque byte stores** - they do not interpret the data
//! they store.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (positioned read, append, flush)
//! - No knowledge of container layouts or index formats
//! - Every backend is explicitly closeable; operations after `close`
//!   fail with [`StorageError::Closed`]
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral containers
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use segstream_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;

//! CLI command implementations.

pub mod cat;
pub mod ingest;
pub mod inspect;
pub mod verify;

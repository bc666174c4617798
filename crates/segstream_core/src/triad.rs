//! The three byte streams that make up one container.

use crate::error::{CoreError, CoreResult};
use crate::types::StreamRole;
use segstream_storage::StorageBackend;
use std::fmt;
use tracing::warn;

/// Data stream, boundary index and segment index of one container.
///
/// A `Triad` is how containers change hands: stores produce one, writers and
/// readers consume one.
pub struct Triad {
    /// Concatenated entry bytes.
    pub data: Box<dyn StorageBackend>,
    /// Entry start offsets plus the final end offset.
    pub boundary: Box<dyn StorageBackend>,
    /// Interior segment boundary offsets.
    pub segment: Box<dyn StorageBackend>,
}

impl Triad {
    /// Bundles three backends.
    #[must_use]
    pub fn new(
        data: Box<dyn StorageBackend>,
        boundary: Box<dyn StorageBackend>,
        segment: Box<dyn StorageBackend>,
    ) -> Self {
        Self {
            data,
            boundary,
            segment,
        }
    }

    /// Returns the backend playing `role`.
    #[must_use]
    pub fn get(&self, role: StreamRole) -> &dyn StorageBackend {
        match role {
            StreamRole::Data => self.data.as_ref(),
            StreamRole::BoundaryIndex => self.boundary.as_ref(),
            StreamRole::SegmentIndex => self.segment.as_ref(),
        }
    }

    /// Closes all three backends.
    ///
    /// Every backend is closed even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first close failure.
    pub fn close(&mut self) -> CoreResult<()> {
        let mut errors = CloseErrors::new();
        errors.record(StreamRole::Data, self.data.close());
        errors.record(StreamRole::BoundaryIndex, self.boundary.close());
        errors.record(StreamRole::SegmentIndex, self.segment.close());
        errors.finish()
    }
}

impl fmt::Debug for Triad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triad")
            .field("data_closed", &self.data.is_closed())
            .field("boundary_closed", &self.boundary.is_closed())
            .field("segment_closed", &self.segment.is_closed())
            .finish()
    }
}

/// Collects failures while releasing several resources.
///
/// The first failure is kept and returned from [`CloseErrors::finish`]; later
/// ones are logged.
#[derive(Debug, Default)]
pub(crate) struct CloseErrors {
    first: Option<CoreError>,
}

impl CloseErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record<E>(&mut self, what: impl fmt::Display, result: Result<(), E>)
    where
        E: Into<CoreError>,
    {
        let Err(err) = result else {
            return;
        };
        let err = err.into();
        if self.first.is_some() {
            warn!(resource = %what, error = %err, "additional failure while closing");
        } else {
            self.first = Some(err);
        }
    }

    pub(crate) fn finish(self) -> CoreResult<()> {
        match self.first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

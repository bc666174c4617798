//! Choosing which segments of an entry to read.

use std::collections::BTreeSet;

/// A set of segment ordinals to read from one entry.
///
/// Starts out selecting every segment. [`include`](Self::include) switches to
/// "only the included ones" mode and [`exclude`](Self::exclude) to "all but
/// the excluded ones" mode. Both lists are kept across mode switches, so
/// `include(1)`, `exclude(2)`, `include(3)` reads segments 1 and 3.
///
/// ```rust
/// use segstream_core::SegmentSelection;
///
/// let mut selection = SegmentSelection::new();
/// selection.exclude(1).exclude(3);
/// assert!(selection.is_selected(0));
/// assert!(!selection.is_selected(3));
///
/// selection.include(3);
/// assert!(selection.is_selected(3));
/// assert!(!selection.is_selected(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSelection {
    include_all: bool,
    included: BTreeSet<u64>,
    excluded: BTreeSet<u64>,
}

/// The ordinals a selection currently acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionMode<'a> {
    /// Every segment but these.
    AllExcept(&'a BTreeSet<u64>),
    /// Only these segments.
    Only(&'a BTreeSet<u64>),
}

impl Default for SegmentSelection {
    fn default() -> Self {
        Self {
            include_all: true,
            included: BTreeSet::new(),
            excluded: BTreeSet::new(),
        }
    }
}

impl SegmentSelection {
    /// Creates a selection of every segment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `segment` to the segments to read and reads only those.
    pub fn include(&mut self, segment: u64) -> &mut Self {
        self.include_all = false;
        self.included.insert(segment);
        self
    }

    /// Adds `segment` to the segments to skip and reads all others.
    pub fn exclude(&mut self, segment: u64) -> &mut Self {
        self.include_all = true;
        self.excluded.insert(segment);
        self
    }

    /// Selects every segment and forgets both lists.
    pub fn include_all(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// Selects no segment and forgets both lists.
    pub fn exclude_all(&mut self) -> &mut Self {
        self.include_all = false;
        self.included.clear();
        self.excluded.clear();
        self
    }

    /// Returns `true` if `segment` would be read.
    #[must_use]
    pub fn is_selected(&self, segment: u64) -> bool {
        match self.mode() {
            SelectionMode::AllExcept(set) => !set.contains(&segment),
            SelectionMode::Only(set) => set.contains(&segment),
        }
    }

    pub(crate) fn mode(&self) -> SelectionMode<'_> {
        if self.include_all {
            SelectionMode::AllExcept(&self.excluded)
        } else {
            SelectionMode::Only(&self.included)
        }
    }

    /// The ordinals the current mode names explicitly.
    pub(crate) fn listed(&self) -> &BTreeSet<u64> {
        match self.mode() {
            SelectionMode::AllExcept(set) | SelectionMode::Only(set) => set,
        }
    }
}

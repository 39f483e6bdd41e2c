use std::fmt;

use crate::PathSegment;

pub type Path = Vec<PathSegment>;

/// The segments from the render root to the node currently being built.
///
/// Segments are pushed on node entry and truncated back on exit, so the path
/// always mirrors the depth of the traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraveledPath {
    segments: Path,
}

impl TraveledPath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn push_key(&mut self, key: &str) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    pub fn extend_from_slice(&mut self, segments: &[PathSegment]) {
        self.segments.extend_from_slice(segments);
    }

    /// Drops every segment past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The dotted form used by descriptors and `props_at` URLs.
    #[must_use]
    pub fn join(&self) -> String {
        join(&self.segments)
    }
}

impl fmt::Display for TraveledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Joins segments with `.`.
#[must_use]
pub fn join(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&segment.to_string());
    }
    out
}

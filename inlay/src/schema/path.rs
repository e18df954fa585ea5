use crate::types::{InlayError, InlayResult};
use std::fmt;
use std::str::FromStr;

/// Dot-separated property path, e.g. `properties.organization.tag`.
///
/// The same path syntax is used for `fields`, `populate`, filters and upsert
/// merge lists. Parsing only checks syntax; whether the segments exist is
/// decided by [`crate::schema::Schema::resolve_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub const WILDCARD: &'static str = "*";

    pub fn parse(raw: &str) -> InlayResult<Self> {
        raw.parse()
    }

    pub fn from_segments(segments: Vec<String>) -> InlayResult<Self> {
        if segments.is_empty() || segments.iter().any(|s| s.trim().is_empty()) {
            return Err(InlayError::unknown_property("", segments.join(".")));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path after the first `n` segments, if anything remains
    pub fn suffix(&self, n: usize) -> Option<FieldPath> {
        if n >= self.segments.len() {
            None
        } else {
            Some(Self {
                segments: self.segments[n..].to_vec(),
            })
        }
    }
}

impl FromStr for FieldPath {
    type Err = InlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s.split('.').map(|p| p.trim().to_string()).collect::<Vec<_>>();
        if segments.iter().any(|p| p.is_empty()) {
            return Err(InlayError::unknown_property("", s));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

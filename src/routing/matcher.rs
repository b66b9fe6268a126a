//! Segment alignment between compiled patterns and request paths.
//!
//! # Responsibilities
//! - Split templates and request paths with one separator convention
//! - Align pattern segments against path segments
//! - Collect captured values into `PathParams`
//!
//! # Design Decisions
//! - Path segments are percent-decoded after splitting, so `%2F` never
//!   introduces a new segment
//! - A capture never matches an empty segment
//! - The wildcard matches zero or more trailing segments
//! - No regex: matching is linear in the number of segments

use std::borrow::Cow;

use crate::routing::pattern::{Pattern, Segment, WILDCARD_PARAM};

/// Path separator shared by compilation and resolution.
pub const SEPARATOR: char = '/';

/// Split a path or template into segments.
///
/// Leading and trailing separators are dropped; interior empty segments are
/// kept so that `//` can be told apart from `/`.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(SEPARATOR).collect()
}

/// Split a request path and percent-decode each segment.
///
/// Segments that do not decode to valid UTF-8 are kept verbatim.
pub fn decode_path(path: &str) -> Vec<Cow<'_, str>> {
    split_path(path)
        .into_iter()
        .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
        .collect()
}

/// Parameters captured from the request path.
///
/// Single-valued by construction: each capture name appears once per pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing an earlier binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The wildcard's joined value, if the matched pattern had one.
    pub fn wildcard(&self) -> Option<&str> {
        self.get(WILDCARD_PARAM)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for PathParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = PathParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Pattern {
    /// Align this pattern against already-split path segments.
    ///
    /// Returns the captured bindings on success.
    pub fn match_segments<S: AsRef<str>>(&self, path: &[S]) -> Option<PathParams> {
        let segments = self.segments();
        let mut params = PathParams::new();

        for (index, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Wildcard => {
                    let rest: Vec<&str> = path
                        .get(index..)
                        .unwrap_or_default()
                        .iter()
                        .map(|s| s.as_ref())
                        .collect();
                    params.insert(WILDCARD_PARAM, rest.join("/"));
                    return Some(params);
                }
                Segment::Literal(text) => {
                    if path.get(index)?.as_ref() != text.as_str() {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    let value = path.get(index)?.as_ref();
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.as_str(), value);
                }
            }
        }

        (path.len() == segments.len()).then_some(params)
    }

    /// Split, decode, and match a raw request path.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        self.match_segments(&decode_path(path))
    }
}

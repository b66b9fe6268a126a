//! Route pattern compilation.
//!
//! # Responsibilities
//! - Parse a path template into an ordered list of segment matchers
//! - Reject malformed templates at registration time
//!
//! # Syntax
//! ```text
//! /users/:id          literal "users", capture "id"
//! /files/*            literal "files", wildcard (rest of the path)
//! /                   zero segments
//! ```
//!
//! # Design Decisions
//! - Leading and trailing `/` are not significant
//! - A wildcard is only legal as the final segment
//! - Compiled patterns are immutable

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::routing::matcher::split_path;

/// Marker that starts a named capture segment.
pub const CAPTURE_MARKER: char = ':';

/// Segment text that denotes the trailing wildcard.
pub const WILDCARD_MARKER: &str = "*";

/// Parameter name under which the wildcard's joined value is bound.
pub const WILDCARD_PARAM: &str = "*";

/// Errors raised while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("capture at segment {position} has an empty name")]
    EmptyCaptureName { position: usize },

    #[error("capture name `{name}` is reserved for the wildcard")]
    ReservedCaptureName { name: String },

    #[error("capture name `{name}` appears more than once")]
    DuplicateCapture { name: String },

    #[error("wildcard at segment {position} must be the last segment")]
    WildcardNotLast { position: usize },

    #[error("empty segment at position {position}")]
    EmptySegment { position: usize },
}

/// One compiled piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Requires exact equality with the path segment.
    Literal(String),
    /// Binds exactly one non-empty path segment to a name.
    Capture(String),
    /// Binds all remaining path segments, joined with `/`.
    Wildcard,
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a path template.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let raw = split_path(template);
        let last = raw.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();

        for (position, token) in raw.into_iter().enumerate() {
            if token.is_empty() {
                return Err(PatternError::EmptySegment { position });
            }

            if token == WILDCARD_MARKER {
                if position != last {
                    return Err(PatternError::WildcardNotLast { position });
                }
                segments.push(Segment::Wildcard);
                continue;
            }

            match token.strip_prefix(CAPTURE_MARKER) {
                Some("") => return Err(PatternError::EmptyCaptureName { position }),
                Some(name) if name == WILDCARD_PARAM => {
                    return Err(PatternError::ReservedCaptureName {
                        name: name.to_string(),
                    });
                }
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(PatternError::DuplicateCapture {
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Capture(name.to_string()));
                }
                None => segments.push(Segment::Literal(token.to_string())),
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiled segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True if the pattern ends in a wildcard.
    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard))
    }

    /// Names of all captures, in pattern order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "/{}", text)?,
                Segment::Capture(name) => write!(f, "/{}{}", CAPTURE_MARKER, name)?,
                Segment::Wildcard => write!(f, "/{}", WILDCARD_MARKER)?,
            }
        }
        Ok(())
    }
}

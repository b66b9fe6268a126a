//! Reverse routing: build a path from a named route and parameters.
//!
//! Captures are substituted from the parameters, the wildcard takes the
//! `*` parameter, and parameters the pattern does not consume are
//! appended as a query string, sorted by name.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::routing::pattern::{Segment, WILDCARD_PARAM};
use crate::routing::router::Router;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReverseError {
    #[error("no route named `{0}`")]
    UnknownRoute(String),

    #[error("route `{route}` needs a value for `{param}`")]
    MissingParam { route: String, param: String },
}

impl Router {
    /// Render the path of the route registered as `name`.
    ///
    /// A capture needs a non-empty value. The wildcard value loses its
    /// leading and trailing `/` but keeps empty interior pieces, so `a//b`
    /// resolves back as `a//b`.
    pub fn path_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        let route = self
            .route_named(name)
            .ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;

        let mut remaining: BTreeMap<&str, &str> = params.iter().copied().collect();
        let mut path = String::new();

        for segment in route.pattern().segments() {
            match segment {
                Segment::Literal(text) => {
                    path.push('/');
                    path.push_str(text);
                }
                Segment::Capture(capture) => {
                    let value = remaining
                        .remove(capture.as_str())
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| ReverseError::MissingParam {
                            route: name.to_string(),
                            param: capture.clone(),
                        })?;
                    path.push('/');
                    path.push_str(&urlencoding::encode(value));
                }
                Segment::Wildcard => {
                    let value = remaining
                        .remove(WILDCARD_PARAM)
                        .unwrap_or_default()
                        .trim_matches('/');
                    if !value.is_empty() {
                        for piece in value.split('/') {
                            path.push('/');
                            path.push_str(&urlencoding::encode(piece));
                        }
                    }
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }

        let query: Vec<String> = remaining
            .into_iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }

        Ok(path)
    }
}

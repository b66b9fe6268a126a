//! Connection persistence policy for responses.
//!
//! A pure function of the request/response pair:
//! - HTTP/1.1: persistent unless the request says `Connection: close`
//! - HTTP/1.0: persistent only with `Connection: keep-alive`
//! - HTTP/2 and later: always persistent (no `Connection` header allowed)

use axum::http::{header, HeaderMap, HeaderValue, Request, Response, Version};

/// Whether the requester asked for a persistent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlive {
    Requested,
    NotRequested,
}

/// What the transport should do after writing the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    KeepOpen,
    Close,
}

impl KeepAlive {
    pub fn of<B>(request: &Request<B>) -> Self {
        Self::from_parts(request.version(), request.headers())
    }

    pub fn from_parts(version: Version, headers: &HeaderMap) -> Self {
        let requested = if version == Version::HTTP_09 {
            false
        } else if version == Version::HTTP_10 {
            connection_has(headers, "keep-alive")
        } else if version == Version::HTTP_11 {
            !connection_has(headers, "close")
        } else {
            true
        };
        if requested {
            KeepAlive::Requested
        } else {
            KeepAlive::NotRequested
        }
    }

    /// Mark `response` accordingly and report whether to close afterwards.
    pub fn apply<B>(self, response: &mut Response<B>) -> Disposition {
        if response.version() >= Version::HTTP_2 {
            return Disposition::KeepOpen;
        }
        match self {
            KeepAlive::Requested => {
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
                Disposition::KeepOpen
            }
            KeepAlive::NotRequested => {
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("close"));
                Disposition::Close
            }
        }
    }
}

fn connection_has(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

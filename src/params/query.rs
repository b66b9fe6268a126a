//! Query string decoding.
//!
//! `&`-separated pairs, split on the first `=`. A key without `=` has an
//! empty value. `+` means space, then percent-decoding applies.
//! Pairs that cannot be decoded (empty name, invalid UTF-8) are skipped.

use std::borrow::Cow;

/// Decode a raw query string (without the leading `?`) into ordered pairs.
pub fn decode_query(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut pairs = Vec::new();

    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match (decode_component(key), decode_component(value)) {
            (Some(key), Some(value)) if !key.is_empty() => {
                pairs.push((key.into_owned(), value.into_owned()));
            }
            _ => {
                tracing::debug!(pair = %pair, "Skipping malformed query pair");
            }
        }
    }

    pairs
}

fn decode_component(component: &str) -> Option<Cow<'_, str>> {
    if component.contains('+') {
        let spaced = component.replace('+', " ");
        return urlencoding::decode(&spaced)
            .ok()
            .map(|decoded| Cow::Owned(decoded.into_owned()));
    }
    urlencoding::decode(component).ok()
}

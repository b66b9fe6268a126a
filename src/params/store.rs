//! Per-request parameter store.
//!
//! Path-origin and query-origin values are kept apart so that lookups can
//! prefer the path without ambiguity, even when both carry the same name.

use std::collections::HashMap;

use serde::Serialize;

use crate::params::query::decode_query;
use crate::routing::PathParams;

/// Parameters attached to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterStore {
    path: HashMap<String, String>,
    query: HashMap<String, Vec<String>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from captured path bindings and a raw query string.
    pub fn merge(path: PathParams, raw_query: &str) -> Self {
        let mut store = Self {
            path: path.into_iter().collect(),
            query: HashMap::new(),
        };
        store.merge_query(raw_query);
        store
    }

    /// Append decoded query values. Path bindings are untouched.
    pub fn merge_query(&mut self, raw_query: &str) {
        for (name, value) in decode_query(raw_query) {
            self.query.entry(name).or_default().push(value);
        }
    }

    /// First value for `name`: the path binding if any, else the first query value.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.path.get(name) {
            return Some(value);
        }
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `name`.
    ///
    /// Path binding if present, else every query value; `None` when the
    /// name appears in neither.
    pub fn lookup_all(&self, name: &str) -> Option<Vec<&str>> {
        if let Some(value) = self.path.get(name) {
            return Some(vec![value.as_str()]);
        }
        self.query
            .get(name)
            .map(|values| values.iter().map(String::as_str).collect())
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty()
    }
}

//! Per-method route storage.
//!
//! # Responsibilities
//! - Hold compiled routes grouped by HTTP method
//! - Preserve registration order (it decides ties)
//!
//! # Design Decisions
//! - Append-only: routes are never removed or reordered
//! - Unknown methods look up as an empty slice, without touching any pattern

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::pattern::Pattern;
use crate::routing::target::RouteTarget;

/// A compiled pattern bound to a target for one method.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    pattern: Pattern,
    target: RouteTarget,
    name: Option<String>,
}

impl Route {
    pub fn new(method: Method, pattern: Pattern, target: RouteTarget) -> Self {
        Self {
            method,
            pattern,
            target,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Label for logs and metrics: the route name, else its pattern.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.pattern.to_string(),
        }
    }
}

/// Routes grouped by method, in registration order.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<Method, Vec<Route>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route to its method's sequence.
    pub fn register(&mut self, route: Route) {
        self.routes
            .entry(route.method.clone())
            .or_default()
            .push(route);
    }

    /// Routes registered for `method`, or an empty slice.
    pub fn lookup(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Methods that have at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.routes.keys()
    }

    /// All routes, grouped by method.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

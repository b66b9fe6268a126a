//! Route registration, freezing, and lookup.
//!
//! # Responsibilities
//! - Collect registrations during setup (`RouterBuilder`)
//! - Freeze them into an immutable `Router` shared across connections
//! - Resolve (method, path) to the first matching route, or `NoMatch`
//!
//! # Design Decisions
//! - Only the builder can register; `Router` has no mutating methods,
//!   so concurrent lookups need no locks
//! - First match in registration order wins
//! - Explicit `NoMatch` rather than a silent default; the dispatcher
//!   substitutes the fallback handler

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::dispatch::fallback::NotFoundHandler;
use crate::routing::matcher::{decode_path, PathParams};
use crate::routing::pattern::{Pattern, PatternError};
use crate::routing::table::{Route, RoutingTable};
use crate::routing::target::{RouteTarget, RoutedHandler};

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{template}`: {source}")]
    Pattern {
        template: String,
        #[source]
        source: PatternError,
    },

    #[error("route name `{0}` is already registered")]
    DuplicateName(String),
}

/// Outcome of resolving a request.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched(ResolvedRoute<'a>),
    NoMatch,
}

impl<'a> Resolution<'a> {
    pub fn matched(self) -> Option<ResolvedRoute<'a>> {
        match self {
            Resolution::Matched(resolved) => Some(resolved),
            Resolution::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// A matched route together with its captured path parameters.
#[derive(Debug)]
pub struct ResolvedRoute<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

impl ResolvedRoute<'_> {
    pub fn target(&self) -> &RouteTarget {
        self.route.target()
    }
}

/// Setup-time registration API.
///
/// Consumed by [`RouterBuilder::build`]; nothing can be registered after.
pub struct RouterBuilder {
    table: RoutingTable,
    fallback: Option<Arc<dyn RoutedHandler>>,
    names: HashMap<String, (Method, usize)>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            table: RoutingTable::new(),
            fallback: None,
            names: HashMap::new(),
        }
    }

    /// Register `template` for `method`.
    pub fn route(
        &mut self,
        method: Method,
        template: &str,
        target: RouteTarget,
    ) -> Result<&mut Self, RouteError> {
        let pattern = compile(template)?;
        self.table.register(Route::new(method, pattern, target));
        Ok(self)
    }

    /// Register a route under a name usable for reverse routing.
    pub fn named(
        &mut self,
        name: &str,
        method: Method,
        template: &str,
        target: RouteTarget,
    ) -> Result<&mut Self, RouteError> {
        if self.names.contains_key(name) {
            return Err(RouteError::DuplicateName(name.to_string()));
        }
        let pattern = compile(template)?;
        let index = self.table.lookup(&method).len();
        self.table
            .register(Route::new(method.clone(), pattern, target).with_name(name));
        self.names.insert(name.to_string(), (method, index));
        Ok(self)
    }

    pub fn get(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::GET, template, target)
    }

    pub fn post(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::POST, template, target)
    }

    pub fn put(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::PUT, template, target)
    }

    pub fn delete(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::DELETE, template, target)
    }

    pub fn patch(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::PATCH, template, target)
    }

    pub fn head(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::HEAD, template, target)
    }

    pub fn options(&mut self, template: &str, target: RouteTarget) -> Result<&mut Self, RouteError> {
        self.route(Method::OPTIONS, template, target)
    }

    /// Handler used when nothing matches. Defaults to [`NotFoundHandler`].
    pub fn fallback<H: RoutedHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Freeze the registrations.
    pub fn build(self) -> Router {
        let fallback = self
            .fallback
            .unwrap_or_else(|| Arc::new(NotFoundHandler::default()));

        tracing::info!(routes = self.table.len(), "Router frozen");
        for route in self.table.iter() {
            tracing::debug!(
                method = %route.method(),
                pattern = %route.pattern(),
                target = ?route.target(),
                "Route registered"
            );
        }

        Router {
            table: self.table,
            fallback,
            names: self.names,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(template: &str) -> Result<Pattern, RouteError> {
    Pattern::compile(template).map_err(|source| RouteError::Pattern {
        template: template.to_string(),
        source,
    })
}

/// Immutable routing table plus fallback, shared via `Arc`.
pub struct Router {
    table: RoutingTable,
    fallback: Arc<dyn RoutedHandler>,
    names: HashMap<String, (Method, usize)>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Find the first route registered for `method` whose pattern matches `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let routes = self.table.lookup(method);
        if routes.is_empty() {
            return Resolution::NoMatch;
        }

        let segments = decode_path(path);
        for route in routes {
            if let Some(params) = route.pattern().match_segments(&segments) {
                return Resolution::Matched(ResolvedRoute { route, params });
            }
        }
        Resolution::NoMatch
    }

    pub fn fallback(&self) -> &Arc<dyn RoutedHandler> {
        &self.fallback
    }

    /// Look up a route by the name it was registered under.
    pub fn route_named(&self, name: &str) -> Option<&Route> {
        let (method, index) = self.names.get(name)?;
        self.table.lookup(method).get(*index)
    }

    /// All routes, in registration order within each method.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.table.iter()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .field("named", &self.names.len())
            .finish()
    }
}

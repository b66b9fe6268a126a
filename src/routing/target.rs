//! Route targets and the handlers they produce.
//!
//! # Responsibilities
//! - Define the handler contract (`RoutedHandler`)
//! - Model the two target kinds: a shared instance, or a factory that
//!   builds an instance per connection attachment
//! - Give every target a stable identity for attach/swap decisions
//!
//! # Design Decisions
//! - Instantiation is an explicit, fallible step (`HandlerFactory::create`)
//! - Identity is pointer identity of the shared handler or the factory

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use thiserror::Error;

/// A handler that serves requests routed to it.
///
/// Shared targets are invoked concurrently from every connection routed to
/// them; implementations must be safe for that.
pub trait RoutedHandler: Send + Sync {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>>;
}

/// Error returned when a factory cannot produce a handler.
#[derive(Debug, Error)]
#[error("handler factory `{factory}` failed: {source}")]
pub struct FactoryError {
    pub factory: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl FactoryError {
    pub fn new(
        factory: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            factory: factory.into(),
            source: source.into(),
        }
    }
}

/// Builds a fresh handler instance for each attachment.
pub trait HandlerFactory: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn create(&self) -> Result<Arc<dyn RoutedHandler>, FactoryError>;
}

/// Stable identity of a target, compared when deciding whether to swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    pub(crate) fn of_handler(handler: &Arc<dyn RoutedHandler>) -> Self {
        Self(Arc::as_ptr(handler) as *const () as usize)
    }

    fn of_factory(factory: &Arc<dyn HandlerFactory>) -> Self {
        Self(Arc::as_ptr(factory) as *const () as usize)
    }
}

/// What a route dispatches to.
#[derive(Clone)]
pub enum RouteTarget {
    /// One instance reused for every match.
    Shared(Arc<dyn RoutedHandler>),
    /// A fresh instance per attachment.
    Factory(Arc<dyn HandlerFactory>),
}

impl RouteTarget {
    /// Wrap a handler as a shared target.
    pub fn shared<H: RoutedHandler + 'static>(handler: H) -> Self {
        RouteTarget::Shared(Arc::new(handler))
    }

    /// Build a factory target from a constructor closure.
    pub fn factory<F, H, E>(name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Result<H, E> + Send + Sync + 'static,
        H: RoutedHandler + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RouteTarget::Factory(Arc::new(FnFactory {
            name: name.into(),
            make,
        }))
    }

    pub fn id(&self) -> TargetId {
        match self {
            RouteTarget::Shared(handler) => TargetId::of_handler(handler),
            RouteTarget::Factory(factory) => TargetId::of_factory(factory),
        }
    }

    /// Produce a handler reference: the shared instance, or a new one.
    pub fn realize(&self) -> Result<Arc<dyn RoutedHandler>, FactoryError> {
        match self {
            RouteTarget::Shared(handler) => Ok(Arc::clone(handler)),
            RouteTarget::Factory(factory) => factory.create(),
        }
    }
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Shared(_) => write!(f, "Shared({:?})", self.id()),
            RouteTarget::Factory(factory) => write!(f, "Factory({})", factory.name()),
        }
    }
}

struct FnFactory<F> {
    name: String,
    make: F,
}

impl<F, H, E> HandlerFactory for FnFactory<F>
where
    F: Fn() -> Result<H, E> + Send + Sync,
    H: RoutedHandler + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Result<Arc<dyn RoutedHandler>, FactoryError> {
        match (self.make)() {
            Ok(handler) => Ok(Arc::new(handler)),
            Err(e) => Err(FactoryError::new(self.name.clone(), e)),
        }
    }
}

/// Handler built from an async closure.
pub struct HandlerFn<F> {
    f: F,
}

/// Adapt an async closure into a `RoutedHandler`.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> RoutedHandler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        Box::pin((self.f)(request))
    }
}

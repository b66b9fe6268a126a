//! Request routing and per-connection dispatch for HTTP servers.
//!
//! Routes are registered once on a [`RouterBuilder`], frozen into a
//! [`Router`], and shared by every connection. Each connection owns a
//! [`ConnectionDispatcher`] that resolves requests, merges path and query
//! parameters into the request, and keeps one routed handler attached.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod net;
pub mod params;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use dispatch::{ConnectionDispatcher, DispatchOutcome, NotFoundHandler, Pipeline};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use params::{ParameterStore, RequestParamsExt};
pub use routing::{handler_fn, RouteTarget, RoutedHandler, Router, RouterBuilder};

//! The transport-side contract the dispatcher drives.
//!
//! A connection's processing sequence has one named slot for the routed
//! handler. The dispatcher attaches, detaches, and forwards through this
//! trait and never touches the transport directly.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::routing::RoutedHandler;

/// Name of the slot holding the routed handler.
pub const ROUTED_HANDLER_NAME: &str = "route_dispatch.routed_handler";

/// Per-connection processing sequence, provided by the transport.
pub trait Pipeline {
    /// Install `handler` under `name`.
    fn attach(&mut self, name: &'static str, handler: Arc<dyn RoutedHandler>);

    /// Remove and return whatever is installed under `name`.
    fn detach(&mut self, name: &'static str) -> Option<Arc<dyn RoutedHandler>>;

    /// Emit the interim `100 Continue` response.
    fn send_continue(&mut self);

    /// Pass the request on to the next stage (the attached handler).
    fn forward(&mut self, request: Request<Body>);
}

//! Per-connection dispatch state machine.
//!
//! # Responsibilities
//! - Short-circuit `Expect: 100-continue` requests
//! - Resolve each request to a route target, or the fallback
//! - Merge path and query parameters into the request
//! - Keep exactly one routed handler attached, swapping only on change
//! - Forward the request to the attached handler
//!
//! # States
//! ```text
//! Unattached ──request──▶ AttachedTo(a)
//! AttachedTo(a) ──request for a──▶ AttachedTo(a)   (no detach/attach)
//! AttachedTo(a) ──request for b──▶ AttachedTo(b)   (detach a, attach b)
//! ```
//!
//! # Design Decisions
//! - Identity is the target's identity, so an attached factory instance is
//!   reused by later requests on the same connection
//! - Per-request failures never change the attached state

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use thiserror::Error;

use crate::dispatch::pipeline::{Pipeline, ROUTED_HANDLER_NAME};
use crate::http::request::expects_continue;
use crate::observability::metrics;
use crate::params::ParameterStore;
use crate::routing::{FactoryError, PathParams, Resolution, RoutedHandler, Router, TargetId};

/// Which handler, if any, is attached to this connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    AttachedTo(TargetId),
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An interim `100 Continue` was requested; nothing was routed.
    Continued,
    /// The request was forwarded. `route` is `None` for the fallback.
    Forwarded { route: Option<String>, swapped: bool },
}

/// Per-request dispatch failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("route `{route}` could not create its handler")]
    Instantiation {
        route: String,
        #[source]
        source: FactoryError,
    },
}

/// Dispatch state for one connection.
///
/// Owned by the connection's task; never shared.
#[derive(Debug)]
pub struct ConnectionDispatcher {
    router: Arc<Router>,
    state: AttachState,
}

impl ConnectionDispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            state: AttachState::Unattached,
        }
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    /// Route one request and hand it to the pipeline.
    pub fn dispatch<P: Pipeline>(
        &mut self,
        mut request: Request<Body>,
        pipeline: &mut P,
    ) -> Result<DispatchOutcome, DispatchError> {
        if expects_continue(&request) {
            tracing::debug!(path = %request.uri().path(), "Expect: 100-continue, answering interim response");
            metrics::record_continue();
            pipeline.send_continue();
            return Ok(DispatchOutcome::Continued);
        }

        let router = Arc::clone(&self.router);
        let (target_id, handler, route, params) =
            match router.resolve(request.method(), request.uri().path()) {
                Resolution::Matched(resolved) => {
                    let label = resolved.route.label();
                    let target = resolved.target();
                    let id = target.id();
                    let handler = if self.state == AttachState::AttachedTo(id) {
                        None
                    } else {
                        match target.realize() {
                            Ok(handler) => Some(handler),
                            Err(source) => {
                                tracing::error!(route = %label, error = %source, "Handler instantiation failed");
                                metrics::record_instantiation_failure(&label);
                                return Err(DispatchError::Instantiation { route: label, source });
                            }
                        }
                    };
                    (id, handler, Some(label), resolved.params)
                }
                Resolution::NoMatch => {
                    let fallback = router.fallback();
                    let id = TargetId::of_handler(fallback);
                    let handler = (self.state != AttachState::AttachedTo(id))
                        .then(|| Arc::clone(fallback));
                    (id, handler, None, PathParams::new())
                }
            };

        let query = request.uri().query().unwrap_or_default().to_string();
        request
            .extensions_mut()
            .insert(ParameterStore::merge(params, &query));

        let swapped = match handler {
            Some(handler) => {
                self.swap(target_id, handler, pipeline);
                true
            }
            None => false,
        };

        match &route {
            Some(label) => metrics::record_dispatch(label),
            None => metrics::record_fallback(),
        }
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            route = route.as_deref().unwrap_or("<fallback>"),
            swapped,
            "Request dispatched"
        );

        pipeline.forward(request);
        Ok(DispatchOutcome::Forwarded { route, swapped })
    }

    fn swap<P: Pipeline>(&mut self, id: TargetId, handler: Arc<dyn RoutedHandler>, pipeline: &mut P) {
        if let AttachState::AttachedTo(previous) = self.state {
            pipeline.detach(ROUTED_HANDLER_NAME);
            tracing::trace!(previous = ?previous, "Routed handler detached");
        }
        pipeline.attach(ROUTED_HANDLER_NAME, handler);
        self.state = AttachState::AttachedTo(id);
        metrics::record_swap();
    }
}

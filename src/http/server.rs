//! HTTP/1.1 server built on hyper.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Give each connection its own `ConnectionDispatcher` and handler slot
//! - Run the attached handler under the request timeout
//! - Apply the keep-alive policy to every response
//! - Drain connections on shutdown
//!
//! # Design Decisions
//! - One task per connection; the router is shared read-only via `Arc`
//! - hyper writes `100 Continue` itself when a handler first reads the
//!   body, so the `Expect` header is consumed here before dispatch
//! - Instantiation failures answer 500 and leave the connection usable

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::{HttpConfig, ServerConfig};
use crate::dispatch::{ConnectionDispatcher, DispatchError, DispatchOutcome, Pipeline};
use crate::http::keep_alive::KeepAlive;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::routing::{RoutedHandler, Router};

/// Error type for the server loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// The processing slot of one connection.
///
/// Holds the attached routed handler and the request forwarded to it.
#[derive(Default)]
pub struct HandlerSlot {
    attached: Option<Arc<dyn RoutedHandler>>,
    pending: Option<Request<Body>>,
}

impl HandlerSlot {
    /// Take the forwarded request together with the handler it goes to.
    pub fn take_forwarded(&mut self) -> Option<(Arc<dyn RoutedHandler>, Request<Body>)> {
        let request = self.pending.take()?;
        let handler = self.attached.clone()?;
        Some((handler, request))
    }
}

impl Pipeline for HandlerSlot {
    fn attach(&mut self, name: &'static str, handler: Arc<dyn RoutedHandler>) {
        tracing::trace!(slot = name, "Handler attached");
        self.attached = Some(handler);
    }

    fn detach(&mut self, name: &'static str) -> Option<Arc<dyn RoutedHandler>> {
        tracing::trace!(slot = name, "Handler detached");
        self.attached.take()
    }

    /// No-op: hyper owns the interim `100 Continue` write and sends it when
    /// the handler first polls the body. `Expect` is removed before dispatch,
    /// so the dispatcher does not normally get here.
    fn send_continue(&mut self) {
        tracing::debug!("100 Continue delegated to hyper");
    }

    fn forward(&mut self, request: Request<Body>) {
        self.pending = Some(request);
    }
}

/// Why a dispatched request has no handler to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unrouted {
    /// The dispatcher short-circuited on `Expect: 100-continue`.
    Continued,
    /// Forwarded, but nothing is attached to the slot.
    Unattached,
}

impl IntoResponse for Unrouted {
    fn into_response(self) -> Response<Body> {
        match self {
            Unrouted::Continued => {
                (StatusCode::EXPECTATION_FAILED, "Expectation Failed").into_response()
            }
            Unrouted::Unattached => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

type Routed = Result<(Arc<dyn RoutedHandler>, Request<Body>), Unrouted>;

/// Pair a dispatch outcome with the handler the slot now holds.
fn routed(outcome: DispatchOutcome, slot: &mut HandlerSlot) -> Routed {
    match outcome {
        DispatchOutcome::Forwarded { .. } => slot.take_forwarded().ok_or(Unrouted::Unattached),
        DispatchOutcome::Continued => Err(Unrouted::Continued),
    }
}

struct ConnectionState {
    dispatcher: ConnectionDispatcher,
    slot: HandlerSlot,
}

/// Per-connection context shared by the requests of that connection.
struct ConnectionContext {
    id: ConnectionId,
    peer: SocketAddr,
    // http1 serves one request at a time, so this lock is never contended.
    state: Mutex<ConnectionState>,
    request_timeout: Duration,
    keep_alive: bool,
}

impl ConnectionContext {
    async fn handle(self: Arc<Self>, request: Request<Incoming>) -> Response<Body> {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            connection_id = %self.id,
            method = %request.method(),
            path = %request.uri().path(),
        );

        async move {
            let (mut parts, body) = request.into_parts();
            parts.headers.remove(header::EXPECT);
            parts.extensions.insert(request_id);
            let request = Request::from_parts(parts, Body::new(body));

            let keep_alive = if self.keep_alive {
                KeepAlive::of(&request)
            } else {
                KeepAlive::NotRequested
            };

            let mut response = match self.dispatch(request) {
                Ok(Ok((handler, request))) => self.run_handler(handler, request).await,
                Ok(Err(unrouted)) => {
                    if unrouted == Unrouted::Unattached {
                        tracing::error!(peer = %self.peer, "Request forwarded with no handler attached");
                    }
                    unrouted.into_response()
                }
                Err(e) => {
                    tracing::error!(peer = %self.peer, error = %e, "Dispatch failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
                }
            };

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
            let disposition = keep_alive.apply(&mut response);
            tracing::debug!(status = %response.status(), ?disposition, "Response ready");
            response
        }
        .instrument(span)
        .await
    }

    fn dispatch(&self, request: Request<Body>) -> Result<Routed, DispatchError> {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let ConnectionState { dispatcher, slot } = &mut *guard;

        let outcome = dispatcher.dispatch(request, slot)?;
        Ok(routed(outcome, slot))
    }

    async fn run_handler(
        &self,
        handler: Arc<dyn RoutedHandler>,
        request: Request<Body>,
    ) -> Response<Body> {
        match tokio::time::timeout(self.request_timeout, handler.handle(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(timeout = ?self.request_timeout, "Handler timed out");
                (StatusCode::REQUEST_TIMEOUT, "Request Timeout").into_response()
            }
        }
    }
}

/// HTTP server dispatching through a frozen [`Router`].
pub struct HttpServer {
    router: Arc<Router>,
    config: ServerConfig,
    tracker: ConnectionTracker,
}

impl HttpServer {
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self {
            router: Arc::new(router),
            config,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open connections, for shutdown and diagnostics.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, routes = self.router.len(), "HTTP server starting");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => self.spawn_connection(stream, peer, permit, shutdown.clone()),
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Stopped accepting connections");
                    break;
                }
            }
        }

        let grace = Duration::from_secs(self.config.http.shutdown_timeout_secs);
        if !self.tracker.wait_for_drain(grace).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Connections still open after shutdown deadline"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        shutdown: ShutdownSignal,
    ) {
        let guard = self.tracker.track();
        let context = Arc::new(ConnectionContext {
            id: guard.id(),
            peer,
            state: Mutex::new(ConnectionState {
                dispatcher: ConnectionDispatcher::new(Arc::clone(&self.router)),
                slot: HandlerSlot::default(),
            }),
            request_timeout: Duration::from_secs(self.config.http.request_timeout_secs),
            keep_alive: self.config.http.keep_alive,
        });
        let http = self.config.http.clone();

        tokio::spawn(serve_connection(stream, context, http, guard, permit, shutdown));
    }
}

async fn serve_connection(
    stream: TcpStream,
    context: Arc<ConnectionContext>,
    http: HttpConfig,
    guard: ConnectionGuard,
    _permit: ConnectionPermit,
    mut shutdown: ShutdownSignal,
) {
    let connection_id = guard.id();
    let peer = context.peer;
    tracing::debug!(connection_id = %connection_id, peer = %peer, "Connection opened");

    let service = service_fn(move |request: Request<Incoming>| {
        let context = Arc::clone(&context);
        async move { Ok::<_, Infallible>(context.handle(request).await) }
    });

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(http.keep_alive)
        .header_read_timeout(Duration::from_secs(http.header_read_timeout_secs));
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        if e.is_incomplete_message() || e.is_closed() {
            tracing::debug!(connection_id = %connection_id, error = %e, "Client went away");
        } else {
            tracing::warn!(connection_id = %connection_id, error = %e, "Connection error");
        }
    }
    drop(guard);
}

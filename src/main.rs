//! Demo server for the routing and dispatch core.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ net::listener ──▶ http::server ──▶ dispatch::dispatcher
//!                      (bounded accept)  (hyper http1)     │ Router::resolve
//!                                                          │ ParameterStore::merge
//!                                                          │ attach / swap handler
//!                                                          ▼
//!     Client Response                                 routed handler
//!     ◀─────────────── keep_alive::apply ◀────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use clap::Parser;
use futures_util::future::BoxFuture;

use route_dispatch::config::{load_config, ServerConfig};
use route_dispatch::http::HttpServer;
use route_dispatch::lifecycle::{shutdown_on_signal, Shutdown};
use route_dispatch::net::listener::Listener;
use route_dispatch::observability::{logging, metrics};
use route_dispatch::params::RequestParamsExt;
use route_dispatch::routing::{handler_fn, RouteError, RouteTarget, RoutedHandler, Router};

#[derive(Parser, Debug)]
#[command(name = "route-dispatch")]
#[command(about = "HTTP request routing and dispatch demo server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("route-dispatch v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = demo_router()?;
    for route in router.routes() {
        tracing::info!(method = %route.method(), route = %route.label(), "Route registered");
    }

    let listener = Listener::bind(&config.listener).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        max_connections = listener.max_connections(),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let server = HttpServer::new(router, config);
    tokio::spawn(async move { shutdown_on_signal(&shutdown).await });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router() -> Result<Router, RouteError> {
    let mut builder = Router::builder();

    builder.get(
        "/health",
        RouteTarget::shared(handler_fn(|_req| async { "OK".into_response() })),
    )?;
    builder.named(
        "user",
        Method::GET,
        "/users/:id",
        RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
            Json(req.params().cloned().unwrap_or_default()).into_response()
        })),
    )?;
    builder.named(
        "files",
        Method::GET,
        "/files/*",
        RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
            match req.param("*") {
                Some(path) if !path.is_empty() => path.to_string().into_response(),
                _ => (StatusCode::BAD_REQUEST, "missing file path").into_response(),
            }
        })),
    )?;
    builder.get(
        "/counter",
        RouteTarget::factory("counter", || Ok::<_, std::convert::Infallible>(Counter::default())),
    )?;

    Ok(builder.build())
}

/// Counts the requests served by one attachment of this handler.
#[derive(Default)]
struct Counter {
    served: AtomicU64,
}

impl RoutedHandler for Counter {
    fn handle(&self, _request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        let served = self.served.fetch_add(1, Ordering::Relaxed) + 1;
        Box::pin(async move { served.to_string().into_response() })
    }
}

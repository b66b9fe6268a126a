//! End-to-end tests over real sockets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::future::BoxFuture;
use tokio::net::TcpStream;

use route_dispatch::config::ServerConfig;
use route_dispatch::http::RequestIdExt;
use route_dispatch::params::RequestParamsExt;
use route_dispatch::routing::{handler_fn, RouteTarget, RoutedHandler, Router};

mod common;

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

fn text(body: &'static str) -> RouteTarget {
    RouteTarget::shared(handler_fn(move |_req| async move { body.into_response() }))
}

fn app() -> Router {
    let mut builder = Router::builder();
    builder.get("/health", text("OK")).unwrap();
    builder
        .get(
            "/users/:id",
            RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
                Json(req.params().cloned().unwrap_or_default()).into_response()
            })),
        )
        .unwrap();
    builder
        .get(
            "/files/*",
            RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
                req.param("*").unwrap_or_default().to_string().into_response()
            })),
        )
        .unwrap();
    builder
        .post(
            "/upload",
            RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
                match axum::body::to_bytes(req.into_body(), 1024).await {
                    Ok(bytes) => format!("received {}", bytes.len()).into_response(),
                    Err(_) => StatusCode::BAD_REQUEST.into_response(),
                }
            })),
        )
        .unwrap();
    builder
        .get(
            "/counter",
            RouteTarget::factory("counter", || Ok::<_, std::convert::Infallible>(Counter::default())),
        )
        .unwrap();
    builder
        .get(
            "/broken",
            RouteTarget::factory("broken", || Err::<Counter, _>("pool exhausted")),
        )
        .unwrap();
    builder
        .get(
            "/slow",
            RouteTarget::shared(handler_fn(|_req| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late".into_response()
            })),
        )
        .unwrap();
    builder.build()
}

#[tokio::test]
async fn path_and_query_params_reach_handler() {
    let server = common::start_server(app()).await;

    let body: serde_json::Value = reqwest::get(server.url("/users/42?active=true&tag=a&tag=b"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["path"]["id"], "42");
    assert_eq!(body["query"]["active"], serde_json::json!(["true"]));
    assert_eq!(body["query"]["tag"], serde_json::json!(["a", "b"]));

    let res = reqwest::get(server.url("/files/docs/guide.txt")).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "docs/guide.txt");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn unmatched_requests_get_not_found() {
    let server = common::start_server(app()).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "Not Found");

    // Right path, wrong method.
    let res = client.delete(server.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn custom_fallback_is_used() {
    let mut builder = Router::builder();
    builder.get("/health", text("OK")).unwrap();
    builder.fallback(handler_fn(|_req| async {
        (StatusCode::IM_A_TEAPOT, "elsewhere").into_response()
    }));
    let server = common::start_server(builder.build()).await;

    let res = reqwest::get(server.url("/missing")).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::IM_A_TEAPOT);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn responses_carry_request_id() {
    let mut builder = Router::builder();
    builder
        .get(
            "/whoami",
            RouteTarget::shared(handler_fn(|req: Request<Body>| async move {
                req.request_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default()
                    .into_response()
            })),
        )
        .unwrap();
    let server = common::start_server(builder.build()).await;

    let res = reqwest::get(server.url("/whoami")).await.unwrap();
    let header = res.headers().get("x-request-id").unwrap().to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&header).is_ok());
    assert_eq!(res.text().await.unwrap(), header);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn keep_alive_connection_stays_open() {
    let server = common::start_server(app()).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    let first = common::roundtrip(&mut stream, "GET /health HTTP/1.1\r\nHost: test\r\n\r\n").await;
    assert_eq!(first.status, 200);
    assert_eq!(first.header("connection"), Some("keep-alive"));

    let second = common::roundtrip(&mut stream, "GET /users/7 HTTP/1.1\r\nHost: test\r\n\r\n").await;
    assert_eq!(second.status, 200);
    assert!(second.body.contains("\"7\""));

    drop(stream);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn connection_close_is_honored() {
    let server = common::start_server(app()).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let res = common::roundtrip(
        &mut stream,
        "GET /health HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(res.header("connection"), Some("close"));
    assert!(common::closed_by_peer(&mut stream).await);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let res = common::roundtrip(&mut stream, "GET /health HTTP/1.0\r\n\r\n").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("connection"), Some("close"));
    assert!(common::closed_by_peer(&mut stream).await);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn keep_alive_disabled_in_config_closes() {
    let mut config = ServerConfig::default();
    config.http.keep_alive = false;
    let server = common::start_server_with(app(), config).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let res = common::roundtrip(&mut stream, "GET /health HTTP/1.1\r\nHost: test\r\n\r\n").await;
    assert_eq!(res.header("connection"), Some("close"));
    assert!(common::closed_by_peer(&mut stream).await);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn factory_instance_lives_with_the_attachment() {
    let server = common::start_server(app()).await;
    let get = |path: &str| format!("GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "1");
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "2");

    // Swapping away and back instantiates afresh.
    common::roundtrip(&mut stream, &get("/health")).await;
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "1");

    // Another connection has its own instance.
    let mut other = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(common::roundtrip(&mut other, &get("/counter")).await.body, "1");
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "2");

    drop(stream);
    drop(other);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn instantiation_failure_is_server_error_and_connection_survives() {
    let server = common::start_server(app()).await;
    let get = |path: &str| format!("GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "1");

    let failed = common::roundtrip(&mut stream, &get("/broken")).await;
    assert_eq!(failed.status, 500);

    // The previously attached instance is still in place.
    assert_eq!(common::roundtrip(&mut stream, &get("/counter")).await.body, "2");

    drop(stream);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn expect_continue_gets_interim_response() {
    let server = common::start_server(app()).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    let interim = common::roundtrip(
        &mut stream,
        "POST /upload HTTP/1.1\r\nHost: test\r\nContent-Length: 5\r\nExpect: 100-continue\r\n\r\n",
    )
    .await;
    assert_eq!(interim.status, 100);

    let last = common::roundtrip(&mut stream, "hello").await;
    assert_eq!(last.status, 200);
    assert_eq!(last.body, "received 5");

    drop(stream);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn slow_handler_times_out() {
    let mut config = ServerConfig::default();
    config.http.request_timeout_secs = 1;
    let server = common::start_server_with(app(), config).await;

    let res = reqwest::get(server.url("/slow")).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::REQUEST_TIMEOUT);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = common::start_server(app()).await;
    let addr = server.addr;

    server.stop().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

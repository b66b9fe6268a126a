//! Default handler for requests no route matches.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;

use crate::routing::RoutedHandler;

/// Answers `404 Not Found` with a plain-text body.
#[derive(Debug, Clone)]
pub struct NotFoundHandler {
    body: String,
}

impl NotFoundHandler {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl Default for NotFoundHandler {
    fn default() -> Self {
        Self::with_body("Not Found")
    }
}

impl RoutedHandler for NotFoundHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        tracing::debug!(method = %request.method(), path = %request.uri().path(), "No route matched");
        let body = self.body.clone();
        Box::pin(async move { (StatusCode::NOT_FOUND, body).into_response() })
    }
}

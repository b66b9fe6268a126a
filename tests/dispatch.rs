//! Dispatch core driven through the public API with an in-memory pipeline.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};

use route_dispatch::dispatch::{AttachState, ConnectionDispatcher, DispatchOutcome, Pipeline};
use route_dispatch::params::RequestParamsExt;
use route_dispatch::routing::{handler_fn, Resolution, RouteTarget, RoutedHandler, Router};

#[derive(Default)]
struct Wire {
    events: Vec<&'static str>,
    forwarded: Vec<Request<Body>>,
}

impl Pipeline for Wire {
    fn attach(&mut self, _name: &'static str, _handler: Arc<dyn RoutedHandler>) {
        self.events.push("attach");
    }

    fn detach(&mut self, _name: &'static str) -> Option<Arc<dyn RoutedHandler>> {
        self.events.push("detach");
        None
    }

    fn send_continue(&mut self) {
        self.events.push("continue");
    }

    fn forward(&mut self, request: Request<Body>) {
        self.forwarded.push(request);
    }
}

fn ok() -> RouteTarget {
    RouteTarget::shared(handler_fn(|_req| async { Response::new(Body::empty()) }))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn router() -> Router {
    let mut builder = Router::builder();
    builder.named("user", Method::GET, "/users/:id", ok()).unwrap();
    builder.named("file", Method::GET, "/files/*", ok()).unwrap();
    builder.get("/files/:name", ok()).unwrap();
    builder.post("/users", ok()).unwrap();
    builder.build()
}

#[test]
fn user_lookup_merges_path_and_query() {
    let mut dispatcher = ConnectionDispatcher::new(Arc::new(router()));
    let mut wire = Wire::default();

    dispatcher.dispatch(get("/users/42?active=true"), &mut wire).unwrap();

    let request = &wire.forwarded[0];
    assert_eq!(request.param("id"), Some("42"));
    assert_eq!(request.param("active"), Some("true"));
    let store = request.params().unwrap();
    assert_eq!(store.path_params().len(), 1);
    assert_eq!(store.query_params().len(), 1);
}

#[test]
fn earlier_wildcard_wins_over_later_capture() {
    let router = router();
    let resolved = router
        .resolve(&Method::GET, "/files/a/b.txt")
        .matched()
        .unwrap();
    assert_eq!(resolved.route.name(), Some("file"));
    assert_eq!(resolved.params.wildcard(), Some("a/b.txt"));

    let single = router.resolve(&Method::GET, "/files/b.txt").matched().unwrap();
    assert_eq!(single.route.name(), Some("file"));
}

#[test]
fn method_without_routes_goes_to_fallback() {
    let router = Arc::new(router());
    assert!(matches!(
        router.resolve(&Method::DELETE, "/users/1"),
        Resolution::NoMatch
    ));

    let mut dispatcher = ConnectionDispatcher::new(Arc::clone(&router));
    let mut wire = Wire::default();
    let outcome = dispatcher
        .dispatch(
            Request::builder()
                .method(Method::DELETE)
                .uri("/users/1?reason=spam")
                .body(Body::empty())
                .unwrap(),
            &mut wire,
        )
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Forwarded { route: None, swapped: true });
    let store = wire.forwarded[0].params().unwrap();
    assert!(store.path_params().is_empty());
    assert_eq!(store.lookup("reason"), Some("spam"));
}

#[test]
fn keep_alive_sequence_attaches_only_on_change() {
    let mut dispatcher = ConnectionDispatcher::new(Arc::new(router()));
    let mut wire = Wire::default();

    for uri in ["/users/1", "/users/2", "/files/x", "/files/y", "/users/3", "/nope"] {
        dispatcher.dispatch(get(uri), &mut wire).unwrap();
    }

    assert_eq!(
        wire.events,
        vec![
            "attach",
            "detach", "attach",
            "detach", "attach",
            "detach", "attach",
        ]
    );
    assert_eq!(wire.forwarded.len(), 6);
    assert!(matches!(dispatcher.state(), AttachState::AttachedTo(_)));
}

#[test]
fn continue_request_is_not_routed() {
    let mut dispatcher = ConnectionDispatcher::new(Arc::new(router()));
    let mut wire = Wire::default();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header("expect", "100-Continue")
        .body(Body::empty())
        .unwrap();
    let outcome = dispatcher.dispatch(request, &mut wire).unwrap();

    assert_eq!(outcome, DispatchOutcome::Continued);
    assert_eq!(wire.events, vec!["continue"]);
    assert!(wire.forwarded.is_empty());
}

#[test]
fn reverse_routes_resolve_back_to_themselves() {
    let router = router();

    let path = router.path_for("user", &[("id", "42"), ("tab", "posts")]).unwrap();
    assert_eq!(path, "/users/42?tab=posts");

    let resolved = router.resolve(&Method::GET, "/users/42").matched().unwrap();
    assert_eq!(resolved.route.name(), Some("user"));
    assert_eq!(resolved.params.get("id"), Some("42"));

    let file = router.path_for("file", &[("*", "docs/readme.md")]).unwrap();
    let resolved = router.resolve(&Method::GET, &file).matched().unwrap();
    assert_eq!(resolved.params.wildcard(), Some("docs/readme.md"));
}

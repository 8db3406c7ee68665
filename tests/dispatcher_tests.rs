//! Dispatcher behaviour across the router → dispatcher → handler coroutine
//! path: registration by `operationId`, middleware ordering, panic recovery.

use adoption_status::dispatcher::{Dispatcher, HandlerResponse, HeaderVec};
use adoption_status::ids::RequestId;
use adoption_status::middleware::{CorsMiddleware, Middleware, TracingMiddleware};
use adoption_status::model::{AdoptionStatus, NewAdoptionStatus};
use adoption_status::registry;
use adoption_status::router::{RouteMatch, Router};
use adoption_status::store::{MemoryStatusStore, StatusStore};
use adoption_status::load_spec;
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::test_server::setup_may_runtime;

fn route(router: &Router, method: Method, path: &str) -> RouteMatch {
    router.route(method, path).unwrap()
}

fn seeded_store() -> Arc<dyn StatusStore> {
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
    store
        .insert(NewAdoptionStatus::new("pet123").with_status(AdoptionStatus::Reserved))
        .unwrap();
    store
}

#[test]
fn test_registry_binds_update_handler() {
    setup_may_runtime();
    let routes = load_spec("doc/openapi.yaml").unwrap();
    let router = Router::new(routes.clone()).unwrap();
    let store = seeded_store();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        registry::register_from_spec(&mut dispatcher, &routes, &store);
    }
    assert!(dispatcher.has_handler("update_status_by_pet_id"));

    let m = route(&router, Method::PUT, "/adoption/status/pet123");
    let resp = dispatcher
        .dispatch(
            m,
            "/adoption/status/pet123".into(),
            Some(json!({"status": "adopted"})),
            HeaderVec::new(),
            RequestId::new(),
        )
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["status"], "adopted");
}

#[test]
fn test_unregistered_handler_yields_none() {
    setup_may_runtime();
    let router = Router::new(load_spec("doc/openapi.yaml").unwrap()).unwrap();
    let dispatcher = Dispatcher::new();
    let m = route(&router, Method::PUT, "/adoption/status/pet123");
    assert!(dispatcher
        .dispatch(m, "/adoption/status/pet123".into(), None, HeaderVec::new(), RequestId::new())
        .is_none());
}

#[test]
fn test_handler_panic_is_500() {
    setup_may_runtime();
    let router = Router::new(load_spec("doc/openapi.yaml").unwrap()).unwrap();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_handler("update_status_by_pet_id", |_req| {
            panic!("boom");
        });
    }
    let m = route(&router, Method::PUT, "/adoption/status/pet123");
    let resp = dispatcher
        .dispatch(m, "/adoption/status/pet123".into(), None, HeaderVec::new(), RequestId::new())
        .unwrap();
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].as_str().unwrap().contains("boom"));
}

#[test]
fn test_handler_without_reply_is_503() {
    setup_may_runtime();
    let router = Router::new(load_spec("doc/openapi.yaml").unwrap()).unwrap();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_handler("update_status_by_pet_id", |_req| {});
    }
    let m = route(&router, Method::PUT, "/adoption/status/pet123");

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let resp = dispatcher.dispatch(
            m,
            "/adoption/status/pet123".into(),
            None,
            HeaderVec::new(),
            RequestId::new(),
        );
        let _ = done_tx.send(resp);
    });

    let resp = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("dispatch did not return")
        .unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(resp.body["message"], "Service Unavailable");
    assert!(resp.body["error"]
        .as_str()
        .unwrap()
        .contains("update_status_by_pet_id"));
}

struct CountingMiddleware {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl Middleware for CountingMiddleware {
    fn before(&self, _req: &adoption_status::dispatcher::HandlerRequest) -> Option<HandlerResponse> {
        self.before.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn after(
        &self,
        _req: &adoption_status::dispatcher::HandlerRequest,
        _res: &mut HandlerResponse,
        _latency: Duration,
    ) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_middleware_runs_around_handler() {
    setup_may_runtime();
    let routes = load_spec("doc/openapi.yaml").unwrap();
    let router = Router::new(routes.clone()).unwrap();
    let store = seeded_store();
    let counter = Arc::new(CountingMiddleware {
        before: AtomicUsize::new(0),
        after: AtomicUsize::new(0),
    });
    let mut dispatcher = Dispatcher::new();
    unsafe {
        registry::register_from_spec(&mut dispatcher, &routes, &store);
    }
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    dispatcher.add_middleware(Arc::clone(&counter) as Arc<dyn Middleware>);
    dispatcher.add_middleware(Arc::new(CorsMiddleware::default()));

    let m = route(&router, Method::PUT, "/adoption/status/ghost");
    let resp = dispatcher
        .dispatch(
            m,
            "/adoption/status/ghost".into(),
            Some(json!({"status": "adopted"})),
            HeaderVec::new(),
            RequestId::new(),
        )
        .unwrap();
    assert_eq!(resp.status, 404);
    assert_eq!(resp.get_header("access-control-allow-origin"), Some("*"));
    assert_eq!(counter.before.load(Ordering::SeqCst), 1);
    assert_eq!(counter.after.load(Ordering::SeqCst), 1);
    assert_eq!(store.count().unwrap(), 1);
}

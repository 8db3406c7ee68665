use adoption_status::config::AppConfig;
use adoption_status::store::{MemoryStatusStore, StatusStore};
use std::sync::Arc;

mod common;
use common::http::get;
use common::test_server::TestServer;

#[test]
fn test_health_endpoint() {
    let server = TestServer::start(vec![]);
    let resp = get(&server.addr, "/health");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), serde_json::json!({"status": "ok"}));
    assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
}

#[test]
fn test_openapi_endpoint() {
    let server = TestServer::start(vec![]);
    let resp = get(&server.addr, "/openapi.yaml");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("text/yaml"));
    assert!(resp.body.contains("openapi: 3.1.0"));
    assert!(resp.body.contains("update_status_by_pet_id"));
}

#[test]
fn test_swagger_ui_endpoint() {
    let server = TestServer::start(vec![]);
    let resp = get(&server.addr, "/updateStatus-docs");
    assert_eq!(resp.status, 200);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));
    assert!(resp.body.contains("SwaggerUIBundle"));
    assert!(resp.body.contains("url: \"/openapi.yaml\""));
}

#[test]
fn test_docs_disabled() {
    let mut config = AppConfig::default();
    config.docs.doc_dir = None;
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
    let server = TestServer::with_store(store, config);
    let resp = get(&server.addr, "/updateStatus-docs");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["message"], "Docs not configured");
}

#[test]
fn test_missing_docs_page_keeps_cors_headers() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.docs.doc_dir = Some(dir.path().to_path_buf());
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
    let server = TestServer::with_store(store, config);
    let resp = get(&server.addr, "/updateStatus-docs");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["message"], "Docs not found");
    assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
}

#[test]
fn test_unreadable_openapi_document_keeps_cors_headers() {
    let dir = tempfile::tempdir().unwrap();
    let spec_path = dir.path().join("openapi.yaml");
    std::fs::copy("doc/openapi.yaml", &spec_path).unwrap();
    let mut config = AppConfig::default();
    config.docs.spec_path = spec_path.clone();
    let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
    let server = TestServer::with_store(store, config);
    std::fs::remove_file(&spec_path).unwrap();

    let resp = get(&server.addr, "/openapi.yaml");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["message"], "Spec not found");
    assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
}

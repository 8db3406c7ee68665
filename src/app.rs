//! Service assembly: OpenAPI routes, handlers, middleware and the HTTP
//! server, wired to one store.

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::middleware::{CorsMiddleware, TracingMiddleware};
use crate::registry;
use crate::router::Router;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::spec::load_spec;
use crate::store::StatusStore;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Build the [`AppService`] described by `config`, backed by `store`.
///
/// # Errors
///
/// Fails if the OpenAPI document cannot be loaded, a path template does not
/// compile, or a request schema is invalid.
pub fn build_service(config: &AppConfig, store: &Arc<dyn StatusStore>) -> anyhow::Result<AppService> {
    let spec_path = &config.docs.spec_path;
    let routes = load_spec(spec_path)
        .with_context(|| format!("failed to load OpenAPI document {}", spec_path.display()))?;
    let router = Router::new(routes.clone()).context("failed to compile routing table")?;

    let mut dispatcher = Dispatcher::new();
    // SAFETY: the may runtime is configured before the service is built.
    unsafe {
        registry::register_from_spec(&mut dispatcher, &routes, store);
    }
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    dispatcher.add_middleware(Arc::new(CorsMiddleware::with_origins(
        config.cors.allowed_origins.clone(),
    )));

    AppService::new(
        router,
        dispatcher,
        CorsMiddleware::with_origins(config.cors.allowed_origins.clone()),
        spec_path.clone(),
        config.docs.doc_dir.clone(),
    )
}

/// Build the service and start listening on `config.http.addr`.
///
/// # Errors
///
/// See [`build_service`]; also fails if the address cannot be bound.
pub fn serve(config: &AppConfig, store: &Arc<dyn StatusStore>) -> anyhow::Result<ServerHandle> {
    let service = build_service(config, store)?;
    let handle = HttpServer(service)
        .start(config.http.addr.as_str())
        .with_context(|| format!("failed to bind {}", config.http.addr))?;
    info!(
        addr = %handle.addr(),
        store_backend = %config.store.backend,
        "Adoption status service started"
    );
    Ok(handle)
}

//! # Server Module
//!
//! HTTP front end on top of `may_minihttp`.
//!
//! [`AppService`] handles every connection's requests in this order:
//!
//! 1. built-in endpoints: `GET /health`, `GET /openapi.yaml`,
//!    `GET /updateStatus-docs`
//! 2. `OPTIONS` preflight for any routed path
//! 3. routing; unknown paths get a 404 JSON body
//! 4. body checks: malformed JSON, missing required body, and request schema
//!    violations are answered with a 400 before dispatch
//! 5. dispatch to the handler coroutine; CORS headers on every response
//!
//! [`HttpServer`] starts the service and returns a [`ServerHandle`] used to
//! wait for readiness, stop, or join.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_body, parse_request, ParsedRequest};
pub use response::{write_bytes, write_handler_response};
pub use service::{AppService, DOCS_PATH, HEALTH_PATH, OPENAPI_PATH};

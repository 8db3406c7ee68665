use super::request::{parse_request, ParsedRequest};
use super::response::{write_bytes, write_handler_response};
use crate::dispatcher::{Dispatcher, HandlerResponse, ResponseHeaders};
use crate::ids::RequestId;
use crate::middleware::CorsMiddleware;
use crate::router::Router;
use crate::static_files::StaticFiles;
use http::Method;
use jsonschema::Validator;
use may_minihttp::{HttpService, Request, Response};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const HEALTH_PATH: &str = "/health";
pub const OPENAPI_PATH: &str = "/openapi.yaml";
pub const DOCS_PATH: &str = "/updateStatus-docs";

const YAML_CONTENT_TYPE: &str = "Content-Type: text/yaml";
const HTML_CONTENT_TYPE: &str = "Content-Type: text/html; charset=utf-8";

/// The HTTP service: built-in endpoints, CORS preflight, request body
/// validation, then dispatch to the handler bound to the matched route.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    dispatcher: Arc<Dispatcher>,
    /// Compiled request body schemas by handler name
    validators: Arc<HashMap<Arc<str>, Validator>>,
    cors: Arc<CorsMiddleware>,
    spec_path: PathBuf,
    doc_files: Option<StaticFiles>,
}

impl AppService {
    /// Build the service and compile every route's request schema.
    ///
    /// # Errors
    ///
    /// Fails if a request schema in the document is not a valid JSON Schema.
    pub fn new(
        router: Router,
        dispatcher: Dispatcher,
        cors: CorsMiddleware,
        spec_path: PathBuf,
        doc_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let mut validators = HashMap::new();
        for route in router.routes() {
            if let Some(schema) = &route.request_schema {
                let validator = jsonschema::validator_for(schema).map_err(|e| {
                    anyhow::anyhow!("invalid request schema for {}: {e}", route.handler_name)
                })?;
                validators.insert(Arc::clone(&route.handler_name), validator);
            }
        }
        debug!(validators = validators.len(), "Request validators compiled");

        Ok(Self {
            router: Arc::new(router),
            dispatcher: Arc::new(dispatcher),
            validators: Arc::new(validators),
            cors: Arc::new(cors),
            spec_path,
            doc_files: doc_dir.map(StaticFiles::new),
        })
    }

    /// Error messages for `body` against the schema of `handler_name`.
    /// Empty when the body is valid or the route has no schema.
    pub fn validate_body(&self, handler_name: &str, body: &Value) -> Vec<String> {
        self.validators
            .get(handler_name)
            .map(|v| v.iter_errors(body).map(|e| e.to_string()).collect())
            .unwrap_or_default()
    }

    fn headers_with_cors(&self, content_type: &'static str, origin: Option<&str>) -> ResponseHeaders {
        let mut headers = ResponseHeaders::new();
        headers.push(content_type);
        headers.extend(self.cors.header_lines(origin));
        headers
    }

    fn not_found(method: &str, path: &str) -> HandlerResponse {
        HandlerResponse::json(
            404,
            json!({ "message": "Not Found", "method": method, "path": path }),
        )
    }

    fn invalid_body(error: impl std::fmt::Display, details: Vec<String>) -> HandlerResponse {
        HandlerResponse::json(
            400,
            json!({
                "message": "Invalid request body",
                "error": error.to_string(),
                "details": details,
            }),
        )
    }

    fn builtin(&self, req: &ParsedRequest, res: &mut Response) -> Option<io::Result<()>> {
        if req.method != "GET" {
            return None;
        }
        let origin = req.header("origin");
        match req.path.as_str() {
            HEALTH_PATH => Some(self.finish(
                res,
                HandlerResponse::json(200, json!({ "status": "ok" })),
                origin,
            )),
            OPENAPI_PATH => Some(self.openapi_endpoint(res, origin)),
            DOCS_PATH => Some(match &self.doc_files {
                Some(docs) => self.swagger_ui_endpoint(res, docs, origin),
                None => self.finish(
                    res,
                    HandlerResponse::json(404, json!({ "message": "Docs not configured" })),
                    origin,
                ),
            }),
            _ => None,
        }
    }

    /// Serve the OpenAPI document as `text/yaml`.
    fn openapi_endpoint(&self, res: &mut Response, origin: Option<&str>) -> io::Result<()> {
        match std::fs::read(&self.spec_path) {
            Ok(bytes) => write_bytes(
                res,
                200,
                &self.headers_with_cors(YAML_CONTENT_TYPE, origin),
                bytes,
            ),
            Err(e) => {
                warn!(path = %self.spec_path.display(), error = %e, "OpenAPI document not readable");
                return self.finish(
                    res,
                    HandlerResponse::json(404, json!({ "message": "Spec not found" })),
                    origin,
                );
            }
        }
        Ok(())
    }

    /// Render the Swagger UI page from the docs directory.
    fn swagger_ui_endpoint(
        &self,
        res: &mut Response,
        docs: &StaticFiles,
        origin: Option<&str>,
    ) -> io::Result<()> {
        let ctx = json!({ "spec_url": OPENAPI_PATH, "title": "Adoption Status API" });
        match docs.load("index.html", Some(&ctx)) {
            Ok((bytes, _)) => write_bytes(
                res,
                200,
                &self.headers_with_cors(HTML_CONTENT_TYPE, origin),
                bytes,
            ),
            Err(e) => {
                warn!(dir = %docs.base_dir().display(), error = %e, "Swagger UI page not available");
                return self.finish(
                    res,
                    HandlerResponse::json(404, json!({ "message": "Docs not found" })),
                    origin,
                );
            }
        }
        Ok(())
    }

    /// Decorate with CORS headers and write.
    fn finish(&self, res: &mut Response, mut resp: HandlerResponse, origin: Option<&str>) -> io::Result<()> {
        self.cors.apply(origin, &mut resp);
        write_handler_response(res, resp);
        Ok(())
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        if let Some(result) = self.builtin(&parsed, res) {
            return result;
        }

        let ParsedRequest {
            method,
            path,
            headers,
            body,
            body_error,
        } = parsed;
        let origin = headers
            .iter()
            .find(|(k, _)| k.as_ref() == "origin")
            .map(|(_, v)| v.clone());
        let origin = origin.as_deref();

        let Ok(http_method) = Method::from_bytes(method.as_bytes()) else {
            return self.finish(res, Self::not_found(&method, &path), origin);
        };

        if http_method == Method::OPTIONS {
            if self.router.allows_path(&path) {
                debug!(path = %path, "CORS preflight");
                let resp = self.cors.preflight(origin);
                write_handler_response(res, resp);
                return Ok(());
            }
            return self.finish(res, Self::not_found(&method, &path), origin);
        }

        let Some(route_match) = self.router.route(http_method, &path) else {
            info!(method = %method, path = %path, "No route for request");
            return self.finish(res, Self::not_found(&method, &path), origin);
        };

        if let Some(e) = body_error {
            return self.finish(res, Self::invalid_body(e, Vec::new()), origin);
        }
        if route_match.route.request_body_required && body.is_none() {
            return self.finish(
                res,
                Self::invalid_body("request body is required", Vec::new()),
                origin,
            );
        }
        if let Some(body_val) = &body {
            let details = self.validate_body(&route_match.handler_name, body_val);
            if let Some(first) = details.first() {
                debug!(
                    handler_name = %route_match.handler_name,
                    errors = ?details,
                    "Request body failed schema validation"
                );
                let first = first.clone();
                return self.finish(res, Self::invalid_body(first, details), origin);
            }
        }

        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.as_ref() == "x-request-id")
                .map(|(_, v)| v.as_str()),
        );
        let handler_name = Arc::clone(&route_match.handler_name);
        match self
            .dispatcher
            .dispatch(route_match, path.clone(), body, headers, request_id)
        {
            Some(resp) => self.finish(res, resp, origin),
            None => {
                error!(
                    request_id = %request_id,
                    handler_name = %handler_name,
                    "Handler failed or not registered"
                );
                self.finish(
                    res,
                    HandlerResponse::json(
                        500,
                        json!({
                            "message": "Handler failed or not registered",
                            "method": method,
                            "path": path,
                        }),
                    ),
                    origin,
                )
            }
        }
    }
}

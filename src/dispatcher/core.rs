use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use crate::runtime_config::RuntimeConfig;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum inline request headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request header name/value pairs (names lowercased).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Complete `Name: value` response header lines.
///
/// `may_minihttp` only accepts `'static` header lines, so every line is
/// either a literal or built once at startup.
pub type ResponseHeaders = SmallVec<[&'static str; 8]>;

pub const JSON_CONTENT_TYPE: &str = "Content-Type: application/json";

/// Request handed to a handler coroutine.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path as received
    pub path: String,
    pub handler_name: Arc<str>,
    pub path_params: ParamVec,
    pub headers: HeaderVec,
    /// Parsed JSON body, `None` when the request had no body
    pub body: Option<Value>,
    /// Channel the handler answers on
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Send `response` back to the dispatcher.
    ///
    /// A closed reply channel means the caller is gone; that is logged and
    /// otherwise ignored.
    pub fn reply(&self, response: HandlerResponse) {
        if self.reply_tx.send(response).is_err() {
            warn!(
                request_id = %self.request_id,
                handler_name = %self.handler_name,
                "Reply channel closed before response was sent"
            );
        }
    }
}

/// Response produced by a handler or middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: ResponseHeaders,
    /// JSON body; `Value::Null` with a 204 means no body
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: ResponseHeaders, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with `Content-Type: application/json`.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = ResponseHeaders::new();
        headers.push(JSON_CONTENT_TYPE);
        Self::new(status, headers, body)
    }

    /// Empty `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, ResponseHeaders::new(), Value::Null)
    }

    /// `{"message": ..., "error": ...}` error body.
    #[must_use]
    pub fn error(status: u16, message: &str, error: impl std::fmt::Display) -> Self {
        Self::json(
            status,
            json!({ "message": message, "error": error.to_string() }),
        )
    }

    /// Value of header `name`, if set.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    /// Add `line`, replacing any existing header with the same name.
    pub fn set_header(&mut self, line: &'static str) {
        let name = line.split_once(':').map_or(line, |(n, _)| n);
        self.headers.retain(|existing| {
            existing
                .split_once(':')
                .map_or(true, |(n, _)| !n.eq_ignore_ascii_case(name))
        });
        self.headers.push(line);
    }
}

pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Routes matched requests to handler coroutines by handler name.
///
/// Middleware runs around every dispatch: `before` hooks may short-circuit
/// with a response, `after` hooks see every response.
#[derive(Clone, Default)]
pub struct Dispatcher {
    pub handlers: HashMap<String, HandlerSender>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing channel for `handler_name`, replacing any
    /// previous one. The replaced coroutine exits when its channel closes.
    pub fn add_route(&mut self, handler_name: &str, sender: HandlerSender) {
        if self.handlers.insert(handler_name.to_string(), sender).is_some() {
            warn!(handler_name = %handler_name, "Replaced existing handler");
        }
        info!(
            handler_name = %handler_name,
            total_handlers = self.handlers.len(),
            "Handler registered"
        );
    }

    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Spawn a coroutine that feeds every request for `name` to `handler_fn`.
    ///
    /// Panics inside `handler_fn` are caught and answered with a 500.
    ///
    /// # Safety
    ///
    /// Spawns a `may` coroutine. The runtime must be configured before this
    /// is called, and `handler_fn` must not block on thread-local state that
    /// coroutines cannot migrate with.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let stack_size = RuntimeConfig::from_env().stack_size;
        let coroutine_name = name.to_string();

        // SAFETY: see the function's safety section; the closure owns all of
        // its state.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .name(coroutine_name.clone())
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler_name = %coroutine_name, stack_size, "Handler coroutine start");
                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let request_id = req.request_id;
                        let handler_name = Arc::clone(&req.handler_name);
                        let start = Instant::now();

                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler_fn(req);
                        }));

                        match outcome {
                            Ok(()) => debug!(
                                request_id = %request_id,
                                handler_name = %handler_name,
                                execution_time_us = start.elapsed().as_micros() as u64,
                                "Handler execution complete"
                            ),
                            Err(panic) => {
                                let panic_message = panic
                                    .downcast_ref::<&str>()
                                    .map(|s| (*s).to_string())
                                    .or_else(|| panic.downcast_ref::<String>().cloned())
                                    .unwrap_or_else(|| "unknown panic".to_string());
                                error!(
                                    request_id = %request_id,
                                    handler_name = %handler_name,
                                    panic_message = %panic_message,
                                    "Handler panicked"
                                );
                                let response = HandlerResponse::error(
                                    500,
                                    "Internal Server Error",
                                    format_args!("handler panicked: {panic_message}"),
                                );
                                if reply_tx.send(response).is_err() {
                                    warn!(request_id = %request_id, "Reply channel closed after panic");
                                }
                            }
                        }
                    }
                    debug!(handler_name = %coroutine_name, "Handler coroutine exit");
                })
        };

        if let Err(e) = spawn_result {
            error!(handler_name = %name, error = %e, stack_size, "Failed to spawn handler coroutine");
            return;
        }
        self.add_route(name, tx);
    }

    /// Run middleware and the handler for `route_match`.
    ///
    /// Returns `None` when no handler is registered under the route's name.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        path: String,
        body: Option<Value>,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> Option<HandlerResponse> {
        let Some(tx) = self.handlers.get(route_match.handler_name.as_ref()) else {
            error!(
                request_id = %request_id,
                handler_name = %route_match.handler_name,
                available_handlers = ?self.handlers.keys().collect::<Vec<_>>(),
                "Handler not found"
            );
            return None;
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path,
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            headers,
            body,
            reply_tx,
        };

        let mut early = None;
        for mw in &self.middlewares {
            if let Some(resp) = mw.before(&request) {
                debug!(
                    request_id = %request_id,
                    middleware = std::any::type_name_of_val(mw.as_ref()),
                    status = resp.status,
                    "Middleware returned early response"
                );
                early = Some(resp);
                break;
            }
        }

        // The handler gets the only live reply sender, so a handler that
        // returns without replying closes the channel and `recv` fails.
        let view = HandlerRequest {
            reply_tx: mpsc::channel().0,
            ..request.clone()
        };

        let (mut resp, latency) = match early {
            Some(resp) => (resp, Duration::ZERO),
            None => {
                let start = Instant::now();
                if let Err(e) = tx.send(request) {
                    error!(
                        request_id = %request_id,
                        handler_name = %view.handler_name,
                        error = %e,
                        "Failed to send request to handler"
                    );
                    return None;
                }
                let resp = match reply_rx.recv() {
                    Ok(resp) => resp,
                    Err(e) => {
                        error!(
                            request_id = %request_id,
                            handler_name = %view.handler_name,
                            error = %e,
                            "Handler dropped the request without replying"
                        );
                        HandlerResponse::error(
                            503,
                            "Service Unavailable",
                            format_args!("handler '{}' is not responding", view.handler_name),
                        )
                    }
                };
                (resp, start.elapsed())
            }
        };

        for mw in &self.middlewares {
            mw.after(&view, &mut resp, latency);
        }
        Some(resp)
    }
}

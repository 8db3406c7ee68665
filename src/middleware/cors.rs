use std::time::Duration;

use http::Method;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse, ResponseHeaders};

const ANY_ORIGIN_LINE: &str = "Access-Control-Allow-Origin: *";
const VARY_ORIGIN_LINE: &str = "Vary: Origin";
const MAX_AGE_LINE: &str = "Access-Control-Max-Age: 86400";

fn leak_line(name: &str, value: &str) -> &'static str {
    Box::leak(format!("{name}: {value}").into_boxed_str())
}

/// Cross-origin resource sharing policy.
///
/// Header lines are rendered once at construction; responses only pick
/// among them.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    any_origin: bool,
    origin_lines: Vec<(String, &'static str)>,
    methods_line: &'static str,
    headers_line: &'static str,
}

impl CorsMiddleware {
    /// A policy for explicit origins. `"*"` in `allowed_origins` allows any
    /// origin.
    #[must_use]
    pub fn new(
        allowed_origins: Vec<String>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
    ) -> Self {
        let any_origin = allowed_origins.iter().any(|o| o == "*");
        let origin_lines = allowed_origins
            .into_iter()
            .filter(|o| o != "*")
            .map(|o| {
                let line = leak_line("Access-Control-Allow-Origin", &o);
                (o, line)
            })
            .collect();
        let methods = allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            any_origin,
            origin_lines,
            methods_line: leak_line("Access-Control-Allow-Methods", &methods),
            headers_line: leak_line("Access-Control-Allow-Headers", &allowed_headers.join(", ")),
        }
    }

    /// The default policy restricted to `allowed_origins`.
    #[must_use]
    pub fn with_origins(allowed_origins: Vec<String>) -> Self {
        Self::new(allowed_origins, default_headers(), default_methods())
    }

    /// CORS header lines for a request carrying `origin`.
    ///
    /// With an origin allow-list, a non-matching origin gets no
    /// `Access-Control-Allow-Origin` header at all.
    #[must_use]
    pub fn header_lines(&self, origin: Option<&str>) -> ResponseHeaders {
        let mut lines = ResponseHeaders::new();
        if self.any_origin {
            lines.push(ANY_ORIGIN_LINE);
        } else if let Some(line) = origin.and_then(|origin| {
            self.origin_lines
                .iter()
                .find(|(allowed, _)| allowed == origin)
                .map(|(_, line)| *line)
        }) {
            lines.push(line);
            lines.push(VARY_ORIGIN_LINE);
        }
        lines.push(self.methods_line);
        lines.push(self.headers_line);
        lines
    }

    /// Add the policy's headers to `resp`.
    pub fn apply(&self, origin: Option<&str>, resp: &mut HandlerResponse) {
        for line in self.header_lines(origin) {
            resp.set_header(line);
        }
    }

    /// `204 No Content` answer to a preflight request.
    #[must_use]
    pub fn preflight(&self, origin: Option<&str>) -> HandlerResponse {
        let mut resp = HandlerResponse::no_content();
        self.apply(origin, &mut resp);
        resp.set_header(MAX_AGE_LINE);
        resp
    }
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".into(), "Authorization".into()]
}

fn default_methods() -> Vec<Method> {
    vec![Method::GET, Method::PUT, Method::OPTIONS]
}

/// Any origin; `GET, PUT, OPTIONS`; `Content-Type, Authorization`.
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new(vec!["*".into()], default_headers(), default_methods())
    }
}

impl Middleware for CorsMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        (req.method == Method::OPTIONS).then(|| self.preflight(req.get_header("origin")))
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, _latency: Duration) {
        self.apply(req.get_header("origin"), res);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_policy_lines() {
        let cors = CorsMiddleware::default();
        let lines = cors.header_lines(None);
        assert_eq!(
            lines.as_slice(),
            [
                "Access-Control-Allow-Origin: *",
                "Access-Control-Allow-Methods: GET, PUT, OPTIONS",
                "Access-Control-Allow-Headers: Content-Type, Authorization",
            ]
        );
    }

    #[test]
    fn test_allow_list_echoes_matching_origin_only() {
        let cors = CorsMiddleware::with_origins(vec!["https://shelter.example".into()]);
        let lines = cors.header_lines(Some("https://shelter.example"));
        assert!(lines.contains(&"Access-Control-Allow-Origin: https://shelter.example"));
        assert!(lines.contains(&"Vary: Origin"));

        let lines = cors.header_lines(Some("https://evil.example"));
        assert!(!lines.iter().any(|l| l.starts_with("Access-Control-Allow-Origin")));
    }

    #[test]
    fn test_apply_does_not_duplicate_headers() {
        let cors = CorsMiddleware::default();
        let mut resp = HandlerResponse::json(200, json!({}));
        cors.apply(None, &mut resp);
        cors.apply(None, &mut resp);
        assert_eq!(resp.headers.len(), 4);
        assert_eq!(resp.get_header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn test_preflight_is_204_with_cors() {
        let resp = CorsMiddleware::default().preflight(None);
        assert_eq!(resp.status, 204);
        assert_eq!(resp.get_header("access-control-allow-methods"), Some("GET, PUT, OPTIONS"));
        assert_eq!(resp.get_header("access-control-max-age"), Some("86400"));
    }
}

use crate::dispatcher::HeaderVec;
use may_minihttp::Request;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};

/// Request data extracted from a `may_minihttp::Request`.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Header pairs, names lowercased
    pub headers: HeaderVec,
    /// Parsed JSON body; `None` for an empty body
    pub body: Option<serde_json::Value>,
    /// Set when a non-empty body could not be read or parsed as JSON
    pub body_error: Option<String>,
}

impl ParsedRequest {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a raw body. Whitespace-only bodies count as absent.
pub fn parse_body(raw: &[u8]) -> Result<Option<serde_json::Value>, String> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(raw)
        .map(Some)
        .map_err(|e| e.to_string())
}

pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let path = req.path().split('?').next().unwrap_or("/").to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let mut raw = Vec::new();
    let (body, body_error) = match req.body().read_to_end(&mut raw) {
        Ok(_) => match parse_body(&raw) {
            Ok(body) => (body, None),
            Err(e) => {
                debug!(method = %method, path = %path, error = %e, "JSON body parse failed");
                (None, Some(e))
            }
        },
        Err(e) => {
            warn!(method = %method, path = %path, error = %e, "Failed to read request body");
            (None, Some(e.to_string()))
        }
    };

    debug!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        body_size_bytes = raw.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        body,
        body_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), None);
        assert_eq!(parse_body(b" \r\n").unwrap(), None);
        assert_eq!(
            parse_body(br#"{"status":"adopted"}"#).unwrap(),
            Some(json!({"status": "adopted"}))
        );
        assert!(parse_body(b"{not json").is_err());
    }
}

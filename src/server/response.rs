use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use tracing::error;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write `resp` to the wire.
///
/// A `Null` body is written as an empty body; anything else is serialized
/// as JSON. Handlers set their own `Content-Type`.
pub fn write_handler_response(res: &mut Response, resp: HandlerResponse) {
    res.status_code(resp.status as usize, status_reason(resp.status));
    for line in resp.headers {
        res.header(line);
    }
    if resp.body.is_null() {
        return;
    }
    match serde_json::to_vec(&resp.body) {
        Ok(bytes) => res.body_vec(bytes),
        Err(e) => {
            error!(error = %e, status = resp.status, "Failed to serialize response body");
            res.body_vec(Vec::new());
        }
    }
}

/// Write raw bytes with a fixed set of header lines.
pub fn write_bytes(res: &mut Response, status: u16, headers: &[&'static str], bytes: Vec<u8>) {
    res.status_code(status as usize, status_reason(status));
    for line in headers {
        res.header(line);
    }
    res.body_vec(bytes);
}

use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Logs every dispatched request with its outcome and latency.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %req.handler_name,
            "Request start"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        if res.status >= 500 {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request handled"
            );
        }
    }
}

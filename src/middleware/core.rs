use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hooks run by the dispatcher around every handler call.
pub trait Middleware: Send + Sync {
    /// Return `Some` to answer the request without calling the handler.
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }

    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}

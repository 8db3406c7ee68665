//! Binds OpenAPI operations to handler implementations.

use crate::dispatcher::Dispatcher;
use crate::handlers::update_status::{self, UpdateStatusHandler};
use crate::spec::RouteMeta;
use crate::store::StatusStore;
use std::sync::Arc;
use tracing::warn;

/// Register a handler coroutine for every route whose `operationId` has an
/// implementation.
///
/// Routes without one are logged and left unregistered; requests to them
/// get a 500 from the server.
///
/// # Safety
///
/// Spawns `may` coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register_from_spec(
    dispatcher: &mut Dispatcher,
    routes: &[RouteMeta],
    store: &Arc<dyn StatusStore>,
) {
    for route in routes {
        match route.handler_name.as_ref() {
            update_status::OPERATION_ID => {
                let handler = UpdateStatusHandler::new(Arc::clone(store));
                // SAFETY: forwarded from this function's contract.
                unsafe {
                    dispatcher.register_handler(update_status::OPERATION_ID, move |req| {
                        let resp = handler.handle(&req);
                        req.reply(resp);
                    });
                }
            }
            other => warn!(
                handler_name = %other,
                method = %route.method,
                path = %route.path_pattern,
                "No implementation for operation"
            ),
        }
    }
}

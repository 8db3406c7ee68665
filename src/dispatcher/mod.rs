//! # Dispatcher Module
//!
//! Coroutine-based handler dispatch.
//!
//! - Each registered handler runs in its own `may` coroutine fed by an MPSC
//!   channel.
//! - A dispatch sends a [`HandlerRequest`] carrying a reply channel and blocks
//!   the calling coroutine until the handler answers.
//! - Handler panics are caught and answered with a 500; a handler that drops
//!   a request without replying yields a 503.
//! - Middleware `before` hooks may short-circuit a request; `after` hooks see
//!   every response, including short-circuited ones.
//!
//! Coroutine stack size comes from `ADOPTION_STACK_SIZE` (see
//! [`crate::runtime_config`]).
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.register_handler("update_status_by_pet_id", move |req| {
//!         let resp = handler.handle(&req);
//!         req.reply(resp);
//!     });
//! }
//! ```

mod core;

pub use core::{
    Dispatcher, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec, ResponseHeaders,
    JSON_CONTENT_TYPE, MAX_INLINE_HEADERS,
};

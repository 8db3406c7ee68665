//! # Router Module
//!
//! Matches incoming requests to the operations declared in the OpenAPI
//! document.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at startup each path template (e.g.
//!    `/adoption/status/{petId}`) becomes an anchored regex with one capture
//!    group per parameter.
//! 2. **Matching**: for each request the router tests the path against the
//!    compiled patterns for the request method and returns the route metadata
//!    with the extracted, percent-decoded parameters.
//!
//! ## Example
//!
//! ```rust,ignore
//! use adoption_status::router::Router;
//! use adoption_status::spec::load_spec;
//!
//! let router = Router::new(load_spec("doc/openapi.yaml")?)?;
//! if let Some(m) = router.route(http::Method::PUT, "/adoption/status/pet123") {
//!     assert_eq!(m.get_path_param("petId"), Some("pet123"));
//! }
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};

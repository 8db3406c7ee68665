//! # Spec Module
//!
//! Loads the service's OpenAPI document and turns each operation into a
//! [`RouteMeta`] the router and dispatcher work from. Handlers are bound by
//! `operationId`; request body schemas are resolved here so the server can
//! validate bodies before dispatch.

mod build;
mod load;
mod types;

pub use build::{
    base_path, build_routes, expand_schema_refs, extract_parameters, extract_request_schema,
    resolve_schema_ref,
};
pub use load::{load_spec, parse_spec};
pub use types::{ParameterLocation, ParameterMeta, RouteMeta};

use http::Method;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

impl From<oas3::spec::ParameterIn> for ParameterLocation {
    fn from(loc: oas3::spec::ParameterIn) -> Self {
        match loc {
            oas3::spec::ParameterIn::Path => ParameterLocation::Path,
            oas3::spec::ParameterIn::Query => ParameterLocation::Query,
            oas3::spec::ParameterIn::Header => ParameterLocation::Header,
            oas3::spec::ParameterIn::Cookie => ParameterLocation::Cookie,
        }
    }
}

/// One operation from the OpenAPI document, ready for routing.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Path template as written in the document, e.g. `/adoption/status/{petId}`
    pub path_pattern: Arc<str>,
    /// `operationId` (or `x-handler`) the dispatcher looks handlers up by
    pub handler_name: Arc<str>,
    pub parameters: Vec<ParameterMeta>,
    /// `application/json` request body schema with `$ref`s expanded
    pub request_schema: Option<Value>,
    pub request_body_required: bool,
    /// Path prefix taken from the first `servers` entry
    pub base_path: String,
}

impl RouteMeta {
    #[must_use]
    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterMeta> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
}

use super::types::{ParameterLocation, ParameterMeta, RouteMeta};
use oas3::spec::{ObjectOrReference, Parameter};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolve a `#/components/schemas/...` reference.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    spec.components
        .as_ref()?
        .schemas
        .get(name)
        .and_then(|schema_ref| match schema_ref {
            ObjectOrReference::Object(schema) => Some(schema),
            ObjectOrReference::Ref { .. } => None,
        })
}

/// Replace every `$ref` object in `value` with the schema it points to.
///
/// The original component name is kept under `x-ref-name`. Unresolvable
/// references are left as they are.
pub fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
                if let Some(mut resolved) =
                    resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
                {
                    expand_schema_refs(spec, &mut resolved);
                    if let (Some(name), Value::Object(o)) = (
                        ref_path.strip_prefix("#/components/schemas/"),
                        &mut resolved,
                    ) {
                        o.insert("x-ref-name".to_string(), Value::String(name.to_string()));
                    }
                    *value = resolved;
                    return;
                }
            }
            for v in obj.values_mut() {
                expand_schema_refs(spec, v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_schema_refs(spec, v);
            }
        }
        _ => {}
    }
}

fn resolve_handler_name(operation: &oas3::spec::Operation) -> Option<String> {
    operation
        .extensions
        .iter()
        .find_map(|(key, val)| match val {
            Value::String(s) if key.starts_with("x-handler") => Some(s.clone()),
            _ => None,
        })
        .or_else(|| operation.operation_id.clone())
}

/// The `application/json` request body schema and whether a body is required.
pub fn extract_request_schema(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> (Option<Value>, bool) {
    let Some(ObjectOrReference::Object(req_body)) = operation.request_body.as_ref() else {
        return (None, false);
    };
    let required = req_body.required.unwrap_or(false);
    let mut schema = req_body
        .content
        .get("application/json")
        .and_then(|media| match media.schema.as_ref()? {
            ObjectOrReference::Object(schema_obj) => serde_json::to_value(schema_obj).ok(),
            ObjectOrReference::Ref { ref_path, .. } => {
                resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
            }
        });
    if let Some(val) = schema.as_mut() {
        expand_schema_refs(spec, val);
    }
    (schema, required)
}

fn resolve_parameter_ref<'a>(spec: &'a OpenApiV3Spec, ref_path: &str) -> Option<&'a Parameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            ObjectOrReference::Ref { .. } => None,
        })
}

pub fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
) -> Vec<ParameterMeta> {
    params
        .iter()
        .filter_map(|p| match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        })
        .map(|param| {
            let schema = param.schema.as_ref().and_then(|s| match s {
                ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
                ObjectOrReference::Ref { ref_path, .. } => {
                    resolve_schema_ref(spec, ref_path).and_then(|sch| serde_json::to_value(sch).ok())
                }
            });
            let location = ParameterLocation::from(param.location);
            ParameterMeta {
                name: param.name.clone(),
                location,
                // Path parameters are always required.
                required: location == ParameterLocation::Path || param.required.unwrap_or(false),
                schema,
            }
        })
        .collect()
}

/// Path prefix of the first `servers` entry, without a trailing slash.
///
/// Relative server URLs (`/api/v1`) are accepted.
pub fn base_path(spec: &OpenApiV3Spec) -> String {
    let Some(server) = spec.servers.first() else {
        return String::new();
    };
    let url_str = &server.url;
    url::Url::parse(url_str)
        .or_else(|_| url::Url::parse(&format!("http://placeholder{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" || p.is_empty() {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}

/// Build one [`RouteMeta`] per operation in the document.
///
/// # Errors
///
/// Fails if any operation has neither an `operationId` nor an `x-handler`
/// extension, listing every offending operation.
pub fn build_routes(spec: &OpenApiV3Spec) -> anyhow::Result<Vec<RouteMeta>> {
    let mut routes = Vec::new();
    let mut missing = Vec::new();
    let base_path = base_path(spec);

    let Some(paths_map) = spec.paths.as_ref() else {
        warn!("OpenAPI document declares no paths");
        return Ok(routes);
    };

    for (path, item) in paths_map {
        for (method, operation) in item.methods() {
            let Some(handler_name) = resolve_handler_name(operation) else {
                missing.push(format!("{method} {path}"));
                continue;
            };

            let (request_schema, request_body_required) = extract_request_schema(spec, operation);

            let mut parameters = extract_parameters(spec, &item.parameters);
            parameters.extend(extract_parameters(spec, &operation.parameters));

            debug!(
                method = %method,
                path = %path,
                handler_name = %handler_name,
                has_request_schema = request_schema.is_some(),
                "Route built"
            );

            routes.push(RouteMeta {
                method: method.clone(),
                path_pattern: Arc::from(path.as_str()),
                handler_name: Arc::from(handler_name.as_str()),
                parameters,
                request_schema,
                request_body_required,
                base_path: base_path.clone(),
            });
        }
    }

    if !missing.is_empty() {
        anyhow::bail!(
            "operations without operationId or x-handler: {}",
            missing.join(", ")
        );
    }
    Ok(routes)
}

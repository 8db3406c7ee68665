use super::build::build_routes;
use super::types::RouteMeta;
use anyhow::Context;
use oas3::OpenApiV3Spec;
use std::path::Path;
use tracing::info;

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Drop path-item keys that are neither HTTP verbs nor known fields so that
/// vendor tooling output does not break deserialization.
fn strip_unknown_verbs(val: &mut serde_json::Value) {
    let Some(serde_json::Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for item in paths_map.values_mut() {
        if let serde_json::Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Parse an OpenAPI document from YAML or JSON text.
pub fn parse_spec(content: &str, yaml: bool) -> anyhow::Result<OpenApiV3Spec> {
    let mut value: serde_json::Value = if yaml {
        serde_yaml::from_str(content).context("invalid YAML")?
    } else {
        serde_json::from_str(content).context("invalid JSON")?
    };
    strip_unknown_verbs(&mut value);
    serde_json::from_value(value).context("not an OpenAPI 3 document")
}

/// Load the OpenAPI document at `path` and build its routes.
///
/// `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
pub fn load_spec(path: impl AsRef<Path>) -> anyhow::Result<Vec<RouteMeta>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let spec = parse_spec(&content, yaml)
        .with_context(|| format!("failed to parse OpenAPI document {}", path.display()))?;
    let routes = build_routes(&spec)?;
    info!(
        spec_path = %path.display(),
        title = %spec.info.title,
        routes_count = routes.len(),
        "OpenAPI document loaded"
    );
    Ok(routes)
}

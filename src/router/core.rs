use crate::spec::RouteMeta;
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter name/value pairs. Names are shared with the routing table.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Percent-decoded path parameters, in template order
    pub path_params: ParamVec,
    pub handler_name: Arc<str>,
}

impl RouteMatch {
    /// Last value bound to `name`.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

struct CompiledRoute {
    method: Method,
    regex: Regex,
    meta: Arc<RouteMeta>,
    param_names: Vec<Arc<str>>,
}

/// Regex-backed routing table built from OpenAPI route metadata.
///
/// Routes are tried in document order; the first match wins.
pub struct Router {
    routes: Vec<CompiledRoute>,
    base_path: String,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("routes", &self.route_summaries())
            .finish()
    }
}

impl Router {
    /// Compile the routing table.
    ///
    /// # Errors
    ///
    /// Returns an error if a path template cannot be compiled.
    pub fn new(routes: Vec<RouteMeta>) -> Result<Self, regex::Error> {
        let base_path = routes
            .first()
            .map(|r| r.base_path.clone())
            .unwrap_or_default();

        let routes = routes
            .into_iter()
            .map(|route| {
                let full_path = format!("{}{}", route.base_path, route.path_pattern);
                let (regex, param_names) = Self::path_to_regex(&full_path)?;
                Ok(CompiledRoute {
                    method: route.method.clone(),
                    regex,
                    meta: Arc::new(route),
                    param_names,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let router = Self { routes, base_path };
        info!(
            routes_count = router.routes.len(),
            base_path = %router.base_path,
            routes = ?router.route_summaries(),
            "Routing table loaded"
        );
        Ok(router)
    }

    /// Route metadata in document order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> {
        self.routes.iter().map(|r| r.meta.as_ref())
    }

    /// `"METHOD /path -> handler"` for every route, for logs and debugging.
    #[must_use]
    pub fn route_summaries(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| {
                format!(
                    "{} {}{} -> {}",
                    r.method, self.base_path, r.meta.path_pattern, r.meta.handler_name
                )
            })
            .collect()
    }

    /// Match `method` and `path` (no query string) to a route.
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let matched = self.routes.iter().filter(|r| r.method == method).find_map(|r| {
            let caps = r.regex.captures(path)?;
            let path_params = r
                .param_names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, value)| Some((Arc::clone(name), decode_segment(value?.as_str()))))
                .collect::<ParamVec>();
            Some(RouteMatch {
                route: Arc::clone(&r.meta),
                path_params,
                handler_name: Arc::clone(&r.meta.handler_name),
            })
        });

        match &matched {
            Some(m) => debug!(
                method = %method,
                path = %path,
                handler_name = %m.handler_name,
                route_pattern = %m.route.path_pattern,
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        matched
    }

    /// `true` if any route, regardless of method, matches `path`.
    #[must_use]
    pub fn allows_path(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.regex.is_match(path))
    }

    /// Methods declared for `path`.
    #[must_use]
    pub fn methods_for(&self, path: &str) -> Vec<Method> {
        self.routes
            .iter()
            .filter(|r| r.regex.is_match(path))
            .map(|r| r.method.clone())
            .collect()
    }

    /// Convert `/users/{id}` into `^/users/([^/]+)$` plus `["id"]`.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

/// Percent-decode one path segment; undecodable input is kept verbatim.
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

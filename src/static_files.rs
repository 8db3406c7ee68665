//! Files served from the docs directory.
//!
//! HTML files can be rendered as `minijinja` templates with a JSON context.

use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL path below `base_dir`. Anything that would escape it
    /// (`..`, absolute paths) maps to `None`.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "yaml" | "yml" => "text/yaml",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Read `url_path`, rendering it with `ctx` if it is an HTML file and a
    /// context is given. Returns the bytes and their content type.
    pub fn load(&self, url_path: &str, ctx: Option<&JsonValue>) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let content_type = Self::content_type(&path);
        match ctx {
            Some(ctx) if path.extension().and_then(|s| s.to_str()) == Some("html") => {
                let source = fs::read_to_string(&path)?;
                let env = Environment::new();
                let rendered = env
                    .render_str(&source, ctx)
                    .map_err(io::Error::other)?;
                Ok((rendered.into_bytes(), content_type))
            }
            _ => Ok((fs::read(&path)?, content_type)),
        }
    }
}

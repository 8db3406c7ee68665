//! # Service Configuration
//!
//! Loaded from a YAML file (default `config/config.yaml`) and then overridden
//! from the environment:
//!
//! | Variable                 | Overrides        |
//! |--------------------------|------------------|
//! | `ADOPTION_ADDR`          | `http.addr`      |
//! | `ADOPTION_STORE_BACKEND` | `store.backend`  |
//! | `ADOPTION_DB_PATH`       | `store.path`     |
//!
//! Every section and key is optional. A missing file is not an error: the
//! built-in defaults apply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which [`crate::store::StatusStore`] implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Memory => "memory",
        })
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "store.backend",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address, `host:port`
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3014".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file; ignored by the memory backend
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: PathBuf::from("data/adoption.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `"*"` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// OpenAPI document: routes are built from it and it is served at
    /// `/openapi.yaml`
    pub spec_path: PathBuf,
    /// Directory holding the Swagger UI `index.html`; `null` disables
    /// `/updateStatus-docs`
    pub doc_dir: Option<PathBuf>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            spec_path: PathBuf::from("doc/openapi.yaml"),
            doc_dir: Some(PathBuf::from("doc")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
    pub docs: DocsConfig,
}

impl AppConfig {
    /// Read `path` (if it exists) and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read `path` without environment overrides; defaults if it is missing.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?config, "Config file loaded");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Apply `ADOPTION_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("ADOPTION_ADDR").filter(|v| !v.trim().is_empty()) {
            self.http.addr = addr.trim().to_string();
        }
        if let Some(backend) = lookup("ADOPTION_STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(path) = lookup("ADOPTION_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(path.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.addr, "0.0.0.0:3014");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("data/adoption.db"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.cors.allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.docs.spec_path, PathBuf::from("doc/openapi.yaml"));
        assert_eq!(config.docs.doc_dir, Some(PathBuf::from("doc")));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml("store:\n  backend: memory\n").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_docs_can_be_disabled() {
        let config = AppConfig::from_yaml("docs:\n  doc_dir: null\n").unwrap();
        assert_eq!(config.docs.doc_dir, None);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = AppConfig::from_file(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::from_file("config/does-not-exist.yaml").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "store: [not, a, mapping]\n").unwrap();
        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ADOPTION_ADDR", "127.0.0.1:9000"),
            ("ADOPTION_STORE_BACKEND", "Memory"),
            ("ADOPTION_DB_PATH", "/tmp/adoption.db"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.http.addr, "127.0.0.1:9000");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.path, PathBuf::from("/tmp/adoption.db"));
    }

    #[test]
    fn test_invalid_backend_override() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "ADOPTION_STORE_BACKEND").then(|| "postgres".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "store.backend", .. }
        ));
    }
}

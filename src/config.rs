//! Connection configuration.
//!
//! Loaded from the following sources, highest priority first:
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`UGV_GRAPH_BACKEND`, `NEO4J_URI`,
//!    `NEO4J_USER`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`)
//! 3. `ugv-graph.toml` in the working directory, or an explicit path
//! 4. Built-in defaults (memory backend)

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::BackendConfig;

pub const DEFAULT_CONFIG_FILE: &str = "ugv-graph.toml";
pub const DEFAULT_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_USER: &str = "neo4j";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Bolt,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "bolt" | "neo4j" => Ok(BackendKind::Bolt),
            other => Err(ConfigError::Invalid(format!("unknown backend '{other}'"))),
        }
    }
}

/// Graph connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: BackendKind,
    pub uri: String,
    pub user: String,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            uri: DEFAULT_URI.to_string(),
            user: DEFAULT_USER.to_string(),
            password: None,
            database: None,
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("backend", &self.backend)
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

impl GraphConfig {
    /// Load from `path`, or from `ugv-graph.toml` when present, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file, without overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from `lookup`, which maps an environment variable
    /// name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("UGV_GRAPH_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(uri) = lookup("NEO4J_URI") {
            self.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.database = Some(database).filter(|d| !d.is_empty());
        }
        Ok(())
    }

    /// Resolve into a backend description. Bolt requires a password.
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        match self.backend {
            BackendKind::Memory => Ok(BackendConfig::Memory),
            BackendKind::Bolt => {
                let password = self.password.clone().ok_or_else(|| {
                    ConfigError::Invalid("bolt backend requires a password (NEO4J_PASSWORD)".into())
                })?;
                if self.uri.trim().is_empty() {
                    return Err(ConfigError::Invalid("bolt backend requires a URI".into()));
                }
                Ok(BackendConfig::Bolt {
                    uri: self.uri.clone(),
                    user: self.user.clone(),
                    password,
                    database: self.database.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_memory() {
        let config = GraphConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert!(matches!(config.backend_config().unwrap(), BackendConfig::Memory));
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config: GraphConfig = toml::from_str(
            r#"
            backend = "bolt"
            uri = "bolt://file-host:7687"
            user = "file-user"
            "#,
        )
        .unwrap();
        config
            .apply_overrides(env(&[("NEO4J_URI", "bolt://env-host:7687"), ("NEO4J_PASSWORD", "s3cret")]))
            .unwrap();

        assert_eq!(config.uri, "bolt://env-host:7687");
        assert_eq!(config.user, "file-user");
        match config.backend_config().unwrap() {
            BackendConfig::Bolt { uri, password, .. } => {
                assert_eq!(uri, "bolt://env-host:7687");
                assert_eq!(password, "s3cret");
            }
            other => panic!("expected bolt, got {other:?}"),
        }
    }

    #[test]
    fn test_bolt_without_password_is_invalid() {
        let mut config = GraphConfig::default();
        config.apply_overrides(env(&[("UGV_GRAPH_BACKEND", "bolt")])).unwrap();
        assert!(matches!(config.backend_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = GraphConfig::default();
        let err = config.apply_overrides(env(&[("UGV_GRAPH_BACKEND", "sqlite")]));
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = GraphConfig { password: Some("hunter2".into()), ..GraphConfig::default() };
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }
}

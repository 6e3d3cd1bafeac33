#![deny(unsafe_code)]

//! Configuration loading and validation for tagtree.
//!
//! Loads TOML configuration files and validates them. Provides the
//! [`AppConfig`] type as the central configuration structure consumed by the
//! CLI and by registry construction.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry source and resolution settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to do when the tag graph contains a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Fail registry construction.
    #[default]
    Reject,
    /// Stop walking at the repeated key and record a diagnostic.
    Truncate,
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Truncate => write!(f, "truncate"),
        }
    }
}

/// Registry source and resolution settings.
///
/// ## TOML Example
///
/// ```toml
/// [registry]
/// source = "https://example.com/assets/registry.json"
/// field_tag = "field"
/// max_depth = 8
/// cycle_policy = "truncate"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// File path or `http(s)://` URL of the JSON index.
    #[serde(default = "default_source")]
    pub source: String,

    /// Sentinel tag marking a node as a configurable field.
    #[serde(default = "default_field_tag")]
    pub field_tag: String,

    /// Ancestor levels to walk when flattening (unbounded when absent).
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Cycle handling during flattening.
    #[serde(default)]
    pub cycle_policy: CyclePolicy,

    /// HTTP timeout in seconds when `source` is a URL.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            field_tag: default_field_tag(),
            max_depth: None,
            cycle_policy: CyclePolicy::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RegistryConfig {
    /// Whether `source` names a remote URL rather than a local file.
    pub fn is_remote(&self) -> bool {
        is_remote_source(&self.source)
    }
}

/// Whether a catalog source string is an `http://` or `https://` URL.
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn default_source() -> String {
    "registry.json".to_string()
}

fn default_field_tag() -> String {
    "field".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.source.trim().is_empty() {
            return Err(ConfigError::Validation(
                "registry.source must not be empty".to_string(),
            ));
        }
        if self.registry.field_tag.trim().is_empty() {
            return Err(ConfigError::Validation(
                "registry.field_tag must not be empty".to_string(),
            ));
        }
        if self.registry.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "registry.timeout_secs must be non-zero".to_string(),
            ));
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }
        Ok(())
    }
}

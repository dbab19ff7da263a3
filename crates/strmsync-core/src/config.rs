//! Configuration module for strmsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{ContentMode, RefreshMode, DEFAULT_CONCURRENCY};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for strmsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alist: AlistConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub defaults: MappingDefaults,
}

/// Connection settings for the OpenList/Alist server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlistConfig {
    /// Base URL of the server, e.g. `http://nas.local:5244`.
    pub url: String,
    /// API token sent verbatim in the `Authorization` header.
    pub token: String,
    /// Append `?sign=` to fallback download URLs.
    pub sign_enabled: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Match listing extensions case-sensitively (`.MP4` is not `.mp4`).
    pub case_sensitive_extensions: bool,
}

/// SQLite storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Daemon scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Register cron schedules at startup.
    pub enabled: bool,
    /// Seconds between reconciliations of the schedule table with storage.
    pub reload_interval_secs: u64,
    /// Task records kept by the daemon's periodic pruning; 0 keeps everything.
    pub task_retention: u32,
}

/// Policy applied to mappings created without explicit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingDefaults {
    pub extensions: Vec<String>,
    pub concurrency: i64,
    pub mode: RefreshMode,
    pub content_mode: ContentMode,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/strmsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("strmsync")
            .join("config.yaml")
    }

    /// Serialize back to YAML, as shown by `strmsync config show`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AlistConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5244".into(),
            token: String::new(),
            sign_enabled: false,
            timeout_secs: 30,
            case_sensitive_extensions: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("strmsync")
                .join("strmsync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reload_interval_secs: 60,
            task_retention: 1000,
        }
    }
}

impl Default for MappingDefaults {
    fn default() -> Self {
        Self {
            extensions: ["mp4", "mkv", "avi", "mov", "wmv", "flv", "m4v", "ts"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            concurrency: DEFAULT_CONCURRENCY as i64,
            mode: RefreshMode::Incremental,
            content_mode: ContentMode::PathReference,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"alist.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- alist ---
        let url = self.alist.url.trim();
        if url.is_empty() {
            errors.push(ValidationError::new("alist.url", "must not be empty"));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "alist.url",
                format!("must start with http:// or https://, got '{url}'"),
            ));
        }
        if self.alist.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "alist.timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError::new("database.path", "must not be empty"));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "must be one of {:?}, got '{}'",
                    VALID_LOG_LEVELS, self.logging.level
                ),
            ));
        }

        // --- scheduler ---
        if self.scheduler.reload_interval_secs == 0 {
            errors.push(ValidationError::new(
                "scheduler.reload_interval_secs",
                "must be greater than 0",
            ));
        }

        // --- defaults ---
        if self.defaults.extensions.is_empty() {
            errors.push(ValidationError::new(
                "defaults.extensions",
                "must list at least one extension",
            ));
        }
        if self
            .defaults
            .extensions
            .iter()
            .any(|ext| ext.trim().is_empty() || ext.contains('/'))
        {
            errors.push(ValidationError::new(
                "defaults.extensions",
                "entries must be non-empty and must not contain '/'",
            ));
        }
        if self.defaults.concurrency < 0 {
            errors.push(ValidationError::new(
                "defaults.concurrency",
                "must not be negative (0 selects the built-in default)",
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], mainly used by tests and the CLI.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- alist ---

    pub fn alist_url(mut self, url: impl Into<String>) -> Self {
        self.config.alist.url = url.into();
        self
    }

    pub fn alist_token(mut self, token: impl Into<String>) -> Self {
        self.config.alist.token = token.into();
        self
    }

    pub fn alist_sign_enabled(mut self, enabled: bool) -> Self {
        self.config.alist.sign_enabled = enabled;
        self
    }

    pub fn alist_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.alist.timeout_secs = seconds;
        self
    }

    pub fn alist_case_sensitive_extensions(mut self, sensitive: bool) -> Self {
        self.config.alist.case_sensitive_extensions = sensitive;
        self
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- scheduler ---

    pub fn scheduler_enabled(mut self, enabled: bool) -> Self {
        self.config.scheduler.enabled = enabled;
        self
    }

    pub fn scheduler_reload_interval_secs(mut self, seconds: u64) -> Self {
        self.config.scheduler.reload_interval_secs = seconds;
        self
    }

    pub fn scheduler_task_retention(mut self, keep: u32) -> Self {
        self.config.scheduler.task_retention = keep;
        self
    }

    // --- defaults ---

    pub fn default_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.defaults.extensions = extensions;
        self
    }

    pub fn default_concurrency(mut self, concurrency: i64) -> Self {
        self.config.defaults.concurrency = concurrency;
        self
    }

    pub fn default_mode(mut self, mode: RefreshMode) -> Self {
        self.config.defaults.mode = mode;
        self
    }

    pub fn default_content_mode(mut self, mode: ContentMode) -> Self {
        self.config.defaults.content_mode = mode;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

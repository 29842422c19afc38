//! Configuration module for the Midas client.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{credentials::parse_server_url, Email, DEFAULT_APPLICATION};
use crate::usecases::UploadOptions;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub account: AccountConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Midas server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the Midas instance, without the `/api/json` suffix.
    pub url: String,
    /// Application name the API key is registered under.
    pub application: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Account settings. The API key itself normally lives in the system keyring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub email: Option<String>,
    /// Plain-text API key; only consulted when no keyring entry exists.
    pub api_key: Option<String>,
}

/// Defaults for the `upload` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// User folder name or absolute server path.
    pub destination: String,
    pub leaf_folders_as_items: bool,
    pub reuse_existing: bool,
    /// Run DICOM metadata extraction after each item.
    pub extract_dicom: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at the given path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a YAML file, returning defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Return the default configuration file path.
    ///
    /// Uses `dirs::config_dir()` (typically `~/.config`) joined with
    /// `midas/config.yaml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("midas")
            .join("config.yaml")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "https://midas.example.org".to_string(),
            application: DEFAULT_APPLICATION.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            destination: "Private".to_string(),
            leaf_folders_as_items: false,
            reuse_existing: false,
            extract_dicom: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn options(&self) -> UploadOptions {
        UploadOptions {
            leaf_folders_as_items: self.leaf_folders_as_items,
            reuse_existing: self.reuse_existing,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error with the offending field path and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        if let Err(e) = parse_server_url(&self.server.url) {
            errors.push(ValidationError {
                field: "server.url".into(),
                message: e.to_string(),
            });
        }
        if self.server.application.trim().is_empty() {
            errors.push(ValidationError {
                field: "server.application".into(),
                message: "must not be empty".into(),
            });
        }
        if self.server.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "server.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- account ---
        if let Some(email) = &self.account.email {
            if let Err(e) = Email::new(email.clone()) {
                errors.push(ValidationError {
                    field: "account.email".into(),
                    message: e.to_string(),
                });
            }
        }

        // --- upload ---
        if self.upload.destination.trim().is_empty() {
            errors.push(ValidationError {
                field: "upload.destination".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.url = url.into();
        self
    }

    pub fn server_application(mut self, application: impl Into<String>) -> Self {
        self.config.server.application = application.into();
        self
    }

    pub fn server_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.server.timeout_secs = seconds;
        self
    }

    // --- account ---

    pub fn account_email(mut self, email: impl Into<String>) -> Self {
        self.config.account.email = Some(email.into());
        self
    }

    pub fn account_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.account.api_key = Some(api_key.into());
        self
    }

    // --- upload ---

    pub fn upload_destination(mut self, destination: impl Into<String>) -> Self {
        self.config.upload.destination = destination.into();
        self
    }

    pub fn upload_leaf_folders_as_items(mut self, enabled: bool) -> Self {
        self.config.upload.leaf_folders_as_items = enabled;
        self
    }

    pub fn upload_reuse_existing(mut self, enabled: bool) -> Self {
        self.config.upload.reuse_existing = enabled;
        self
    }

    pub fn upload_extract_dicom(mut self, enabled: bool) -> Self {
        self.config.upload.extract_dicom = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the config or all errors.
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

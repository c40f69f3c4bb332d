//! Application configuration module
//!
//! Provides the configuration types for the attendance client: connection to
//! the hosted store, load bounds, timeouts and the merge window for confirmed
//! writes. Values come from defaults, an optional TOML file and the builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Upper bound on attendance rows fetched by a full refresh
pub const DEFAULT_ATTENDANCE_ROW_LIMIT: usize = 10_000;
/// Per-request transport timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// How long confirmed writes override stale rows from a refresh
pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_secs(30);
/// Absences at which a student counts as a critical alert
pub const DEFAULT_CRITICAL_ABSENCES: usize = 4;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the hosted store
    pub server_url: Option<String>,
    /// Public API key sent with every request
    pub api_key: Option<String>,
    pub attendance_row_limit: usize,
    pub request_timeout: Duration,
    pub merge_window: Duration,
    pub critical_absences: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            attendance_row_limit: DEFAULT_ATTENDANCE_ROW_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            merge_window: DEFAULT_MERGE_WINDOW,
            critical_absences: DEFAULT_CRITICAL_ABSENCES,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        AppConfigBuilder::from_toml_str(source)?.build()
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        AppConfigBuilder::from_file(path)?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.attendance_row_limit == 0 {
            return Err(ConfigError::invalid("attendance_row_limit", "must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be greater than zero"));
        }
        Ok(())
    }
}

/// On-disk form; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    api_key: Option<String>,
    attendance_row_limit: Option<usize>,
    request_timeout_secs: Option<u64>,
    merge_window_secs: Option<u64>,
    critical_absences: Option<usize>,
}

/// Builder for AppConfig
#[derive(Debug, Default, Clone)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    api_key: Option<String>,
    attendance_row_limit: Option<usize>,
    request_timeout: Option<Duration>,
    merge_window: Option<Duration>,
    critical_absences: Option<usize>,
}

impl AppConfigBuilder {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(source)?;
        Ok(Self {
            server_url: file.server_url,
            api_key: file.api_key,
            attendance_row_limit: file.attendance_row_limit,
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
            merge_window: file.merge_window_secs.map(Duration::from_secs),
            critical_absences: file.critical_absences,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn attendance_row_limit(mut self, limit: usize) -> Self {
        self.attendance_row_limit = Some(limit);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn merge_window(mut self, window: Duration) -> Self {
        self.merge_window = Some(window);
        self
    }

    pub fn critical_absences(mut self, threshold: usize) -> Self {
        self.critical_absences = Some(threshold);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self
                .server_url
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key: self.api_key,
            attendance_row_limit: self
                .attendance_row_limit
                .unwrap_or(defaults.attendance_row_limit),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            merge_window: self.merge_window.unwrap_or(defaults.merge_window),
            critical_absences: self.critical_absences.unwrap_or(defaults.critical_absences),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            message: message.into(),
        }
    }
}

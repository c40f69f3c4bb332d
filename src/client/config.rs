use std::path::PathBuf;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default server URL (local development stack of the hosted store)
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:54321";

const ENV_CONFIG_PATH: &str = "ROLLCALL_CONFIG";
const ENV_API_URL: &str = "ROLLCALL_API_URL";
const ENV_API_KEY: &str = "ROLLCALL_API_KEY";
const ENV_ACCESS_TOKEN: &str = "ROLLCALL_ACCESS_TOKEN";
const ENV_ROW_LIMIT: &str = "ROLLCALL_ROW_LIMIT";

/// Session configuration: application settings plus the access token.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app(app: AppConfig) -> Self {
        Self { app, token: None }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::from_app(builder.build()?))
    }

    /// Resolve defaults, then the config file, then environment overrides.
    ///
    /// The file is `$ROLLCALL_CONFIG` when set, otherwise
    /// `<config dir>/rollcall/config.toml` if it exists.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = match Self::config_path() {
            Some(path) => {
                tracing::debug!("[CONFIG] reading {}", path.display());
                AppConfigBuilder::from_file(path)?
            }
            None => AppConfigBuilder::default(),
        };
        let builder = Self::apply_env(builder)?;

        let mut config = Self::with_builder(builder)?;
        config.token = std::env::var(ENV_ACCESS_TOKEN).ok().filter(|t| !t.is_empty());
        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }
        let mut path = dirs::config_dir()?;
        path.push("rollcall");
        path.push("config.toml");
        path.exists().then_some(path)
    }

    fn apply_env(mut builder: AppConfigBuilder) -> Result<AppConfigBuilder, ConfigError> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            builder = builder.server_url(url);
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Ok(limit) = std::env::var(ENV_ROW_LIMIT) {
            let limit = limit
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("attendance_row_limit", format!("not a number: {}", limit)))?;
            builder = builder.attendance_row_limit(limit);
        }
        Ok(builder)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the session access token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the session access token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }
}

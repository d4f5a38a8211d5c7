//! Realtime client configuration
//!
//! Loaded from YAML, then overridden from the environment (`.env` is read
//! first when present):
//!
//! | Variable        | Field          |
//! |-----------------|----------------|
//! | `WEBSOCKET_URL` | `ws_url`       |
//! | `API_BASE_URL`  | `api_base_url` |
//! | `AUTH_TOKEN`    | `auth_token`   |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Realtime endpoint (ws:// or wss://)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// REST base used for the identity lookup
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Fixed delay between reconnection attempts
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Consecutive failed attempts before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: usize,

    /// Delay between an open and the presence snapshot request
    #[serde(default = "default_presence_request_delay_ms")]
    pub presence_request_delay_ms: u64,

    /// Key of the auth token in the key/value store
    #[serde(default = "default_auth_token_key")]
    pub auth_token_key: String,

    /// Initial notification sound preference
    #[serde(default)]
    pub notification_sound: bool,

    /// When set, notification tones are rendered to this WAV file instead
    /// of ringing the terminal bell
    #[serde(default)]
    pub notification_tone_path: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Token from .env (not in YAML)
    #[serde(skip)]
    pub auth_token: Option<String>,
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_reconnect_interval_ms() -> u64 {
    5000
}

fn default_max_reconnect_attempts() -> usize {
    5
}

fn default_presence_request_delay_ms() -> u64 {
    500
}

fn default_auth_token_key() -> String {
    crate::infrastructure::identity::AUTH_TOKEN_KEY.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_base_url: default_api_base_url(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            presence_request_delay_ms: default_presence_request_delay_ms(),
            auth_token_key: default_auth_token_key(),
            notification_sound: false,
            notification_tone_path: None,
            log_level: default_log_level(),
            auth_token: None,
        }
    }
}

impl RealtimeConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::parse(&yaml_content)?;

        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a YAML file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without touching the environment
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WEBSOCKET_URL") {
            info!("Overriding WebSocket URL from environment variable");
            self.ws_url = url;
        }
        if let Ok(url) = std::env::var("API_BASE_URL") {
            info!("Overriding API base URL from environment variable");
            self.api_base_url = url;
        }
        if let Ok(token) = std::env::var("AUTH_TOKEN") {
            if !token.is_empty() {
                self.auth_token = Some(token);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "ws_url must start with ws:// or wss://, got {}",
                self.ws_url
            )));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api_base_url must start with http:// or https://, got {}",
                self.api_base_url
            )));
        }

        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.presence_request_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "presence_request_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.auth_token_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth_token_key cannot be empty".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn presence_request_delay(&self) -> Duration {
        Duration::from_millis(self.presence_request_delay_ms)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  WebSocket URL: {}", self.ws_url);
        info!("  API base URL: {}", self.api_base_url);
        info!(
            "  Reconnect: every {} ms, at most {} attempts",
            self.reconnect_interval_ms, self.max_reconnect_attempts
        );
        info!("  Presence request delay: {} ms", self.presence_request_delay_ms);
        info!("  Notification sound: {}", self.notification_sound);
        if let Some(path) = &self.notification_tone_path {
            info!("  Notification tone file: {}", path);
        }
        info!("  Auth token: {}", if self.auth_token.is_some() { "set" } else { "not set" });
        info!("  Log level: {}", self.log_level);
    }
}

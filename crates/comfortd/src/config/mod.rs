//! Configuration file parsing and structures.
//!
//! comfortd reads an optional TOML file; command line flags and environment
//! variables take precedence over it (see [`crate::cli`]).

mod diagnostics;

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use comfortd_cloud::HttpSessionConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

pub use diagnostics::format_parse_error;
pub use diagnostics::format_validation_errors;
pub use diagnostics::ValidationError;

fn default_update_interval() -> u64 {
    60
}

fn default_broker() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "comfortd".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parse failure, already rendered against the source file
    #[error("{report}")]
    Parse { path: PathBuf, report: String },

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Invalid(Vec<ValidationError>),
}

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `rumqttc = "warn"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Filter for the fmt subscriber
    pub fn targets(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

/// Comfort Cloud account
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    pub username: Option<String>,
    pub password: Option<String>,

    /// Seconds between polls of each device
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Override of the API endpoint
    pub base_url: Option<String>,

    /// App version reported to the API
    pub app_version: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            update_interval: default_update_interval(),
            base_url: None,
            app_version: None,
        }
    }
}

impl CloudConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    /// Settings for the HTTP session. Credentials must have been validated.
    pub fn session_config(&self) -> HttpSessionConfig {
        let mut config = HttpSessionConfig::new(
            self.username.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        );
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(app_version) = &self.app_version {
            config.app_version = app_version.clone();
        }
        config
    }
}

/// MQTT broker connection
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address
    #[serde(default = "default_broker")]
    pub broker: String,

    /// MQTT broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// MQTT client ID
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Home Assistant discovery prefix (default: "homeassistant")
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,

    /// Optional username for authentication
    pub username: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            client_id: default_client_id(),
            discovery_prefix: default_discovery_prefix(),
            username: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse configuration text; `path` is only used for error reports
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            report: format_parse_error(path, content, &e),
        })
    }

    /// Check the merged configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.cloud.username.as_deref().is_none_or(str::is_empty) {
            errors.push(ValidationError::new(
                "cloud.username",
                "Comfort Cloud username is required",
            ));
        }
        if self.cloud.password.as_deref().is_none_or(str::is_empty) {
            errors.push(ValidationError::new(
                "cloud.password",
                "Comfort Cloud password is required",
            ));
        }
        if self.cloud.update_interval == 0 {
            errors.push(ValidationError::new(
                "cloud.update_interval",
                "must be at least one second",
            ));
        }
        if self.mqtt.port == 0 {
            errors.push(ValidationError::new("mqtt.port", "must not be 0"));
        }

        let prefix = &self.mqtt.discovery_prefix;
        if prefix.is_empty() {
            errors.push(ValidationError::new(
                "mqtt.discovery_prefix",
                "must not be empty",
            ));
        } else if prefix.contains('/') {
            errors.push(ValidationError::new(
                "mqtt.discovery_prefix",
                format!("'{}' must be a single topic segment", prefix),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

//! Configuration for the uptime agent.

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the uptime agent.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway WebSocket connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway address (e.g. `wss://gateway.example.com/ws`).
    pub host: String,
    /// Credential sent as the `Authorization` header.
    pub identify: String,
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,
    /// Reconnect attempts stop on the tick where the counter exceeds this value.
    #[serde(default = "default_max_reconnect_tries")]
    pub max_reconnect_tries: u32,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// Force-close the connection when no pong arrived for longer than this.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    /// Give up on a pending WebSocket handshake after this long (unset = wait forever).
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set.
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

/// Timer settings of a gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimings {
    pub reconnect_interval: Duration,
    pub max_reconnect_tries: u32,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
}

impl Default for ConnectionTimings {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(default_reconnect_interval()),
            max_reconnect_tries: default_max_reconnect_tries(),
            heartbeat_interval: Duration::from_secs(default_heartbeat_interval()),
            heartbeat_timeout: Duration::from_secs(default_heartbeat_timeout()),
        }
    }
}

impl From<&GatewayConfig> for ConnectionTimings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            reconnect_interval: Duration::from_secs(config.reconnect_interval_secs),
            max_reconnect_tries: config.max_reconnect_tries,
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(config.heartbeat_timeout_secs),
        }
    }
}

// Default values
fn default_reconnect_interval() -> u64 {
    30
}
fn default_max_reconnect_tries() -> u32 {
    3
}
fn default_heartbeat_interval() -> u64 {
    45
}
fn default_heartbeat_timeout() -> u64 {
    90
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (UPTIME__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(File::with_name("config").required(false))?
            .build()?
            .try_deserialize()
    }

    /// Load configuration from an explicit file, still honoring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder(File::from(path).required(true))?
            .build()?
            .try_deserialize()
    }

    fn builder<S>(file: S) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Ok(ConfigLoader::builder()
            // Set defaults
            .set_default("gateway.reconnect_interval_secs", default_reconnect_interval() as i64)?
            .set_default("gateway.max_reconnect_tries", default_max_reconnect_tries() as i64)?
            .set_default("gateway.heartbeat_interval_secs", default_heartbeat_interval() as i64)?
            .set_default("gateway.heartbeat_timeout_secs", default_heartbeat_timeout() as i64)?
            .set_default("logging.level", default_log_level())?
            .add_source(file)
            // Override with environment variables (UPTIME__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("UPTIME")
                    .separator("__")
                    .try_parsing(true),
            ))
    }
}

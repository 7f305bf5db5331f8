//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session token and access settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "herald_events=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens. When empty a random key is generated at
    /// startup and tokens do not survive a restart.
    #[serde(default)]
    pub token_secret: String,

    /// Session token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Refuse live-update streams to anonymous callers.
    #[serde(default)]
    pub require_for_subscriptions: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    4000
}

fn default_db_path() -> String {
    "herald.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    herald_db::DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    herald_db::DbRuntimeSettings::default().pool_max_size
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl DatabaseConfig {
    pub fn runtime_settings(&self) -> herald_db::DbRuntimeSettings {
        herald_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            require_for_subscriptions: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override held a value of the wrong shape.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HERALD_HOST` overrides `server.host`
/// - `HERALD_PORT` overrides `server.port`
/// - `HERALD_DB_PATH` overrides `database.path`
/// - `HERALD_LOG_LEVEL` overrides `logging.level`
/// - `HERALD_LOG_JSON` overrides `logging.json` ("true" or "1" to enable)
/// - `HERALD_TOKEN_SECRET` overrides `auth.token_secret`
/// - `HERALD_TOKEN_TTL_SECS` overrides `auth.token_ttl_secs`
/// - `HERALD_REQUIRE_AUTH_FOR_SUBSCRIPTIONS` overrides `auth.require_for_subscriptions`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if a numeric or address override does not parse.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides(
    mut config: Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    fn parsed<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
        value
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { name, value })
    }
    fn flag(value: &str) -> bool {
        value == "true" || value == "1"
    }

    if let Some(host) = var("HERALD_HOST") {
        config.server.host = parsed("HERALD_HOST", host)?;
    }
    if let Some(port) = var("HERALD_PORT") {
        config.server.port = parsed("HERALD_PORT", port)?;
    }
    if let Some(db_path) = var("HERALD_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("HERALD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("HERALD_LOG_JSON") {
        config.logging.json = flag(&json);
    }
    if let Some(secret) = var("HERALD_TOKEN_SECRET") {
        config.auth.token_secret = secret;
    }
    if let Some(ttl) = var("HERALD_TOKEN_TTL_SECS") {
        config.auth.token_ttl_secs = parsed("HERALD_TOKEN_TTL_SECS", ttl)?;
    }
    if let Some(required) = var("HERALD_REQUIRE_AUTH_FOR_SUBSCRIPTIONS") {
        config.auth.require_for_subscriptions = flag(&required);
    }

    Ok(config)
}

//! Configuration management for channeld
//!
//! Defaults can be overridden from a TOML file or from `CHANNELD_*`
//! environment variables. Every loader validates before returning.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::logging::{LogConfig, LogLevel};

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_address: SocketAddr,

    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

/// Which channel store backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    #[default]
    Memory,
    /// SQLite database under `data_dir`
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(ConfigError::InvalidValue(format!("Unknown store backend: {}", other))),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Directory holding `channels.db` for the sqlite backend
    pub data_dir: PathBuf,

    /// Maximum pooled SQLite connections
    pub pool_size: u32,

    /// How long to wait for a pooled connection
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data"),
            pool_size: 8,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Convert into the logging subsystem's own configuration
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        let level: LogLevel = self
            .level
            .parse()
            .map_err(|e: crate::logging::LoggingError| ConfigError::InvalidValue(e.to_string()))?;

        Ok(LogConfig::new(level)
            .with_target(self.with_target)
            .json_format(self.json_format))
    }
}

fn parse_value<T>(raw: &str, what: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e)))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables follow the pattern `CHANNELD_<SECTION>_<KEY>`, e.g.
    /// `CHANNELD_SERVER_BIND_ADDRESS=0.0.0.0:8080`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay any `CHANNELD_*` variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Overlay `CHANNELD_*` values produced by `lookup`
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CHANNELD_SERVER_BIND_ADDRESS") {
            self.server.bind_address = parse_value(&raw, "bind address")?;
        }
        if let Some(raw) = lookup("CHANNELD_SERVER_MAX_BODY_BYTES") {
            self.server.max_body_bytes = parse_value(&raw, "body limit")?;
        }

        if let Some(raw) = lookup("CHANNELD_STORE_BACKEND") {
            self.store.backend = parse_value(&raw, "store backend")?;
        }
        if let Some(data_dir) = lookup("CHANNELD_STORE_DATA_DIR") {
            self.store.data_dir = PathBuf::from(data_dir);
        }
        if let Some(raw) = lookup("CHANNELD_STORE_POOL_SIZE") {
            self.store.pool_size = parse_value(&raw, "pool size")?;
        }

        if let Some(level) = lookup("CHANNELD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = lookup("CHANNELD_LOG_JSON") {
            self.logging.json_format = parse_value(&raw, "JSON flag")?;
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Encode(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.server.bind_address.port(), 8080);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.max_body_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.store.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.to_log_config().unwrap().level, LogLevel::Debug);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("sqlite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channeld.toml");

        let mut config = Config::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.connection_timeout = Duration::from_millis(1500);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.store.backend, StoreBackend::Sqlite);
        assert_eq!(loaded.store.connection_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[store]\nbackend = \"sqlite\"\npool_size = 2\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.store.pool_size, 2);
        assert_eq!(loaded.server.max_body_bytes, 1024 * 1024);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nbind_address = 1").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("CHANNELD_SERVER_BIND_ADDRESS", "0.0.0.0:9090"),
                ("CHANNELD_SERVER_MAX_BODY_BYTES", "2048"),
                ("CHANNELD_STORE_BACKEND", "sqlite"),
                ("CHANNELD_STORE_DATA_DIR", "/var/lib/channeld"),
                ("CHANNELD_STORE_POOL_SIZE", "3"),
                ("CHANNELD_LOG_LEVEL", "debug"),
                ("CHANNELD_LOG_JSON", "true"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind_address.port(), 9090);
        assert_eq!(config.server.max_body_bytes, 2048);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.data_dir, PathBuf::from("/var/lib/channeld"));
        assert_eq!(config.store.pool_size, 3);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_env_unset_keeps_values() {
        let mut config = Config::default();
        config.store.pool_size = 5;
        config.apply_vars(vars(&[])).unwrap();
        assert_eq!(config.store.pool_size, 5);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_env_bad_value_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_vars(vars(&[("CHANNELD_STORE_POOL_SIZE", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("pool size"));

        let err = config
            .apply_vars(vars(&[("CHANNELD_SERVER_BIND_ADDRESS", "not-an-address")]))
            .unwrap_err();
        assert!(err.to_string().contains("bind address"));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/channeld.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}

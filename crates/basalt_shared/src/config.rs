//! # Server Configuration
//!
//! Loaded once at startup from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields a working loopback server.
//!
//! ```toml
//! bind_address = "0.0.0.0:25565"
//! read_timeout_ms = 5000
//! poll_interval_ms = 10
//! log_level = "info"
//!
//! [status]
//! version_name = "1.21.1"
//! protocol_version = 767
//! max_players = 20
//! motd = "A Basalt Server"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    DEFAULT_PORT, MAX_PLAYERS, MOTD, POLL_INTERVAL_MS, PROTOCOL_VERSION, READ_TIMEOUT_MS,
    VERSION_NAME,
};

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML or has mistyped fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Server configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_address: SocketAddr,
    /// Inactivity window before a connection is dropped.
    pub read_timeout_ms: u64,
    /// Sleep between non-blocking read attempts.
    pub poll_interval_ms: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Values advertised in the status response.
    pub status: StatusConfig,
}

/// Values advertised to clients in the server list.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Human-readable version name.
    pub version_name: String,
    /// Protocol version number.
    pub protocol_version: i32,
    /// Player cap shown in the list.
    pub max_players: u32,
    /// Message of the day.
    pub motd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            read_timeout_ms: READ_TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            log_level: "info".to_owned(),
            status: StatusConfig::default(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            version_name: VERSION_NAME.to_owned(),
            protocol_version: PROTOCOL_VERSION,
            max_players: MAX_PLAYERS,
            motd: MOTD.to_owned(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when [`ServerConfig::validate`] fails.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`ServerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the timing values can drive a read loop.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if either interval is zero or the
    /// poll interval is not shorter than the read timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("read_timeout_ms must be non-zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero".into()));
        }
        if self.poll_interval_ms >= self.read_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms ({}) must be shorter than read_timeout_ms ({})",
                self.poll_interval_ms, self.read_timeout_ms
            )));
        }
        Ok(())
    }

    /// Inactivity window as a [`Duration`].
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Poll back-off as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address.port(), 25565);
        assert!(config.bind_address.ip().is_loopback());
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_config() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_address = "0.0.0.0:4000"

            [status]
            motd = "hello"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address.port(), 4000);
        assert_eq!(config.status.motd, "hello");
        assert_eq!(config.status.max_players, MAX_PLAYERS);
        assert_eq!(config.read_timeout_ms, READ_TIMEOUT_MS);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let result = ServerConfig::from_toml_str("tick_rate = 60");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_rejects_bad_timing() {
        let result = ServerConfig::from_toml_str("read_timeout_ms = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = ServerConfig::from_toml_str("read_timeout_ms = 10\npoll_interval_ms = 10");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerConfig::load("/definitely/not/here/basalt.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

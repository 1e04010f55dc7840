//! # Configuration Management
//!
//! Centralized configuration for the relay binary.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults, then command-line overrides
//!
//! ## Example
//! ```toml
//! [proxy]
//! server = "127.0.0.1:18590"
//! host = "0.0.0.0:18600"
//! capture_file = "network.jsonl"
//! server_name_prefix = "Proxy: "
//! max_datagram_size = 4096
//!
//! [logging]
//! log_level = "info"
//! json_format = false
//! show_target = false
//! ```

use crate::error::{RelayError, Result};
use crate::protocol::handshake::DEFAULT_NAME_PREFIX;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use tracing::Level;

/// Default address of the real game server
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:18590";

/// Default address the relay listens on for real clients
pub const DEFAULT_HOST_ADDR: &str = "0.0.0.0:18600";

/// Default receive buffer size per datagram
pub const DEFAULT_MAX_DATAGRAM: usize = 4096;

/// Top-level relay configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| RelayError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| RelayError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| RelayError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `NOX_RELAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("NOX_RELAY_SERVER") {
            config.proxy.server = addr;
        }

        if let Ok(addr) = std::env::var("NOX_RELAY_HOST") {
            config.proxy.host = addr;
        }

        if let Ok(path) = std::env::var("NOX_RELAY_CAPTURE_FILE") {
            config.proxy.capture_file = (!path.is_empty()).then_some(path);
        }

        if let Ok(level) = std::env::var("NOX_RELAY_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                RelayError::ConfigError(format!("Invalid log level in environment: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.proxy.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RelayError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Relay endpoints and behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Real game server address (e.g., "127.0.0.1:18590")
    pub server: String,

    /// Public address real clients send to
    pub host: String,

    /// JSON-lines file receiving every forwarded datagram
    pub capture_file: Option<String>,

    /// Local IP the per-client sockets bind to; unspecified when absent
    pub relay_bind_ip: Option<String>,

    /// Prefix added to announced server names
    pub server_name_prefix: String,

    /// Receive buffer size per datagram
    pub max_datagram_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server: String::from(DEFAULT_SERVER_ADDR),
            host: String::from(DEFAULT_HOST_ADDR),
            capture_file: None,
            relay_bind_ip: None,
            server_name_prefix: String::from(DEFAULT_NAME_PREFIX),
            max_datagram_size: DEFAULT_MAX_DATAGRAM,
        }
    }
}

impl ProxyConfig {
    pub fn server_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.server)
    }

    pub fn host_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.host)
    }

    /// IP for per-client sockets: configured, or unspecified in the server's family.
    pub fn bind_ip(&self) -> Result<IpAddr> {
        if let Some(ip) = &self.relay_bind_ip {
            return ip
                .parse()
                .map_err(|_| RelayError::InvalidAddress(ip.clone()));
        }
        Ok(match self.server_addr()? {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        })
    }

    /// Validate proxy configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, addr) in [("server", &self.server), ("host", &self.host)] {
            if addr.is_empty() {
                errors.push(format!("Proxy {name} address cannot be empty"));
            } else if addr.parse::<SocketAddr>().is_err() {
                errors.push(format!(
                    "Invalid proxy {name} address format: '{addr}' (expected format: '127.0.0.1:18590')"
                ));
            }
        }

        if let Ok(server) = self.server.parse::<SocketAddr>() {
            if server.ip().is_unspecified() {
                errors.push(format!(
                    "Server address must be a concrete IP, got '{}'",
                    self.server
                ));
            }
            if server.port() == 0 {
                errors.push("Server port cannot be 0".to_string());
            }
        }

        if let Some(ip) = &self.relay_bind_ip {
            match ip.parse::<IpAddr>() {
                Ok(ip) => {
                    if let Ok(server) = self.server.parse::<SocketAddr>() {
                        if ip.is_ipv4() != server.is_ipv4() {
                            errors.push(format!(
                                "Relay bind IP {ip} and server {server} use different address families"
                            ));
                        }
                    }
                }
                Err(_) => errors.push(format!("Invalid relay bind IP: '{ip}'")),
            }
        }

        if let Some(path) = &self.capture_file {
            if path.is_empty() {
                errors.push("Capture file path cannot be empty".to_string());
            } else if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    errors.push(format!(
                        "Capture file directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        if self.server_name_prefix.as_bytes().contains(&0) {
            errors.push("Server name prefix cannot contain NUL bytes".to_string());
        }

        if self.max_datagram_size < 512 {
            errors.push(format!(
                "Max datagram size too small: {} (minimum: 512)",
                self.max_datagram_size
            ));
        } else if self.max_datagram_size > 65_535 {
            errors.push(format!(
                "Max datagram size too large: {} (maximum: 65535)",
                self.max_datagram_size
            ));
        }

        errors
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|_| RelayError::InvalidAddress(addr.to_string()))
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Whether to print the event target (module path)
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json_format: false,
            show_target: false,
        }
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.to_string().to_lowercase().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | EVENT_AGGREGATOR_CONFIG | (none) | Path to the TOML config file |
//! | EVENT_AGGREGATOR_UDP_PORT | 6678 | UDP port for incoming events |
//! | EVENT_AGGREGATOR_ENDPOINT | 0.0.0.0:6677 | Admin + metrics HTTP address |
//!
//! Zero or empty values fall back to their defaults.
//!
//! ```toml
//! udp_port = 6678
//! endpoint = "0.0.0.0:6677"
//! buffer_size = 32768
//! flush_window_ms = 5000
//!
//! [[collections]]
//! name = "request_latency_ms_count"
//! aggregation = "count"
//! event = "request_latency_ms"
//! labels = ["pod"]
//! ```

use crate::engine::{Collection, LoopConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_WINDOW};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_UDP_PORT: u16 = 6678;
pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:6677";

pub const ENV_CONFIG: &str = "EVENT_AGGREGATOR_CONFIG";
pub const ENV_UDP_PORT: &str = "EVENT_AGGREGATOR_UDP_PORT";
pub const ENV_ENDPOINT: &str = "EVENT_AGGREGATOR_ENDPOINT";

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid config file: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Event aggregator server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// UDP port to receive events on
    pub udp_port: u16,
    /// Address serving the admin API and `/metrics`
    pub endpoint: String,
    /// Events buffered before a flush is forced
    pub buffer_size: usize,
    /// Maximum time between flushes, in milliseconds
    pub flush_window_ms: u64,
    /// Collections enabled at startup
    pub collections: Vec<Collection>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            udp_port: DEFAULT_UDP_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            buffer_size: DEFAULT_BUFFER_CAPACITY,
            flush_window_ms: DEFAULT_FLUSH_WINDOW.as_millis() as u64,
            collections: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => ServerConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config.with_defaults())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        Ok(config.with_defaults())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_UDP_PORT) {
            self.udp_port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a port: {:?}", ENV_UDP_PORT, port))
            })?;
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint.trim().to_string();
        }
        Ok(())
    }

    /// Replace zero or empty values with defaults
    fn with_defaults(mut self) -> Self {
        let defaults = ServerConfig::default();
        if self.udp_port == 0 {
            self.udp_port = defaults.udp_port;
        }
        if self.endpoint.is_empty() {
            self.endpoint = defaults.endpoint;
        }
        if self.buffer_size == 0 {
            self.buffer_size = defaults.buffer_size;
        }
        if self.flush_window_ms == 0 {
            self.flush_window_ms = defaults.flush_window_ms;
        }
        self
    }

    /// UDP bind address (all interfaces)
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.udp_port))
    }

    pub fn flush_window(&self) -> Duration {
        Duration::from_millis(self.flush_window_ms)
    }

    /// Loop parameters derived from this configuration
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig::default()
            .with_buffer_capacity(self.buffer_size)
            .with_flush_window(self.flush_window())
    }
}

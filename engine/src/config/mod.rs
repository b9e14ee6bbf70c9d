//! Configuration management
//!
//! This module handles loading and validation of the drover configuration.
//! Configuration is stored in TOML format at ~/.drover/config.toml.
//!
//! # Configuration Sections
//!
//! - **secret**: The shared secret (overridden by `DROVER_SECRET`)
//! - **core**: Log level
//! - **client**: Plugin endpoint and outbound call settings
//! - **server**: Bind address and inbound request limits
//! - **static**: Environment variables and registry credentials served by
//!   `drover serve`
//!
//! # Examples
//!
//! ```no_run
//! use drover::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! let secret = config.shared_secret()?;
//!
//! println!("Log level: {}", config.core.log_level);
//! println!("Bind: {}", config.server.bind);
//! # Ok(())
//! # }
//! ```

use sdk::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::{ClientBuilder, DEFAULT_RESPONSE_LIMIT};
use crate::crypto::SharedSecret;
use crate::handler::DEFAULT_BODY_LIMIT;

/// Environment variable holding the shared secret
pub const SECRET_ENV: &str = "DROVER_SECRET";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No shared secret configured. Set {SECRET_ENV} or `secret` in the config file")]
    MissingSecret,

    #[error("No plugin endpoint configured. Set `client.endpoint` or pass --endpoint")]
    MissingEndpoint,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Shared secret; never written back to disk
    #[serde(default, skip_serializing)]
    pub secret: Option<SharedSecret>,

    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Outbound calls
    #[serde(default)]
    pub client: ClientConfig,

    /// Inbound requests
    #[serde(default)]
    pub server: ServerConfig,

    /// Values served by the built-in plugins
    #[serde(default, rename = "static")]
    pub fixed: StaticConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Outbound call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Plugin endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask plugins to encrypt response bodies
    #[serde(default)]
    pub encrypt: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_verify: bool,

    /// Maximum response body size in bytes
    #[serde(default = "default_response_limit")]
    pub response_limit: usize,
}

/// Inbound request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Reject requests whose Date header is further off than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clock_skew_secs: Option<u64>,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

/// Values served by `drover serve`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Registry credentials
    #[serde(default)]
    pub registries: Vec<Registry>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            encrypt: false,
            skip_verify: false,
            response_limit: default_response_limit(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_clock_skew_secs: None,
            body_limit: default_body_limit(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_response_limit() -> usize {
    DEFAULT_RESPONSE_LIMIT
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Write a default configuration to `path` and return it
    fn create_default(path: &Path) -> Result<Self, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;

        fs::write(path, toml_string).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.drover/config.toml)
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".drover").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.client.response_limit == 0 {
            return Err(ConfigError::Invalid(
                "client.response_limit must be greater than 0".to_string(),
            ));
        }

        if self.server.body_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.body_limit must be greater than 0".to_string(),
            ));
        }

        self.bind_addr()?;
        Ok(())
    }

    /// The shared secret, from `DROVER_SECRET` or the config file
    pub fn shared_secret(&self) -> Result<SharedSecret, ConfigError> {
        pick_secret(std::env::var(SECRET_ENV).ok(), self.secret.as_ref())
    }

    /// The server bind address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid bind address '{}'", self.server.bind))
        })
    }

    /// The configured clock skew window
    pub fn max_clock_skew(&self) -> Option<Duration> {
        self.server.max_clock_skew_secs.map(Duration::from_secs)
    }

    /// A client builder carrying the `[client]` settings.
    ///
    /// `endpoint` overrides `client.endpoint`.
    pub fn client_builder(
        &self,
        secret: SharedSecret,
        endpoint: Option<&str>,
    ) -> Result<ClientBuilder, ConfigError> {
        let endpoint = endpoint
            .or(self.client.endpoint.as_deref())
            .ok_or(ConfigError::MissingEndpoint)?;

        let timeout =
            (self.client.timeout_secs > 0).then(|| Duration::from_secs(self.client.timeout_secs));

        Ok(ClientBuilder::new(endpoint, secret)
            .encrypt(self.client.encrypt)
            .skip_verify(self.client.skip_verify)
            .timeout(timeout)
            .response_limit(self.client.response_limit))
    }
}

fn pick_secret(
    env: Option<String>,
    file: Option<&SharedSecret>,
) -> Result<SharedSecret, ConfigError> {
    match env.filter(|value| !value.is_empty()) {
        Some(value) => Ok(SharedSecret::new(value)),
        None => file
            .filter(|secret| !secret.is_empty())
            .cloned()
            .ok_or(ConfigError::MissingSecret),
    }
}

//! Configuration management for the RAX file server
//!
//! Values are layered: built-in defaults, then an optional `config.toml`, then
//! environment variables prefixed with `RAX_FILES_` (for example
//! `RAX_FILES_ROOT_PATH`). Everything is read once at startup.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config";

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 4040;
const DEFAULT_ROOT_PATH: &str = "./files_root";
const DEFAULT_MAX_CLIENTS: i64 = 16;
const DEFAULT_MAX_REQUEST_LENGTH: i64 = 1024 * 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to listen on
    pub bind_address: String,

    /// TCP port to listen on
    pub port: u16,

    /// Directory every client path is confined to
    pub root_path: String,

    /// Maximum concurrent clients
    pub max_clients: usize,

    /// Longest accepted request line, in bytes
    pub max_request_length: usize,

    /// How long an append waits for a busy file. Absent means forever.
    #[serde(default)]
    pub lock_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from `config.toml` (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from the given file (extension optional) with
    /// environment overrides. A missing file falls back to the defaults.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("root_path", DEFAULT_ROOT_PATH)?
            .set_default("max_clients", DEFAULT_MAX_CLIENTS)?
            .set_default("max_request_length", DEFAULT_MAX_REQUEST_LENGTH)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("RAX_FILES"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration serving `root` on an ephemeral localhost port.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: 0,
            root_path: root.into(),
            max_clients: DEFAULT_MAX_CLIENTS as usize,
            max_request_length: DEFAULT_MAX_REQUEST_LENGTH as usize,
            lock_timeout_secs: None,
        }
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.root_path.trim().is_empty() {
            return Err(ConfigError::Message("root_path cannot be empty".into()));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_request_length == 0 {
            return Err(ConfigError::Message(
                "max_request_length must be greater than 0".into(),
            ));
        }

        if self.lock_timeout_secs == Some(0) {
            return Err(ConfigError::Message(
                "lock_timeout_secs must be greater than 0 when set".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root_path)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }
}

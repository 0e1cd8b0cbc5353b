//! TOML-based configuration for the game server.
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a missing key all fall back to the values below:
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 5555
//!
//! [game]
//! round_reset_delay_ms = 2000
//! name_timeout_secs = 10
//! max_name_len = 32
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port players connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Game pacing and limits.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameConfig {
    /// How long the final board stays up before the next round starts.
    #[serde(default = "default_round_reset_delay_ms")]
    pub round_reset_delay_ms: u64,
    /// How long a newly seated peer has to send its name.
    #[serde(default = "default_name_timeout_secs")]
    pub name_timeout_secs: u64,
    /// Display names are truncated to this many characters.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5555
}
fn default_round_reset_delay_ms() -> u64 {
    2000
}
fn default_name_timeout_secs() -> u64 {
    10
}
fn default_max_name_len() -> usize {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_reset_delay_ms: default_round_reset_delay_ms(),
            name_timeout_secs: default_name_timeout_secs(),
            max_name_len: default_max_name_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl NetworkConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl GameConfig {
    pub fn round_reset_delay(&self) -> Duration {
        Duration::from_millis(self.round_reset_delay_ms)
    }

    pub fn name_timeout(&self) -> Duration {
        Duration::from_secs(self.name_timeout_secs)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `ServerConfig` from `path`, returning `ServerConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! TOML configuration file parser
//!
//! This module handles parsing of the TOML configuration file consumed at
//! startup. The raw TOML layer is converted into the validated [`Config`]
//! used by the rest of the crate.

use crate::config::{
    default_console_session, default_container, default_lookback, default_rcon_host,
    default_rcon_port, default_settle_ms, default_spool_dir, default_timeout_secs, Config,
    DockerConfig, RconConfig, Timeouts, TransportMethod,
};
use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Transport method ("docker_attach" or "rcon")
    #[serde(default = "default_method")]
    pub method: TransportMethod,

    /// Container runtime section
    #[serde(default)]
    pub docker: TomlDockerConfig,

    /// RCON endpoint section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcon: Option<TomlRconConfig>,

    /// Operation deadlines
    #[serde(default)]
    pub timeouts: TomlTimeouts,
}

/// TOML container runtime section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlDockerConfig {
    /// Container name or id
    #[serde(default = "default_container")]
    pub container: String,

    /// Multiplexer session name
    #[serde(default = "default_console_session")]
    pub console_session: String,

    /// Drop-file spool directory
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    /// Lines of output scanned by the player-list scraper
    #[serde(default = "default_lookback")]
    pub log_lookback: u32,
}

/// TOML RCON endpoint section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlRconConfig {
    /// Server hostname or IP
    #[serde(default = "default_rcon_host")]
    pub host: String,

    /// RCON TCP port
    #[serde(default = "default_rcon_port")]
    pub port: u16,

    /// RCON password (required)
    pub password: String,
}

/// TOML timeout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlTimeouts {
    /// TCP connect deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_secs: u64,

    /// Per-operation read/write deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub io_secs: u64,

    /// Settle delay before scraping output, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for TomlDockerConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            console_session: default_console_session(),
            spool_dir: default_spool_dir(),
            log_lookback: default_lookback(),
        }
    }
}

impl Default for TomlTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_timeout_secs(),
            io_secs: default_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConsoleError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: TomlConfig = toml::from_str(&contents).map_err(|e| {
            ConsoleError::Config(format!("Failed to parse TOML config: {}", e))
        })?;

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| ConsoleError::Config(format!("Failed to parse TOML: {}", e)))
    }
}

// Convert TOML config to internal Config
impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Self {
        Config {
            method: toml.method,
            docker: toml.docker.into(),
            rcon: toml.rcon.map(|r| r.into()),
            timeouts: toml.timeouts.into(),
        }
    }
}

impl From<TomlDockerConfig> for DockerConfig {
    fn from(toml: TomlDockerConfig) -> Self {
        DockerConfig {
            container: toml.container,
            console_session: toml.console_session,
            spool_dir: toml.spool_dir,
            log_lookback: toml.log_lookback,
        }
    }
}

impl From<TomlRconConfig> for RconConfig {
    fn from(toml: TomlRconConfig) -> Self {
        RconConfig {
            host: toml.host,
            port: toml.port,
            password: toml.password.into(),
        }
    }
}

impl From<TomlTimeouts> for Timeouts {
    fn from(toml: TomlTimeouts) -> Self {
        Timeouts {
            connect_secs: toml.connect_secs,
            io_secs: toml.io_secs,
            settle_ms: toml.settle_ms,
        }
    }
}

fn default_method() -> TransportMethod {
    TransportMethod::DockerAttach
}

//! Configuration management
//!
//! This module handles parsing and validation of the transport configuration
//! consumed by the dispatcher. Configuration is read once from a TOML file
//! and treated as an immutable snapshot.

mod toml_parser;
mod validation;

pub use toml_parser::TomlConfig;
pub use validation::validate_command;

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Transport selection for the command dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMethod {
    /// Deliver through the container runtime (fallback ladder)
    DockerAttach,
    /// Deliver over the RCON TCP protocol
    Rcon,
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMethod::DockerAttach => write!(f, "docker_attach"),
            TransportMethod::Rcon => write!(f, "rcon"),
        }
    }
}

/// RCON password wrapper that never appears in logs
#[derive(Clone)]
pub struct RconPassword {
    secret: Zeroizing<String>,
}

impl RconPassword {
    /// Wrap a plaintext password
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Access the plaintext for the authentication packet
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Check whether the password is empty
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl From<String> for RconPassword {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl fmt::Debug for RconPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RconPassword([REDACTED])")
    }
}

// Ensure the password is never accidentally logged
impl fmt::Display for RconPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Active transport method
    pub method: TransportMethod,

    /// Container runtime parameters (fallback transport)
    pub docker: DockerConfig,

    /// RCON endpoint parameters (required when method = rcon)
    pub rcon: Option<RconConfig>,

    /// Operation deadlines
    pub timeouts: Timeouts,
}

/// Container runtime parameters
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Container name or id hosting the game server
    pub container: String,

    /// Multiplexer session name used for keystroke injection
    pub console_session: String,

    /// Spool directory for drop-file handoff
    pub spool_dir: PathBuf,

    /// Lines of recent output scanned when scraping the player list
    pub log_lookback: u32,
}

/// RCON endpoint parameters
#[derive(Debug, Clone)]
pub struct RconConfig {
    /// Server hostname or IP
    pub host: String,

    /// RCON TCP port
    pub port: u16,

    /// RCON password
    pub password: RconPassword,
}

/// Operation deadlines
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// TCP connect deadline in seconds
    pub connect_secs: u64,

    /// Per-operation read/write deadline in seconds
    pub io_secs: u64,

    /// Settle delay between injecting a command and scraping output, in ms
    pub settle_ms: u64,
}

impl Timeouts {
    /// Connect deadline as a Duration
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    /// I/O deadline as a Duration
    pub fn io(&self) -> Duration {
        Duration::from_secs(self.io_secs)
    }

    /// Settle delay as a Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_timeout_secs(),
            io_secs: default_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_config = TomlConfig::from_file(path)?;
        Ok(toml_config.into())
    }

    /// Validate the entire configuration for the selected method
    pub fn validate(&self) -> Result<()> {
        self.docker.validate()?;
        validation::validate_timeout_secs(self.timeouts.connect_secs)?;
        validation::validate_timeout_secs(self.timeouts.io_secs)?;

        match self.method {
            TransportMethod::Rcon => {
                let rcon = self.rcon.as_ref().ok_or_else(|| {
                    ConsoleError::Config(
                        "Method 'rcon' requires an [rcon] section".to_string(),
                    )
                })?;
                rcon.validate()
            }
            TransportMethod::DockerAttach => {
                if let Some(rcon) = &self.rcon {
                    rcon.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl DockerConfig {
    /// Validate container runtime parameters
    pub fn validate(&self) -> Result<()> {
        validation::validate_container_name(&self.container)?;
        validation::validate_session_name(&self.console_session)?;
        validation::validate_lookback(self.log_lookback)?;

        if self.spool_dir.as_os_str().is_empty() {
            return Err(ConsoleError::Config(
                "Spool directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl RconConfig {
    /// Validate RCON endpoint parameters
    pub fn validate(&self) -> Result<()> {
        validation::validate_host(&self.host)?;
        validation::validate_port(self.port)?;

        if self.password.is_empty() {
            return Err(ConsoleError::Config(
                "RCON password cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: TransportMethod::DockerAttach,
            docker: DockerConfig::default(),
            rcon: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            console_session: default_console_session(),
            spool_dir: default_spool_dir(),
            log_lookback: default_lookback(),
        }
    }
}

// Default value functions shared with the TOML layer
pub(crate) fn default_container() -> String {
    "mc".to_string()
}

pub(crate) fn default_console_session() -> String {
    "minecraft".to_string()
}

pub(crate) fn default_spool_dir() -> PathBuf {
    PathBuf::from("/data/commands")
}

pub(crate) fn default_lookback() -> u32 {
    100
}

pub(crate) fn default_rcon_host() -> String {
    "localhost".to_string()
}

pub(crate) fn default_rcon_port() -> u16 {
    25575
}

pub(crate) fn default_timeout_secs() -> u64 {
    5
}

pub(crate) fn default_settle_ms() -> u64 {
    500
}

//! Configuration validation functions
//!
//! This module provides validation for all configuration fields including
//! container names, hosts, ports, session names, and command strings.

use crate::error::{ConsoleError, Result};
use crate::rcon::packet::MAX_COMMAND_LEN;

/// Validate container name or id (Docker naming rules)
pub fn validate_container_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConsoleError::Config(
            "Container name cannot be empty".to_string(),
        ));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or(' ');
    if !first.is_ascii_alphanumeric() {
        return Err(ConsoleError::Config(format!(
            "Container name '{}' must start with an alphanumeric character",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ConsoleError::Config(format!(
            "Container name '{}' contains invalid characters (only alphanumeric, '_', '-', and '.' allowed)",
            name
        )));
    }

    Ok(())
}

/// Validate multiplexer session name (alphanumeric, '_', '-')
pub fn validate_session_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConsoleError::Config(
            "Console session name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConsoleError::Config(format!(
            "Console session name '{}' contains invalid characters (only alphanumeric, '_', and '-' allowed)",
            name
        )));
    }

    Ok(())
}

/// Validate RCON host (hostname or IP, no whitespace)
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(ConsoleError::Config("Host cannot be empty".to_string()));
    }

    if host.chars().any(|c| c.is_whitespace()) {
        return Err(ConsoleError::Config(format!(
            "Host '{}' must not contain whitespace",
            host
        )));
    }

    Ok(())
}

/// Validate RCON port
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ConsoleError::Config(
            "Port number cannot be 0".to_string(),
        ));
    }
    Ok(())
}

/// Validate I/O timeout (1-300 seconds)
pub fn validate_timeout_secs(secs: u64) -> Result<()> {
    if !(1..=300).contains(&secs) {
        return Err(ConsoleError::Config(format!(
            "Timeout {} is out of valid range (1-300 seconds)",
            secs
        )));
    }
    Ok(())
}

/// Validate log lookback window (1-10000 lines)
pub fn validate_lookback(lines: u32) -> Result<()> {
    if !(1..=10_000).contains(&lines) {
        return Err(ConsoleError::Config(format!(
            "Log lookback {} is out of valid range (1-10000 lines)",
            lines
        )));
    }
    Ok(())
}

/// Validate a command string before dispatch (non-empty, wire size bound)
pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(ConsoleError::Validation(
            "Command cannot be empty".to_string(),
        ));
    }

    if command.len() > MAX_COMMAND_LEN {
        return Err(ConsoleError::Validation(format!(
            "Command length {} exceeds maximum of {} bytes",
            command.len(),
            MAX_COMMAND_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_container_name() {
        assert!(validate_container_name("mc").is_ok());
        assert!(validate_container_name("mc-server_1").is_ok());
        assert!(validate_container_name("0abc.def").is_ok());
        assert!(validate_container_name("").is_err());
        assert!(validate_container_name("-leading-dash").is_err());
        assert!(validate_container_name("bad name").is_err());
        assert!(validate_container_name("bad/name").is_err());
    }

    #[test]
    fn test_validate_session_name() {
        assert!(validate_session_name("minecraft").is_ok());
        assert!(validate_session_name("mc-console_0").is_ok());
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("mc console").is_err());
        assert!(validate_session_name("mc:0").is_err());
    }

    #[test]
    fn test_validate_host() {
        assert!(validate_host("localhost").is_ok());
        assert!(validate_host("192.168.1.1").is_ok());
        assert!(validate_host("mc.example.com").is_ok());
        assert!(validate_host("").is_err());
        assert!(validate_host("bad host").is_err());
    }

    #[test]
    fn test_validate_port() {
        assert!(validate_port(25575).is_ok());
        assert!(validate_port(1).is_ok());
        assert!(validate_port(0).is_err());
    }

    #[test]
    fn test_validate_timeout_secs() {
        assert!(validate_timeout_secs(1).is_ok());
        assert!(validate_timeout_secs(5).is_ok());
        assert!(validate_timeout_secs(300).is_ok());
        assert!(validate_timeout_secs(0).is_err());
        assert!(validate_timeout_secs(301).is_err());
    }

    #[test]
    fn test_validate_lookback() {
        assert!(validate_lookback(1).is_ok());
        assert!(validate_lookback(100).is_ok());
        assert!(validate_lookback(10_000).is_ok());
        assert!(validate_lookback(0).is_err());
        assert!(validate_lookback(10_001).is_err());
    }

    #[test]
    fn test_validate_command() {
        assert!(validate_command("list").is_ok());
        assert!(validate_command("say hello world").is_ok());
        assert!(validate_command("").is_err());
        assert!(validate_command("   ").is_err());

        let oversized = "x".repeat(MAX_COMMAND_LEN + 1);
        assert!(validate_command(&oversized).is_err());
    }
}

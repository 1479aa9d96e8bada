//! Error types for craft-console
//!
//! This module defines the error types used throughout the application.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in application code.

use thiserror::Error;

/// Main error type for craft-console operations
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// RCON authentication rejected by the server
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network-level errors (refused, reset, broken pipe)
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed packet framing or protocol violation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Every fallback delivery mechanism was exhausted
    #[error("Delivery unavailable: {0}")]
    DeliveryUnavailable(String),

    /// Container runtime / process channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(err: toml::de::Error) -> Self {
        ConsoleError::Config(err.to_string())
    }
}

impl From<bollard::errors::Error> for ConsoleError {
    fn from(err: bollard::errors::Error) -> Self {
        ConsoleError::Channel(err.to_string())
    }
}

//! Dispatcher outcome and result types
//!
//! The uniform contract both transports are narrowed into: every command
//! yields a [`CommandOutcome`] and every player-list query a
//! [`PlayerListResult`], regardless of whether RCON or fallback delivery
//! served it.

use crate::config::TransportMethod;
use crate::error::ConsoleError;
use crate::fallback::scrape::ParsedPlayerList;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a command provably traveled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// The server executed the command and returned its response
    Confirmed,
    /// The command reached the process input; execution was not observed
    DeliveredUnconfirmed,
    /// No mechanism accepted the command
    NotDelivered,
}

/// Error taxonomy carried in outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid transport parameters, or a call in an unusable
    /// dispatcher state
    Configuration,
    /// RCON credentials rejected; never retried with the same password
    Auth,
    /// Connection refused, reset, or timed out
    Network,
    /// Malformed packet framing
    Protocol,
    /// Every fallback mechanism was exhausted
    DeliveryUnavailable,
}

impl From<&ConsoleError> for ErrorKind {
    fn from(err: &ConsoleError) -> Self {
        match err {
            ConsoleError::Config(_)
            | ConsoleError::Validation(_)
            | ConsoleError::InvalidState(_)
            | ConsoleError::Serialization(_) => ErrorKind::Configuration,
            ConsoleError::Auth(_) => ErrorKind::Auth,
            ConsoleError::Network(_)
            | ConsoleError::Timeout(_)
            | ConsoleError::Io(_)
            | ConsoleError::Channel(_) => ErrorKind::Network,
            ConsoleError::Protocol(_) => ErrorKind::Protocol,
            ConsoleError::DeliveryUnavailable(_) => ErrorKind::DeliveryUnavailable,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Auth => "auth",
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::DeliveryUnavailable => "delivery_unavailable",
        };
        write!(f, "{}", name)
    }
}

/// Result of one command dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Transport that handled the command
    pub method: TransportMethod,

    /// How far the command provably traveled
    pub delivery: Delivery,

    /// Whether the command at least reached the server process
    pub succeeded: bool,

    /// Server response text. RCON sets this on every success (possibly
    /// empty); fallback delivery usually cannot observe a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Narrowed error category when the command did not go through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl CommandOutcome {
    /// Outcome with a server-confirmed response
    pub fn confirmed(method: TransportMethod, response: String) -> Self {
        Self {
            method,
            delivery: Delivery::Confirmed,
            succeeded: true,
            raw_response: Some(response),
            error_kind: None,
        }
    }

    /// Outcome delivered without execution confirmation
    pub fn delivered_unconfirmed(method: TransportMethod) -> Self {
        Self {
            method,
            delivery: Delivery::DeliveredUnconfirmed,
            succeeded: true,
            raw_response: None,
            error_kind: None,
        }
    }

    /// Failed outcome carrying the narrowed error category
    pub fn not_delivered(method: TransportMethod, kind: ErrorKind) -> Self {
        Self {
            method,
            delivery: Delivery::NotDelivered,
            succeeded: false,
            raw_response: None,
            error_kind: Some(kind),
        }
    }
}

/// Player list extracted from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerListResult {
    /// Names currently online
    pub online: Vec<String>,

    /// Player count as reported by the server
    pub count: u32,

    /// Server capacity when the header carries it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,

    /// Transport that produced the result
    pub source: TransportMethod,

    /// True when the numbers could not be corroborated: no list line was
    /// observed, or the header count disagrees with the parsed names
    pub degraded: bool,
}

impl PlayerListResult {
    /// Empty result marked degraded. Failing to observe the list is not
    /// the same as nobody being online.
    pub fn degraded(source: TransportMethod) -> Self {
        Self {
            online: Vec::new(),
            count: 0,
            max_players: None,
            source,
            degraded: true,
        }
    }

    /// Result built from a parsed player-list line
    pub fn from_parsed(parsed: ParsedPlayerList, source: TransportMethod) -> Self {
        let degraded = parsed.count as usize != parsed.online.len();
        Self {
            online: parsed.online,
            count: parsed.count,
            max_players: Some(parsed.max_players),
            source,
            degraded,
        }
    }
}

//! craft-console: command delivery for containerized game servers
//!
//! This library reliably injects operator commands into a game server
//! process running inside a container, either over the RCON TCP protocol
//! or, when RCON is not available, through a ladder of best-effort console
//! delivery mechanisms (multiplexer keystrokes, direct stdin writes,
//! drop-file handoff). Both transports sit behind one dispatcher facade so
//! callers never need to know which one is active.
//!
//! # Modules
//!
//! - `config`: Configuration parsing and validation
//! - `rcon`: RCON protocol client (framing, session, retry policy)
//! - `channel`: Low-level process channel into the container
//! - `fallback`: Best-effort delivery mechanisms and player-list scraping
//! - `dispatch`: Command dispatcher facade and its outcome types
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod rcon;

// Re-export commonly used types
pub use dispatch::CommandDispatcher;
pub use error::{ConsoleError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

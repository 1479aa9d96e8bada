//! Process channel abstraction
//!
//! This module defines the low-level primitives for talking to a game
//! server process that runs inside a container: writing bytes into its
//! attached input stream, reading back recent output, enumerating console
//! (terminal-multiplexer) sessions, and running one-shot commands next to
//! it. The concrete transport lives behind the [`ProcessChannel`] trait so
//! the delivery logic above it can be tested against mocks.

use crate::error::Result;
use async_trait::async_trait;

pub mod docker;

pub use docker::DockerChannel;

/// Output of a one-shot command run inside the container
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code as reported by the runtime
    pub exit_code: i64,
    /// Combined stdout/stderr, lossily decoded
    pub output: String,
}

impl ExecOutput {
    /// Whether the command exited cleanly
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Low-level channel to the containerized game server process.
///
/// Methods take owned arguments so implementations can move them into
/// runtime API calls without borrowing across await points.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessChannel: Send + Sync {
    /// Whether the target container exists and is currently running
    async fn is_running(&self) -> Result<bool>;

    /// Write raw bytes to the target process's attached stdin stream
    async fn write_stdin(&self, data: Vec<u8>) -> Result<()>;

    /// Read the last `lines` lines of the process's output
    async fn recent_output(&self, lines: u32) -> Result<String>;

    /// Names of the console multiplexer sessions alive in the container
    async fn list_console_sessions(&self) -> Result<Vec<String>>;

    /// Type a line followed by enter into the named console session
    async fn send_console_keys(&self, session: String, line: String) -> Result<()>;

    /// Run a one-shot command inside the container and collect its output
    async fn exec(&self, cmd: Vec<String>) -> Result<ExecOutput>;
}

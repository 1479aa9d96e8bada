//! RCON client with session management
//!
//! The client owns at most one live connection and serializes callers
//! through an async mutex, because request/response correlation relies on
//! the response being read immediately after the matching request is
//! written. It also applies the bounded retry policy: one fresh-session
//! retry for a network-level failure, never a retry after an
//! authentication rejection.

use crate::config::{RconConfig, Timeouts};
use crate::error::{ConsoleError, Result};
use crate::rcon::connection::RconConnection;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// RCON transport: single session slot plus retry policy
pub struct RconClient {
    config: RconConfig,
    timeouts: Timeouts,
    slot: Mutex<SessionSlot>,
}

#[derive(Default)]
struct SessionSlot {
    connection: Option<RconConnection>,
    auth_rejected: bool,
}

fn is_retryable(err: &ConsoleError) -> bool {
    matches!(
        err,
        ConsoleError::Network(_) | ConsoleError::Timeout(_) | ConsoleError::Io(_)
    )
}

impl RconClient {
    /// Create a client for the given endpoint. No connection is opened
    /// until the first command.
    pub fn new(config: RconConfig, timeouts: Timeouts) -> Self {
        Self {
            config,
            timeouts,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    /// Execute a command, lazily establishing or repairing the session.
    ///
    /// Holding the slot lock for the whole call keeps exactly one request
    /// in flight; concurrent callers queue.
    pub async fn execute(&self, command: &str) -> Result<String> {
        let mut slot = self.slot.lock().await;

        if slot.auth_rejected {
            return Err(ConsoleError::Auth(
                "RCON session unusable after an authentication rejection; \
                 update credentials and reconfigure"
                    .to_string(),
            ));
        }

        match self.execute_on_slot(&mut slot, command).await {
            Err(e) if is_retryable(&e) && !slot.auth_rejected => {
                warn!(error = %e, "RCON command failed, retrying once on a fresh session");
                self.execute_on_slot(&mut slot, command).await
            }
            other => other,
        }
    }

    /// Tear down any live session; idempotent
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(connection) = slot.connection.take() {
            connection.close().await;
            debug!("RCON session closed");
        }
    }

    /// One attempt: connect if the slot is empty, then run the command.
    /// Any failure empties the slot so the next attempt starts clean.
    async fn execute_on_slot(&self, slot: &mut SessionSlot, command: &str) -> Result<String> {
        if slot.connection.is_none() {
            match RconConnection::connect(&self.config, self.timeouts).await {
                Ok(connection) => slot.connection = Some(connection),
                Err(e) => {
                    if matches!(e, ConsoleError::Auth(_)) {
                        slot.auth_rejected = true;
                    }
                    return Err(e);
                }
            }
        }

        let connection = slot.connection.as_mut().ok_or_else(|| {
            ConsoleError::InvalidState("RCON session slot empty after connect".to_string())
        })?;

        let result = connection.execute(command).await;
        if result.is_err() {
            if let Some(dead) = slot.connection.take() {
                dead.close().await;
            }
        }
        result
    }
}

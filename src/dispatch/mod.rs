//! Command dispatcher facade
//!
//! The single entry point callers use. The dispatcher owns whichever
//! transport configuration selected, RCON or the fallback sender, and
//! narrows both into one contract: [`execute`](CommandDispatcher::execute)
//! returning a [`CommandOutcome`] and
//! [`list_players`](CommandDispatcher::list_players) returning a
//! [`PlayerListResult`]. Callers never learn which transport served them
//! except through the outcome's method tag.

pub mod api;

use crate::channel::ProcessChannel;
use crate::config::{validate_command, Config, TransportMethod};
use crate::error::{ConsoleError, Result};
use crate::fallback::scrape::{self, PLAYER_LIST_COMMAND};
use crate::fallback::FallbackSender;
use crate::rcon::RconClient;
use api::{CommandOutcome, ErrorKind, PlayerListResult};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Dispatcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No transport configured yet
    Unconfigured,
    /// Transport validated and ready to dispatch
    Ready,
    /// Closed; no further dispatching
    Closed,
}

impl DispatcherState {
    /// Whether commands can be dispatched in this state
    pub fn can_dispatch(&self) -> bool {
        matches!(self, DispatcherState::Ready)
    }

    /// Whether the dispatcher has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, DispatcherState::Closed)
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherState::Unconfigured => write!(f, "unconfigured"),
            DispatcherState::Ready => write!(f, "ready"),
            DispatcherState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Clone)]
enum ActiveTransport {
    Rcon(Arc<RconClient>),
    Fallback(Arc<FallbackSender>),
}

struct Inner {
    state: DispatcherState,
    transport: Option<ActiveTransport>,
    method: Option<TransportMethod>,
}

/// Facade over the configured command transport
pub struct CommandDispatcher {
    inner: RwLock<Inner>,
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher").finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Create an unconfigured dispatcher; every dispatch fails until
    /// [`configure`](Self::configure) succeeds.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: DispatcherState::Unconfigured,
                transport: None,
                method: None,
            }),
        }
    }

    /// Create a dispatcher that is ready for the given configuration.
    pub fn with_config(config: &Config, channel: Arc<dyn ProcessChannel>) -> Result<Self> {
        config.validate()?;
        let transport = Self::build_transport(config, channel)?;

        Ok(Self {
            inner: RwLock::new(Inner {
                state: DispatcherState::Ready,
                transport: Some(transport),
                method: Some(config.method),
            }),
        })
    }

    /// Install a transport, tearing down the previous one first.
    ///
    /// Rejected once the dispatcher has been closed.
    pub async fn configure(&self, config: &Config, channel: Arc<dyn ProcessChannel>) -> Result<()> {
        config.validate()?;

        let mut inner = self.inner.write().await;
        if inner.state.is_closed() {
            return Err(ConsoleError::InvalidState(
                "dispatcher is closed".to_string(),
            ));
        }

        // The old transport goes down before the new one goes live.
        if let Some(ActiveTransport::Rcon(client)) = inner.transport.take() {
            client.close().await;
        }

        inner.transport = Some(Self::build_transport(config, channel)?);
        inner.method = Some(config.method);
        inner.state = DispatcherState::Ready;
        info!(method = %config.method, "command dispatcher configured");
        Ok(())
    }

    /// Send one command through the active transport.
    ///
    /// Transport-level failures come back inside the outcome with an
    /// [`ErrorKind`]; an `Err` here means the call itself was invalid
    /// (unusable state, malformed command).
    pub async fn execute(&self, command: &str) -> Result<CommandOutcome> {
        validate_command(command)?;
        let transport = self.active_transport().await?;

        match transport {
            ActiveTransport::Rcon(client) => match client.execute(command).await {
                Ok(response) => Ok(CommandOutcome::confirmed(TransportMethod::Rcon, response)),
                Err(e) => {
                    error!(error = %e, "RCON command failed");
                    Ok(CommandOutcome::not_delivered(
                        TransportMethod::Rcon,
                        ErrorKind::from(&e),
                    ))
                }
            },
            ActiveTransport::Fallback(sender) => Ok(sender.send(command).await),
        }
    }

    /// Fetch the current player list through the active transport.
    pub async fn list_players(&self) -> Result<PlayerListResult> {
        let transport = self.active_transport().await?;

        match transport {
            ActiveTransport::Rcon(client) => {
                let response = client.execute(PLAYER_LIST_COMMAND).await?;
                match scrape::parse_player_line(&response) {
                    Some(parsed) => Ok(PlayerListResult::from_parsed(parsed, TransportMethod::Rcon)),
                    None => {
                        warn!(response = %response, "unrecognized player list response");
                        Ok(PlayerListResult::degraded(TransportMethod::Rcon))
                    }
                }
            }
            ActiveTransport::Fallback(sender) => Ok(sender.list_players().await),
        }
    }

    /// Tear down the active transport; idempotent.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        if inner.state.is_closed() {
            return;
        }

        if let Some(ActiveTransport::Rcon(client)) = inner.transport.take() {
            client.close().await;
        }

        inner.state = DispatcherState::Closed;
        info!("command dispatcher closed");
    }

    /// Current lifecycle state
    pub async fn state(&self) -> DispatcherState {
        self.inner.read().await.state
    }

    /// Method of the active transport, if one is configured
    pub async fn method(&self) -> Option<TransportMethod> {
        self.inner.read().await.method
    }

    /// Clone out the transport handle so dispatching does not hold the
    /// state lock across transport I/O.
    async fn active_transport(&self) -> Result<ActiveTransport> {
        let inner = self.inner.read().await;
        match inner.state {
            DispatcherState::Ready => inner.transport.clone().ok_or_else(|| {
                ConsoleError::InvalidState("dispatcher ready without a transport".to_string())
            }),
            DispatcherState::Unconfigured => Err(ConsoleError::InvalidState(
                "dispatcher is not configured".to_string(),
            )),
            DispatcherState::Closed => Err(ConsoleError::InvalidState(
                "dispatcher is closed".to_string(),
            )),
        }
    }

    fn build_transport(config: &Config, channel: Arc<dyn ProcessChannel>) -> Result<ActiveTransport> {
        Ok(match config.method {
            TransportMethod::Rcon => {
                let rcon = config.rcon.clone().ok_or_else(|| {
                    ConsoleError::Config("Method 'rcon' requires an [rcon] section".to_string())
                })?;
                ActiveTransport::Rcon(Arc::new(RconClient::new(rcon, config.timeouts)))
            }
            TransportMethod::DockerAttach => ActiveTransport::Fallback(Arc::new(
                FallbackSender::new(channel, &config.docker, config.timeouts),
            )),
        })
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

//! Docker-backed process channel
//!
//! Talks to the Docker Engine API through `bollard`: container state via
//! inspect, recent output via the logs endpoint, stdin delivery via stream
//! attach, and console-session handling via one-shot `tmux` execs inside
//! the container. Every runtime call is timeout-guarded so a wedged daemon
//! cannot stall a caller indefinitely.

use crate::channel::{ExecOutput, ProcessChannel};
use crate::config::{DockerConfig, Timeouts};
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::query_parameters::{
    AttachContainerOptionsBuilder, InspectContainerOptions, LogsOptionsBuilder,
};
use bollard::Docker;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Process channel implementation against the Docker Engine API
pub struct DockerChannel {
    docker: Docker,
    container: String,
    io_timeout: Duration,
}

impl DockerChannel {
    /// Connect to the local Docker daemon for the configured container.
    ///
    /// The daemon connection is lazy; a missing daemon surfaces on the
    /// first call, not here.
    pub fn new(config: &DockerConfig, timeouts: Timeouts) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            container: config.container.clone(),
            io_timeout: timeouts.io(),
        })
    }

    /// Run a command inside the container and collect exit code + output.
    async fn run_exec(&self, cmd: Vec<String>) -> Result<ExecOutput> {
        let exec = self
            .docker
            .create_exec(
                &self.container,
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(false),
                    cmd: Some(cmd),
                    ..Default::default()
                },
            )
            .await?;

        let start = self.docker.start_exec(&exec.id, None).await?;

        let mut combined = String::new();
        match start {
            StartExecResults::Detached => {
                trace!(container = %self.container, "exec detached, no output captured");
            }
            StartExecResults::Attached { mut output, .. } => {
                while let Some(item) = output.next().await {
                    match item {
                        Ok(chunk) => combined.push_str(&chunk.to_string()),
                        Err(e) => {
                            warn!(container = %self.container, error = %e, "exec output stream error");
                            break;
                        }
                    }
                }
            }
        }

        let info = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutput {
            exit_code: info.exit_code.unwrap_or_default(),
            output: combined,
        })
    }
}

#[async_trait]
impl ProcessChannel for DockerChannel {
    async fn is_running(&self) -> Result<bool> {
        let inspect = timeout(
            self.io_timeout,
            self.docker
                .inspect_container(&self.container, None::<InspectContainerOptions>),
        )
        .await
        .map_err(|_| ConsoleError::Timeout("Inspecting container".to_string()))?;

        match inspect {
            Ok(data) => Ok(data.state.and_then(|s| s.running).unwrap_or(false)),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_stdin(&self, data: Vec<u8>) -> Result<()> {
        let opts = AttachContainerOptionsBuilder::default()
            .stdin(true)
            .stream(true)
            .build();

        let results = timeout(
            self.io_timeout,
            self.docker.attach_container(&self.container, Some(opts)),
        )
        .await
        .map_err(|_| ConsoleError::Timeout("Attaching to container stdin".to_string()))??;

        let mut input = results.input;
        timeout(self.io_timeout, async {
            input.write_all(&data).await?;
            input.flush().await
        })
        .await
        .map_err(|_| ConsoleError::Timeout("Writing to container stdin".to_string()))??;

        debug!(container = %self.container, bytes = data.len(), "wrote to attached stdin");
        Ok(())
    }

    async fn recent_output(&self, lines: u32) -> Result<String> {
        let opts = LogsOptionsBuilder::default()
            .stdout(true)
            .stderr(true)
            .follow(false)
            .tail(&lines.to_string())
            .build();

        let collect = async {
            let mut stream = self.docker.logs(&self.container, Some(opts));
            let mut text = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => text.push_str(&chunk.to_string()),
                    Err(e) if text.is_empty() => return Err(ConsoleError::from(e)),
                    Err(e) => {
                        warn!(container = %self.container, error = %e, "log stream ended early");
                        break;
                    }
                }
            }
            Ok(text)
        };

        timeout(self.io_timeout, collect)
            .await
            .map_err(|_| ConsoleError::Timeout("Reading container logs".to_string()))?
    }

    async fn list_console_sessions(&self) -> Result<Vec<String>> {
        let cmd = vec![
            "tmux".to_string(),
            "list-sessions".to_string(),
            "-F".to_string(),
            "#S".to_string(),
        ];

        let result = timeout(self.io_timeout, self.run_exec(cmd))
            .await
            .map_err(|_| ConsoleError::Timeout("Listing console sessions".to_string()))??;

        // tmux exits non-zero when no server is running; that means no
        // sessions, not a channel failure.
        if !result.success() {
            trace!(container = %self.container, "no console multiplexer sessions");
            return Ok(Vec::new());
        }

        Ok(result
            .output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn send_console_keys(&self, session: String, line: String) -> Result<()> {
        // -l sends the text literally so command content is never
        // interpreted as tmux key names.
        let type_line = vec![
            "tmux".to_string(),
            "send-keys".to_string(),
            "-t".to_string(),
            session.clone(),
            "-l".to_string(),
            line,
        ];
        let press_enter = vec![
            "tmux".to_string(),
            "send-keys".to_string(),
            "-t".to_string(),
            session.clone(),
            "Enter".to_string(),
        ];

        for cmd in [type_line, press_enter] {
            let result = timeout(self.io_timeout, self.run_exec(cmd))
                .await
                .map_err(|_| ConsoleError::Timeout("Injecting console keystrokes".to_string()))??;

            if !result.success() {
                return Err(ConsoleError::Channel(format!(
                    "keystroke injection into session '{}' failed (exit {}): {}",
                    session,
                    result.exit_code,
                    result.output.trim()
                )));
            }
        }

        debug!(container = %self.container, session = %session, "injected console keystrokes");
        Ok(())
    }

    async fn exec(&self, cmd: Vec<String>) -> Result<ExecOutput> {
        timeout(self.io_timeout, self.run_exec(cmd))
            .await
            .map_err(|_| ConsoleError::Timeout("Running container exec".to_string()))?
    }
}

//! RCON connection handling
//!
//! One authenticated TCP connection to the game server. The connection owns
//! the request-id counter used to correlate requests with responses; every
//! read and write is bounded by the configured I/O deadline.

use crate::config::{RconConfig, Timeouts};
use crate::error::{ConsoleError, Result};
use crate::rcon::packet::{
    Packet, PacketDecoder, AUTH_REJECTED_ID, MAX_COMMAND_LEN, TYPE_EXEC, TYPE_RESPONSE,
};
use std::collections::VecDeque;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// An authenticated RCON connection
pub struct RconConnection {
    stream: TcpStream,
    decoder: PacketDecoder,
    inbound: VecDeque<Packet>,
    next_id: i32,
    timeouts: Timeouts,
}

impl RconConnection {
    /// Open a TCP connection and authenticate.
    ///
    /// Any failure here leaves no connection behind; a timeout during the
    /// handshake discards the socket rather than reusing a half-authenticated
    /// stream.
    pub async fn connect(config: &RconConfig, timeouts: Timeouts) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);

        let stream = timeout(timeouts.connect(), TcpStream::connect(&addr))
            .await
            .map_err(|_| ConsoleError::Timeout(format!("Connecting to {}", addr)))?
            .map_err(|e| ConsoleError::Network(format!("Failed to connect to {}: {}", addr, e)))?;

        let mut conn = Self {
            stream,
            decoder: PacketDecoder::new(),
            inbound: VecDeque::new(),
            next_id: 1,
            timeouts,
        };

        conn.authenticate(config).await?;
        debug!(host = %config.host, port = config.port, "RCON session authenticated");
        Ok(conn)
    }

    async fn authenticate(&mut self, config: &RconConfig) -> Result<()> {
        let auth_id = self.take_id();
        self.send(&Packet::auth(auth_id, config.password.expose()))
            .await?;

        loop {
            let packet = self.read_packet().await?;

            if packet.request_id == AUTH_REJECTED_ID {
                return Err(ConsoleError::Auth(
                    "RCON password rejected by server".to_string(),
                ));
            }

            match packet.kind {
                TYPE_EXEC if packet.request_id == auth_id => return Ok(()),
                // Some servers preface the auth reply with an empty response
                TYPE_RESPONSE if packet.request_id == auth_id => continue,
                _ => {
                    trace!(
                        request_id = packet.request_id,
                        kind = packet.kind,
                        "Ignoring unexpected packet during handshake"
                    );
                }
            }
        }
    }

    /// Execute a command and reassemble the full response text.
    ///
    /// The server may fragment a large response across several packets that
    /// share the command's request id. An empty follow-up request is written
    /// after the command; a reply carrying the follow-up id (or an
    /// empty-payload reply carrying the command id) marks end-of-stream.
    /// Packets with any other request id are stale leftovers from a prior
    /// timed-out request and are discarded.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(ConsoleError::Validation(format!(
                "Command payload of {} bytes exceeds the {} byte packet limit",
                command.len(),
                MAX_COMMAND_LEN
            )));
        }

        let command_id = self.take_id();
        let end_id = self.take_id();

        self.send(&Packet::exec(command_id, command)).await?;
        self.send(&Packet::exec(end_id, "")).await?;

        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let packet = self.read_packet().await?;

            if packet.request_id == command_id {
                if packet.has_empty_body() {
                    break;
                }
                buffer.extend_from_slice(&packet.body);
                continue;
            }

            if packet.request_id == end_id {
                break;
            }

            debug!(
                request_id = packet.request_id,
                pending = command_id,
                "Discarding packet with stale request id"
            );
        }

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Shut down the underlying socket
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        // Skip 0 and the -1 auth sentinel on wrap
        self.next_id = if self.next_id == i32::MAX {
            1
        } else {
            self.next_id + 1
        };
        id
    }

    async fn send(&mut self, packet: &Packet) -> Result<()> {
        let bytes = packet.encode();
        timeout(self.timeouts.io(), self.stream.write_all(&bytes))
            .await
            .map_err(|_| ConsoleError::Timeout("Writing RCON request".to_string()))??;
        Ok(())
    }

    async fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.inbound.pop_front() {
                return Ok(packet);
            }

            let mut chunk = [0u8; 4096];
            let n = timeout(self.timeouts.io(), self.stream.read(&mut chunk))
                .await
                .map_err(|_| ConsoleError::Timeout("Waiting for RCON response".to_string()))??;

            if n == 0 {
                return Err(ConsoleError::Network(
                    "RCON connection closed by server".to_string(),
                ));
            }

            self.inbound.extend(self.decoder.feed(&chunk[..n])?);
        }
    }
}

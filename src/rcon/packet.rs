//! RCON wire protocol codec.
//!
//! Length-prefixed packets with fixed-width little-endian signed 32-bit
//! fields:
//!
//! ```text
//! [i32 LE length] [i32 LE request id] [i32 LE type] [payload] [0x00] [0x00]
//! ```
//!
//! `length` counts every byte after itself. Packet types:
//! - `3`: authenticate (client → server)
//! - `2`: execute command (client → server); servers reuse this value for
//!   the authentication reply
//! - `0`: response payload (server → client)
//!
//! An authentication reply carrying request id `-1` means the password was
//! rejected.

use crate::error::{ConsoleError, Result};

/// Server response payload.
pub const TYPE_RESPONSE: i32 = 0;
/// Execute-command request; also the auth-reply type on the inbound side.
pub const TYPE_EXEC: i32 = 2;
/// Authentication request.
pub const TYPE_AUTH: i32 = 3;

/// Request id the server echoes back when authentication fails.
pub const AUTH_REJECTED_ID: i32 = -1;

/// Maximum outbound command payload in bytes (client → server).
pub const MAX_COMMAND_LEN: usize = 1446;
/// Maximum inbound packet body in bytes (server → client). Servers fragment
/// larger responses across several packets with the same request id.
pub const MAX_BODY_LEN: usize = 4096;

// Request id (4) + type (4) + two trailing zero bytes, i.e. the length
// field's value for an empty body.
const LENGTH_OVERHEAD: usize = 10;

/// A single RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Correlation id chosen by the client and echoed by the server
    pub request_id: i32,
    /// Packet type ([`TYPE_AUTH`], [`TYPE_EXEC`], [`TYPE_RESPONSE`])
    pub kind: i32,
    /// Raw payload bytes, excluding the trailing terminators
    pub body: Vec<u8>,
}

impl Packet {
    /// Build an authentication request
    pub fn auth(request_id: i32, password: &str) -> Self {
        Self {
            request_id,
            kind: TYPE_AUTH,
            body: password.as_bytes().to_vec(),
        }
    }

    /// Build an execute-command request
    pub fn exec(request_id: i32, command: &str) -> Self {
        Self {
            request_id,
            kind: TYPE_EXEC,
            body: command.as_bytes().to_vec(),
        }
    }

    /// Build a server response (used by tests and scripted servers)
    pub fn response(request_id: i32, body: &[u8]) -> Self {
        Self {
            request_id,
            kind: TYPE_RESPONSE,
            body: body.to_vec(),
        }
    }

    /// Whether the payload is empty (end-of-stream marker for reassembly)
    pub fn has_empty_body(&self) -> bool {
        self.body.is_empty()
    }

    /// Decode the payload as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Encode this packet into a wire-format byte vector
    pub fn encode(&self) -> Vec<u8> {
        let length = (self.body.len() + LENGTH_OVERHEAD) as i32;
        let mut buf = Vec::with_capacity(4 + self.body.len() + LENGTH_OVERHEAD);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(&self.body);
        buf.push(0);
        buf.push(0);
        buf
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Incremental packet decoder that handles partial reads.
///
/// Feed bytes via [`PacketDecoder::feed`] and extract complete packets.
/// Handles TCP-style byte stream reassembly.
#[derive(Debug)]
pub struct PacketDecoder {
    buf: Vec<u8>,
}

impl PacketDecoder {
    /// Create a new decoder with an empty buffer
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed bytes into the decoder and extract all complete packets.
    ///
    /// Incomplete data is buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a packet is malformed or exceeds the
    /// size limit. The connection is unusable after that.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Packet>> {
        self.buf.extend_from_slice(bytes);
        let mut packets = Vec::new();

        loop {
            // Need the 4-byte length header first
            if self.buf.len() < 4 {
                break;
            }

            let length = read_i32(&self.buf, 0);

            if length < LENGTH_OVERHEAD as i32 {
                return Err(ConsoleError::Protocol(format!(
                    "Packet length {} below minimum of {}",
                    length, LENGTH_OVERHEAD
                )));
            }
            if length as usize > MAX_BODY_LEN + LENGTH_OVERHEAD {
                return Err(ConsoleError::Protocol(format!(
                    "Packet length {} exceeds maximum of {}",
                    length,
                    MAX_BODY_LEN + LENGTH_OVERHEAD
                )));
            }

            let total = 4 + length as usize;
            if self.buf.len() < total {
                break; // Incomplete packet, wait for more data
            }

            let request_id = read_i32(&self.buf, 4);
            let kind = read_i32(&self.buf, 8);

            if !matches!(kind, TYPE_RESPONSE | TYPE_EXEC | TYPE_AUTH) {
                return Err(ConsoleError::Protocol(format!(
                    "Unknown packet type: {}",
                    kind
                )));
            }

            if self.buf[total - 2] != 0 || self.buf[total - 1] != 0 {
                return Err(ConsoleError::Protocol(
                    "Packet missing trailing terminators".to_string(),
                ));
            }

            packets.push(Packet {
                request_id,
                kind,
                body: self.buf[12..total - 2].to_vec(),
            });

            // Remove consumed bytes
            self.buf.drain(..total);
        }

        Ok(packets)
    }

    /// Returns true if the decoder has buffered partial data
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

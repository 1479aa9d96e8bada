//! RCON protocol client
//!
//! This module implements the binary remote-console protocol over a
//! persistent TCP connection: authentication handshake, command execution,
//! and reassembly of responses fragmented across multiple packets.

pub mod packet;

mod client;
mod connection;

pub use client::RconClient;
pub use connection::RconConnection;
pub use packet::{Packet, PacketDecoder};

//! Self-contained integration tests for the RCON transport
//!
//! Each test binds a scripted RCON server to a loopback listener and drives
//! the real client against it, so no game server is required. The server
//! side reuses the crate's packet codec to parse what the client sends.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use craft_console::config::{RconConfig, RconPassword, Timeouts};
use craft_console::error::ConsoleError;
use craft_console::rcon::packet::{AUTH_REJECTED_ID, TYPE_AUTH, TYPE_EXEC};
use craft_console::rcon::{Packet, PacketDecoder, RconClient, RconConnection};

const PASSWORD: &str = "sesame";

fn test_timeouts() -> Timeouts {
    Timeouts {
        connect_secs: 1,
        io_secs: 1,
        settle_ms: 10,
    }
}

fn client_for(addr: SocketAddr) -> RconClient {
    RconClient::new(
        RconConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            password: RconPassword::new(PASSWORD),
        },
        test_timeouts(),
    )
}

async fn bind_server() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind loopback listener");
    let addr = listener.local_addr().expect("listener has no local addr");
    (listener, addr)
}

/// Server half of one accepted connection
struct ServerConn {
    stream: TcpStream,
    decoder: PacketDecoder,
    pending: VecDeque<Packet>,
}

impl ServerConn {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: PacketDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    async fn recv(&mut self) -> Packet {
        loop {
            if let Some(packet) = self.pending.pop_front() {
                return packet;
            }
            let mut chunk = [0u8; 4096];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .expect("server failed to read from client");
            assert!(n > 0, "client closed the connection mid-script");
            self.pending.extend(
                self.decoder
                    .feed(&chunk[..n])
                    .expect("client sent a malformed packet"),
            );
        }
    }

    async fn send(&mut self, packet: Packet) {
        self.stream
            .write_all(&packet.encode())
            .await
            .expect("server failed to write to client");
    }

    /// Read the auth request, check the password, confirm the session.
    /// Mirrors the vanilla server, which prefaces the confirmation with an
    /// empty response packet.
    async fn accept_auth(&mut self) {
        let auth = self.recv().await;
        assert_eq!(auth.kind, TYPE_AUTH, "first packet must be the handshake");
        assert_eq!(auth.body_text(), PASSWORD);
        self.send(Packet::response(auth.request_id, b"")).await;
        self.send(Packet::exec(auth.request_id, "")).await;
    }

    /// Read one command and its end-of-stream probe, reply with the given
    /// fragments, then acknowledge the probe.
    async fn serve_command(&mut self, expected: &str, fragments: &[&str]) {
        let command = self.recv().await;
        assert_eq!(command.kind, TYPE_EXEC);
        assert_eq!(command.body_text(), expected);

        let probe = self.recv().await;
        assert_eq!(probe.kind, TYPE_EXEC);
        assert!(probe.has_empty_body(), "follow-up probe must be empty");

        for fragment in fragments {
            self.send(Packet::response(command.request_id, fragment.as_bytes()))
                .await;
        }
        self.send(Packet::response(probe.request_id, b"")).await;
    }

    /// Wait for the client to shut the connection down
    async fn expect_eof(&mut self) {
        let mut chunk = [0u8; 64];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .expect("server failed to read from client");
        assert_eq!(n, 0, "expected the client to close, got {} bytes", n);
    }
}

/// A command round-trips through connect, authenticate, execute
#[tokio::test]
async fn test_execute_round_trip() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        conn.serve_command("list", &["There are 0 of a max of 20 players online:"])
            .await;
        conn.expect_eof().await;
    });

    let client = client_for(addr);
    let response = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("command timed out")
        .expect("command failed");

    assert_eq!(response, "There are 0 of a max of 20 players online:");

    client.close().await;
    server.await.expect("server task panicked");
}

/// Fragments sharing the command's request id are reassembled in order
#[tokio::test]
async fn test_fragmented_response_reassembled() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        conn.serve_command(
            "banlist",
            &[
                "There are 3 ban(s):",
                "griefer42 was banned",
                " for repeated offences",
            ],
        )
        .await;
        conn.expect_eof().await;
    });

    let client = client_for(addr);
    let response = timeout(Duration::from_secs(5), client.execute("banlist"))
        .await
        .expect("command timed out")
        .expect("command failed");

    assert_eq!(
        response,
        "There are 3 ban(s):griefer42 was banned for repeated offences"
    );

    client.close().await;
    server.await.expect("server task panicked");
}

/// Commands with no output produce an empty string, and the probe
/// acknowledgement left unread by the short exchange does not confuse the
/// next command on the same session
#[tokio::test]
async fn test_empty_response_and_session_reuse() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;

        // "say" produces no output: an empty reply under the command id
        // ends the exchange before the probe acknowledgement is consumed
        let command = conn.recv().await;
        assert_eq!(command.body_text(), "say hello");
        let probe = conn.recv().await;
        conn.send(Packet::response(command.request_id, b"")).await;
        conn.send(Packet::response(probe.request_id, b"")).await;

        conn.serve_command("seed", &["Seed: [-129385723]"]).await;
        conn.expect_eof().await;
    });

    let client = client_for(addr);

    let first = timeout(Duration::from_secs(5), client.execute("say hello"))
        .await
        .expect("first command timed out")
        .expect("first command failed");
    assert_eq!(first, "");

    let second = timeout(Duration::from_secs(5), client.execute("seed"))
        .await
        .expect("second command timed out")
        .expect("second command failed");
    assert_eq!(second, "Seed: [-129385723]");

    client.close().await;
    server.await.expect("server task panicked");
}

/// Replies carrying an unknown request id are discarded, not appended
#[tokio::test]
async fn test_stale_request_id_discarded() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;

        let command = conn.recv().await;
        let probe = conn.recv().await;

        conn.send(Packet::response(command.request_id, b"kept "))
            .await;
        // A reply from some long-gone request must not leak into this one
        conn.send(Packet::response(9999, b"stale noise")).await;
        conn.send(Packet::response(command.request_id, b"and kept"))
            .await;
        conn.send(Packet::response(probe.request_id, b"")).await;
        conn.expect_eof().await;
    });

    let client = client_for(addr);
    let response = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("command timed out")
        .expect("command failed");

    assert_eq!(response, "kept and kept");

    client.close().await;
    server.await.expect("server task panicked");
}

/// A rejected password fails the command and poisons the client: no
/// further connection attempts are made
#[tokio::test]
async fn test_rejected_password_is_permanent() {
    let (listener, addr) = bind_server().await;
    let accepts = Arc::new(AtomicUsize::new(0));

    let accept_count = accepts.clone();
    let server = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.expect("accept failed");
            accept_count.fetch_add(1, Ordering::SeqCst);
            let mut conn = ServerConn::new(stream);
            let auth = conn.recv().await;
            assert_eq!(auth.kind, TYPE_AUTH);
            conn.send(Packet::exec(AUTH_REJECTED_ID, "")).await;
        }
    });

    let client = client_for(addr);

    let first = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("command timed out");
    assert!(
        matches!(first, Err(ConsoleError::Auth(_))),
        "expected an auth error, got {:?}",
        first
    );

    let second = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("command timed out");
    assert!(matches!(second, Err(ConsoleError::Auth(_))));

    // The rejection is permanent: the client never dialed again
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    server.abort();
}

/// A server that drops fresh connections gets exactly one retry
#[tokio::test]
async fn test_network_failure_retried_exactly_once() {
    let (listener, addr) = bind_server().await;
    let accepts = Arc::new(AtomicUsize::new(0));

    let accept_count = accepts.clone();
    let server = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.expect("accept failed");
            accept_count.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let client = client_for(addr);
    let result = timeout(Duration::from_secs(10), client.execute("list"))
        .await
        .expect("command timed out");

    assert!(
        matches!(
            result,
            Err(ConsoleError::Network(_)) | Err(ConsoleError::Io(_))
        ),
        "expected a network-level error, got {:?}",
        result
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        accepts.load(Ordering::SeqCst),
        2,
        "one initial attempt plus exactly one retry"
    );

    server.abort();
}

/// Losing an established session triggers one transparent reconnect
#[tokio::test]
async fn test_reconnect_after_session_loss() {
    let (listener, addr) = bind_server().await;
    let accepts = Arc::new(AtomicUsize::new(0));

    let accept_count = accepts.clone();
    let server = tokio::spawn(async move {
        // First session: serve one command, then die
        let (stream, _) = listener.accept().await.expect("accept failed");
        accept_count.fetch_add(1, Ordering::SeqCst);
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        conn.serve_command("list", &["first session"]).await;
        drop(conn);

        // Second session: the client comes back on its own
        let (stream, _) = listener.accept().await.expect("accept failed");
        accept_count.fetch_add(1, Ordering::SeqCst);
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        conn.serve_command("seed", &["second session"]).await;
        conn.expect_eof().await;
    });

    let client = client_for(addr);

    let first = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("first command timed out")
        .expect("first command failed");
    assert_eq!(first, "first session");

    let second = timeout(Duration::from_secs(5), client.execute("seed"))
        .await
        .expect("second command timed out")
        .expect("second command failed");
    assert_eq!(second, "second session");

    assert_eq!(accepts.load(Ordering::SeqCst), 2);

    client.close().await;
    server.await.expect("server task panicked");
}

/// A server that accepts but never answers trips the I/O deadline
#[tokio::test]
async fn test_unresponsive_server_times_out() {
    let (listener, addr) = bind_server().await;
    let accepts = Arc::new(AtomicUsize::new(0));

    let accept_count = accepts.clone();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let (stream, _) = listener.accept().await.expect("accept failed");
            accept_count.fetch_add(1, Ordering::SeqCst);
            held.push(stream); // keep the socket open, say nothing
        }
    });

    let client = client_for(addr);
    let result = timeout(Duration::from_secs(10), client.execute("list"))
        .await
        .expect("the I/O deadline should fire well before ten seconds");

    assert!(
        matches!(result, Err(ConsoleError::Timeout(_))),
        "expected a timeout, got {:?}",
        result
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 2);

    server.abort();
}

/// Nothing listening at all surfaces as a network error, not a hang
#[tokio::test]
async fn test_connection_refused() {
    let (listener, addr) = bind_server().await;
    drop(listener); // free the port so the dial is refused

    let client = client_for(addr);
    let result = timeout(Duration::from_secs(5), client.execute("list"))
        .await
        .expect("a refused connection should fail fast");

    assert!(
        matches!(result, Err(ConsoleError::Network(_))),
        "expected a network error, got {:?}",
        result
    );
}

/// Commands over the packet payload limit are rejected client-side
#[tokio::test]
async fn test_oversized_command_rejected() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        // Nothing but the handshake should ever reach the wire
        conn.expect_eof().await;
    });

    let client = client_for(addr);
    let long_command = "a".repeat(2000);
    let result = timeout(Duration::from_secs(5), client.execute(&long_command))
        .await
        .expect("command timed out");

    assert!(
        matches!(result, Err(ConsoleError::Validation(_))),
        "expected a validation error, got {:?}",
        result
    );

    server.await.expect("server task panicked");
}

/// The low-level connection supports a bare connect-then-close probe
#[tokio::test]
async fn test_connection_probe_lifecycle() {
    let (listener, addr) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut conn = ServerConn::new(stream);
        conn.accept_auth().await;
        conn.expect_eof().await;
    });

    let config = RconConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        password: RconPassword::new(PASSWORD),
    };

    let conn = timeout(
        Duration::from_secs(5),
        RconConnection::connect(&config, test_timeouts()),
    )
    .await
    .expect("connect timed out")
    .expect("connect failed");

    conn.close().await;
    server.await.expect("server task panicked");
}

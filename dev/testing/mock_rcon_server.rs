//! Manual mock RCON server for poking the CLI
//!
//! Binds a loopback RCON endpoint that accepts the password "sesame" and
//! answers a handful of commands, so `craft-console exec`/`players` can be
//! exercised without a real game server. Copy next to a bin target and run
//! with: cargo run --bin mock_rcon_server

use craft_console::rcon::packet::{Packet, PacketDecoder, AUTH_REJECTED_ID, TYPE_AUTH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const PASSWORD: &str = "sesame";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let listener = TcpListener::bind("127.0.0.1:25575").await?;
    println!("mock RCON server on 127.0.0.1:25575, password '{}'", PASSWORD);

    loop {
        let (stream, peer) = listener.accept().await?;
        println!("session from {}", peer);
        tokio::spawn(async move {
            if let Err(e) = serve(stream).await {
                eprintln!("session ended: {}", e);
            }
        });
    }
}

async fn serve(mut stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    let mut decoder = PacketDecoder::new();
    let mut authenticated = false;

    loop {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }

        for packet in decoder.feed(&chunk[..n])? {
            if packet.kind == TYPE_AUTH {
                if packet.body_text() == PASSWORD {
                    authenticated = true;
                    stream
                        .write_all(&Packet::exec(packet.request_id, "").encode())
                        .await?;
                } else {
                    stream
                        .write_all(&Packet::exec(AUTH_REJECTED_ID, "").encode())
                        .await?;
                    return Ok(());
                }
                continue;
            }

            if !authenticated {
                return Ok(());
            }

            let reply = answer(&packet.body_text());
            if !reply.is_empty() {
                stream
                    .write_all(&Packet::response(packet.request_id, reply.as_bytes()).encode())
                    .await?;
            } else {
                stream
                    .write_all(&Packet::response(packet.request_id, b"").encode())
                    .await?;
            }
        }
    }
}

fn answer(command: &str) -> String {
    match command {
        "list" => "There are 2 of a max of 20 players online: Alice, Bob".to_string(),
        "seed" => "Seed: [-129385723]".to_string(),
        "" => String::new(),
        other if other.starts_with("say ") => String::new(),
        other => format!("Unknown command: {}", other),
    }
}

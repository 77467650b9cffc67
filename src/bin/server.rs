//! Chat relay server - entry point
//!
//! Resolves and binds the listening address, starts the ChatServer actor,
//! and accepts connections.

use std::env;
use std::process;

use tokio::net::{lookup_host, TcpListener};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relay_chat::{handle_connection, AppError, ChatServer};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=relay_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_chat=info")),
        )
        .init();

    let Some(addr) = env::args().nth(1) else {
        eprintln!("[ERROR] Invalid input! Please use <DNS|IPv4|IPv6>:<port>");
        process::exit(1);
    };

    // Resolve the address spec, then bind the first candidate that accepts
    let candidates: Vec<_> = lookup_host(&addr)
        .await
        .map(|candidates| candidates.collect())
        .unwrap_or_default();
    if candidates.is_empty() {
        eprintln!("[ERROR] {}", AppError::AddressResolution(addr));
        process::exit(1);
    }

    let mut listener = None;
    for candidate in candidates {
        match TcpListener::bind(candidate).await {
            Ok(l) => {
                listener = Some(l);
                break;
            }
            Err(e) => error!("bind to {} failed: {}", candidate, e),
        }
    }
    let Some(listener) = listener else {
        eprintln!("[ERROR] Failed to bind!");
        process::exit(1);
    };
    info!("chat relay listening on {}", addr);

    // Create the ChatServer actor channel and start it
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("new connection from {}", peer);
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
                        error!("connection handler error: {}", e);
                    }
                });
            }
            // One failed accept must not take down the live sessions
            Err(e) => error!("failed to accept connection: {}", e),
        }
    }
}

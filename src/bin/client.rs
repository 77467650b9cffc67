//! Chat relay client - entry point
//!
//! Connects to a relay server, registers the nickname given on the command
//! line, and runs the interactive session.

use std::env;
use std::process;

use tokio::net::{lookup_host, TcpStream};
use tracing_subscriber::EnvFilter;

use relay_chat::protocol::MAX_NICKNAME_LEN;
use relay_chat::{AppError, ClientSession};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_chat=warn")),
        )
        .init();

    let mut args = env::args().skip(1);
    let (Some(addr), Some(nickname), None) = (args.next(), args.next(), args.next()) else {
        eprintln!("[ERROR] Invalid input! Please use <DNS|IPv4|IPv6>:<port> <nickname>");
        process::exit(1);
    };

    // Only the length is checked locally; format errors surface as the
    // server's ERR reply
    if nickname.len() > MAX_NICKNAME_LEN {
        eprintln!("[ERROR] Nickname too long!");
        process::exit(1);
    }

    // Resolve the address spec, then connect to the first candidate that
    // accepts
    let candidates: Vec<_> = lookup_host(&addr)
        .await
        .map(|candidates| candidates.collect())
        .unwrap_or_default();
    if candidates.is_empty() {
        eprintln!("[ERROR] {}", AppError::AddressResolution(addr));
        process::exit(1);
    }

    let mut stream = None;
    for candidate in candidates {
        if let Ok(s) = TcpStream::connect(candidate).await {
            stream = Some(s);
            break;
        }
    }
    let Some(stream) = stream else {
        eprintln!("[ERROR] Failed to connect to the host!");
        process::exit(1);
    };
    println!("Connected to {}", addr);

    let session = match ClientSession::connect(stream, nickname).await {
        Ok(session) => {
            println!("Name accepted!");
            session
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = session.run().await {
        eprintln!("[ERROR] {}", e);
        process::exit(1);
    }
}

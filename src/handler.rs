//! TCP connection handler
//!
//! Handles one client socket: sends the protocol greeting, registers with the
//! ChatServer actor, and bridges the socket to the actor in both directions.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::protocol::{ServerMessage, PROTOCOL_VERSION};
use crate::server::ServerCommand;

/// Outbound message buffer per connection
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Handle a newly accepted TCP connection
///
/// Greets the peer with `HELLO`, registers it with the ChatServer, and then
/// pumps lines in and messages out until either direction fails. The
/// connection is never stored if the greeting cannot be delivered, and a full
/// table simply closes the socket without affecting existing sessions.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("new TCP connection from {}", peer_addr);

    let (read_half, mut write_half) = stream.into_split();

    // Protocol announcement precedes registration; a peer that cannot
    // receive it is discarded before it ever occupies a slot
    let hello = ServerMessage::Hello {
        version: PROTOCOL_VERSION.to_string(),
    };
    write_half.write_all(hello.encode().as_bytes()).await?;

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER_SIZE);

    // Register with the ChatServer
    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx
        .send(ServerCommand::Connect {
            sender: msg_tx,
            reply: reply_tx,
        })
        .await
        .is_err()
    {
        error!("failed to register client from {} - server closed", peer_addr);
        return Err(AppError::ChannelSend);
    }

    let slot = match reply_rx.await {
        Ok(Ok(slot)) => slot,
        Ok(Err(e)) => {
            // Table full: drop the socket, existing sessions are unaffected
            info!("rejecting {}: {}", peer_addr, e);
            return Ok(());
        }
        Err(_) => return Err(AppError::ChannelSend),
    };

    info!("client {} is {}", slot, peer_addr);

    // Clone cmd_tx for the read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (socket lines -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if cmd_tx_read
                        .send(ServerCommand::Line { slot, line })
                        .await
                        .is_err()
                    {
                        debug!("server closed, ending read task for {}", slot);
                        break;
                    }
                }
                Ok(None) => {
                    debug!("client {} reached EOF", slot);
                    break;
                }
                Err(e) => {
                    debug!("read error for {}: {}", slot, e);
                    break;
                }
            }
        }
        debug!("read task ended for {}", slot);
    });

    // Spawn write task (ServerMessage -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if write_half.write_all(msg.encode().as_bytes()).await.is_err() {
                debug!("socket write failed, ending write task for {}", slot);
                break;
            }
        }
        debug!("write task ended for {}", slot);
        // Socket closes when the write half drops
    });

    // Wait for either task to complete, then stop the other so a reused
    // slot can never be fed this connection's leftovers
    tokio::select! {
        _ = &mut read_task => {
            debug!("read task completed for {}", slot);
        }
        _ = &mut write_task => {
            debug!("write task completed for {}", slot);
        }
    }
    read_task.abort();
    write_task.abort();

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { slot }).await;

    Ok(())
}

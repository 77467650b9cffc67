//! ChatServer actor implementation
//!
//! The central actor that owns the connection table and drives the protocol
//! state machine for every connection. Uses the Actor pattern with mpsc
//! channels for message passing: no other task ever touches the table, so no
//! locks are needed anywhere.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::table::ConnectionTable;
use crate::types::SlotId;
use crate::validation::is_valid_nickname;

/// Reply sent when a nickname is rejected
const INVALID_NAME: &str = "Invalid name!";

/// Reply sent when a verified client sends anything but a chat line
const INVALID_MESSAGE: &str = "Invalid message!";

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected; the allocated slot (or a capacity error) is
    /// returned over `reply`
    Connect {
        sender: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<SlotId, AppError>>,
    },
    /// One wire line arrived from a client
    Line { slot: SlotId, line: String },
    /// Client disconnected
    Disconnect { slot: SlotId },
}

/// The main ChatServer actor
///
/// Sole owner of the [`ConnectionTable`]; processes commands from connection
/// handlers one at a time, so every state transition is serialized.
pub struct ChatServer {
    table: ConnectionTable,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the default connection capacity
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            table: ConnectionTable::default(),
            receiver,
        }
    }

    /// Create a new ChatServer with an explicit connection capacity
    pub fn with_capacity(receiver: mpsc::Receiver<ServerCommand>, capacity: usize) -> Self {
        Self {
            table: ConnectionTable::new(capacity),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { sender, reply } => {
                self.handle_connect(sender, reply);
            }
            ServerCommand::Line { slot, line } => {
                self.handle_line(slot, line).await;
            }
            ServerCommand::Disconnect { slot } => {
                self.handle_disconnect(slot);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(
        &mut self,
        sender: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<SlotId, AppError>>,
    ) {
        let result = self.table.insert(sender);
        match &result {
            Ok(slot) => info!(
                "client {} connected ({}/{} slots)",
                slot,
                self.table.len(),
                self.table.capacity()
            ),
            Err(_) => warn!("connection table full, rejecting new client"),
        }

        if let Err(result) = reply.send(result) {
            // Handler went away before learning its slot; release it
            if let Ok(slot) = result {
                self.table.remove(slot);
            }
        }
    }

    /// Handle one wire line, advancing the connection's state machine
    async fn handle_line(&mut self, slot: SlotId, line: String) {
        let Some(conn) = self.table.get(slot) else {
            // Line raced with removal; nothing to do
            return;
        };

        match conn.nickname().map(str::to_owned) {
            Some(nickname) => self.handle_chat(slot, nickname, &line).await,
            None => self.handle_nick(slot, &line).await,
        }
    }

    /// Unverified state: only `NICK <name>` is legal
    ///
    /// Anything else draws an `ERR` and the connection stays Unverified;
    /// retries are unlimited.
    async fn handle_nick(&mut self, slot: SlotId, line: &str) {
        match ClientMessage::decode(line) {
            Ok(ClientMessage::Nick { name }) if is_valid_nickname(&name) => {
                info!("client {} registered as '{}'", slot, name);
                if let Some(conn) = self.table.get_mut(slot) {
                    conn.verify(name);
                }
                self.send_or_remove(slot, ServerMessage::NickAccepted).await;
            }
            other => {
                debug!("client {} sent a bad registration: {:?}", slot, other);
                self.send_or_remove(
                    slot,
                    ServerMessage::Error {
                        reason: INVALID_NAME.to_string(),
                    },
                )
                .await;
            }
        }
    }

    /// Verified state: only `MSG <text>` is legal
    ///
    /// A valid chat line is relayed to every live connection including the
    /// sender; anything else (including a second `NICK`) draws an `ERR` to
    /// the sender only.
    async fn handle_chat(&mut self, slot: SlotId, nickname: String, line: &str) {
        match ClientMessage::decode(line) {
            Ok(ClientMessage::Chat { text }) => {
                self.broadcast(ServerMessage::Chat {
                    from: nickname,
                    text,
                })
                .await;
            }
            other => {
                debug!("client {} sent a bad chat line: {:?}", slot, other);
                self.send_or_remove(
                    slot,
                    ServerMessage::Error {
                        reason: INVALID_MESSAGE.to_string(),
                    },
                )
                .await;
            }
        }
    }

    /// Handle client disconnection; idempotent
    fn handle_disconnect(&mut self, slot: SlotId) {
        if self.table.remove(slot).is_some() {
            info!(
                "client {} disconnected ({}/{} slots)",
                slot,
                self.table.len(),
                self.table.capacity()
            );
        }
    }

    /// Relay a message to every live connection, in slot order
    ///
    /// A failed send removes only that connection; the fan-out continues.
    async fn broadcast(&mut self, msg: ServerMessage) {
        let mut dead = Vec::new();
        for slot in self.table.live_slots() {
            if let Some(conn) = self.table.get(slot) {
                if conn.send(msg.clone()).await.is_err() {
                    dead.push(slot);
                }
            }
        }
        for slot in dead {
            warn!("broadcast to client {} failed, dropping it", slot);
            self.table.remove(slot);
        }
    }

    /// Send one message to one connection, removing it if the send fails
    async fn send_or_remove(&mut self, slot: SlotId, msg: ServerMessage) {
        let Some(conn) = self.table.get(slot) else {
            return;
        };
        if conn.send(msg).await.is_err() {
            warn!("send to client {} failed, dropping it", slot);
            self.table.remove(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A test peer registered with a running ChatServer actor
    struct Peer {
        slot: SlotId,
        rx: mpsc::Receiver<ServerMessage>,
    }

    async fn spawn_server(capacity: usize) -> mpsc::Sender<ServerCommand> {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::with_capacity(cmd_rx, capacity).run());
        cmd_tx
    }

    async fn connect(cmd_tx: &mpsc::Sender<ServerCommand>) -> Peer {
        let (tx, rx) = mpsc::channel(32);
        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Connect {
                sender: tx,
                reply: reply_tx,
            })
            .await
            .unwrap();
        let slot = reply_rx.await.unwrap().unwrap();
        Peer { slot, rx }
    }

    async fn send_line(cmd_tx: &mpsc::Sender<ServerCommand>, peer: &Peer, line: &str) {
        cmd_tx
            .send(ServerCommand::Line {
                slot: peer.slot,
                line: line.to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_valid_nick_is_accepted() {
        let cmd_tx = spawn_server(4).await;
        let mut peer = connect(&cmd_tx).await;

        send_line(&cmd_tx, &peer, "NICK alice").await;

        assert_eq!(peer.rx.recv().await, Some(ServerMessage::NickAccepted));
    }

    #[tokio::test]
    async fn test_invalid_nick_is_rejected_and_retry_allowed() {
        let cmd_tx = spawn_server(4).await;
        let mut peer = connect(&cmd_tx).await;

        send_line(&cmd_tx, &peer, "NICK a!ice").await;
        assert_eq!(
            peer.rx.recv().await,
            Some(ServerMessage::Error {
                reason: "Invalid name!".to_string()
            })
        );

        // Connection stayed Unverified; a corrected retry succeeds
        send_line(&cmd_tx, &peer, "NICK alice2").await;
        assert_eq!(peer.rx.recv().await, Some(ServerMessage::NickAccepted));
    }

    #[tokio::test]
    async fn test_chat_before_nick_is_rejected() {
        let cmd_tx = spawn_server(4).await;
        let mut peer = connect(&cmd_tx).await;
        let mut observer = connect(&cmd_tx).await;
        send_line(&cmd_tx, &observer, "NICK bob").await;
        assert_eq!(observer.rx.recv().await, Some(ServerMessage::NickAccepted));

        send_line(&cmd_tx, &peer, "MSG hello").await;

        // The unverified sender is scolded, and nothing is broadcast
        assert_eq!(
            peer.rx.recv().await,
            Some(ServerMessage::Error {
                reason: "Invalid name!".to_string()
            })
        );
        assert!(observer.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_nick_after_verification_is_rejected() {
        let cmd_tx = spawn_server(4).await;
        let mut peer = connect(&cmd_tx).await;
        send_line(&cmd_tx, &peer, "NICK alice").await;
        assert_eq!(peer.rx.recv().await, Some(ServerMessage::NickAccepted));

        send_line(&cmd_tx, &peer, "NICK other").await;

        assert_eq!(
            peer.rx.recv().await,
            Some(ServerMessage::Error {
                reason: "Invalid message!".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_including_sender() {
        let cmd_tx = spawn_server(4).await;
        let mut alice = connect(&cmd_tx).await;
        let mut bob = connect(&cmd_tx).await;
        send_line(&cmd_tx, &alice, "NICK alice").await;
        send_line(&cmd_tx, &bob, "NICK bob").await;
        assert_eq!(alice.rx.recv().await, Some(ServerMessage::NickAccepted));
        assert_eq!(bob.rx.recv().await, Some(ServerMessage::NickAccepted));

        send_line(&cmd_tx, &alice, "MSG hi").await;

        let expected = ServerMessage::Chat {
            from: "alice".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(alice.rx.recv().await, Some(expected.clone()));
        assert_eq!(bob.rx.recv().await, Some(expected));
    }

    #[tokio::test]
    async fn test_broadcast_includes_unverified_connections() {
        let cmd_tx = spawn_server(4).await;
        let mut alice = connect(&cmd_tx).await;
        let mut lurker = connect(&cmd_tx).await;
        send_line(&cmd_tx, &alice, "NICK alice").await;
        assert_eq!(alice.rx.recv().await, Some(ServerMessage::NickAccepted));

        send_line(&cmd_tx, &alice, "MSG hi").await;

        assert_eq!(
            lurker.rx.recv().await,
            Some(ServerMessage::Chat {
                from: "alice".to_string(),
                text: "hi".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_dead_peer_is_pruned_during_broadcast() {
        let cmd_tx = spawn_server(4).await;
        let mut alice = connect(&cmd_tx).await;
        let mut bob = connect(&cmd_tx).await;
        send_line(&cmd_tx, &alice, "NICK alice").await;
        send_line(&cmd_tx, &bob, "NICK bob").await;
        assert_eq!(alice.rx.recv().await, Some(ServerMessage::NickAccepted));
        assert_eq!(bob.rx.recv().await, Some(ServerMessage::NickAccepted));

        // Bob's handler dies without a Disconnect command
        drop(bob.rx);

        send_line(&cmd_tx, &alice, "MSG one").await;
        send_line(&cmd_tx, &alice, "MSG two").await;

        // Alice still receives both of her own echoes
        assert_eq!(
            alice.rx.recv().await,
            Some(ServerMessage::Chat {
                from: "alice".to_string(),
                text: "one".to_string(),
            })
        );
        assert_eq!(
            alice.rx.recv().await,
            Some(ServerMessage::Chat {
                from: "alice".to_string(),
                text: "two".to_string(),
            })
        );

        // Bob's slot was freed; a new connection reuses it
        let newcomer = connect(&cmd_tx).await;
        assert_eq!(newcomer.slot, bob.slot);
    }

    #[tokio::test]
    async fn test_connect_beyond_capacity_fails() {
        let cmd_tx = spawn_server(2).await;
        let _a = connect(&cmd_tx).await;
        let _b = connect(&cmd_tx).await;

        let (tx, _rx) = mpsc::channel(32);
        let (reply_tx, reply_rx) = oneshot::channel();
        cmd_tx
            .send(ServerCommand::Connect {
                sender: tx,
                reply: reply_tx,
            })
            .await
            .unwrap();

        assert!(matches!(reply_rx.await.unwrap(), Err(AppError::TableFull)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let cmd_tx = spawn_server(4).await;
        let peer = connect(&cmd_tx).await;

        for _ in 0..2 {
            cmd_tx
                .send(ServerCommand::Disconnect { slot: peer.slot })
                .await
                .unwrap();
        }

        // The actor is still alive and serving
        let _again = connect(&cmd_tx).await;
    }
}

//! Connection struct definition
//!
//! Represents one connected peer with its protocol state and the channel to
//! its socket writer task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::protocol::ServerMessage;
use crate::types::SlotId;

/// Connected peer information
///
/// Holds everything the server tracks per connection: the table slot it
/// occupies, the outbound message channel, and the registered nickname.
/// A connection is Unverified until a nickname is stored and Verified
/// afterwards; the nickname is present iff the connection is Verified.
#[derive(Debug)]
pub struct Connection {
    /// Slot this connection occupies in the table
    pub id: SlotId,
    /// Server → client message channel; dropping it ends the peer's writer
    /// task, which closes the socket
    pub sender: mpsc::Sender<ServerMessage>,
    /// Nickname (None until the handshake completes)
    nickname: Option<String>,
}

impl Connection {
    /// Create a new, Unverified connection
    pub fn new(id: SlotId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            nickname: None,
        }
    }

    /// Send a message to this peer
    ///
    /// Returns an error if the channel is closed (peer disconnected).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Whether the handshake has completed
    pub fn is_verified(&self) -> bool {
        self.nickname.is_some()
    }

    /// The registered nickname, if Verified
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Transition Unverified → Verified with the given nickname
    ///
    /// Callers must pass a validated name and never re-verify; the protocol
    /// handler routes a second `NICK` to the chat path, where it is rejected.
    pub fn verify(&mut self, nickname: String) {
        debug_assert!(self.nickname.is_none(), "connection verified twice");
        self.nickname = Some(nickname);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_starts_unverified() {
        let (tx, _rx) = mpsc::channel(32);
        let conn = Connection::new(SlotId(0), tx);

        assert!(!conn.is_verified());
        assert!(conn.nickname().is_none());
    }

    #[tokio::test]
    async fn test_verify_stores_nickname() {
        let (tx, _rx) = mpsc::channel(32);
        let mut conn = Connection::new(SlotId(0), tx);

        conn.verify("alice".to_string());

        assert!(conn.is_verified());
        assert_eq!(conn.nickname(), Some("alice"));
    }

    #[tokio::test]
    async fn test_send_delivers_message() {
        let (tx, mut rx) = mpsc::channel(32);
        let conn = Connection::new(SlotId(0), tx);

        conn.send(ServerMessage::NickAccepted).await.unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::NickAccepted));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(32);
        let conn = Connection::new(SlotId(0), tx);
        drop(rx);

        assert!(conn.send(ServerMessage::NickAccepted).await.is_err());
    }
}

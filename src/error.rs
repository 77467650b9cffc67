//! Error types for the chat relay
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::protocol::ParseError;

/// Application-level errors
///
/// Covers both fatal errors (startup failure, connection termination) and
/// protocol-level conditions that are reported to a peer instead of crashing.
#[derive(Debug, Error)]
pub enum AppError {
    /// Host name did not resolve to any usable address (fatal at startup)
    #[error("failed to resolve '{0}'")]
    AddressResolution(String),

    /// IO error; fatal at startup, local to one connection otherwise
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire line
    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// Channel send error (fatal - internal channel broken)
    #[error("channel send error")]
    ChannelSend,

    /// Connection table has no free slot for a new client
    #[error("connection table full")]
    TableFull,

    /// Server announced a protocol version this client does not speak
    #[error("unsupported protocol version '{0}'")]
    UnsupportedProtocol(String),

    /// Server rejected the nickname during the handshake
    #[error("name was not accepted: {0}")]
    NickRejected(String),

    /// Server answered the handshake with something other than OK or ERR
    #[error("unexpected reply from server: {0}")]
    UnexpectedReply(String),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("channel closed")]
    ChannelClosed,
}

//! Wire protocol definitions
//!
//! Newline-delimited ASCII line protocol with five message shapes, split into
//! direction-specific enums. Encoding and decoding are pure transformations;
//! no IO happens here.
//!
//! Wire grammar:
//! - `HELLO <version>` - server announces the protocol on accept
//! - `NICK <name>` - client registers a nickname (one token, 1-12 chars)
//! - `OK` / `ERR <reason>` - server verdicts
//! - `MSG <text>` - client chat line (text may be empty, max 255 bytes)
//! - `MSG <name> <text>` - server broadcast form

use thiserror::Error;

/// Protocol version announced in the `HELLO` line
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum nickname length in bytes
pub const MAX_NICKNAME_LEN: usize = 12;

/// Maximum chat message length in bytes
pub const MAX_MESSAGE_LEN: usize = 255;

/// Errors produced when decoding a wire line
///
/// Oversized or malformed input fails outright; it is never truncated
/// into a shorter valid message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Line does not start with any known command
    #[error("unknown command")]
    UnknownCommand,

    /// `NICK` line carries no name token
    #[error("missing nickname")]
    MissingNickname,

    /// `NICK` line carries more than one token
    #[error("trailing input after nickname")]
    TrailingInput,

    /// Nickname token exceeds [`MAX_NICKNAME_LEN`]
    #[error("nickname exceeds {MAX_NICKNAME_LEN} characters")]
    NicknameTooLong,

    /// Chat text exceeds [`MAX_MESSAGE_LEN`]
    #[error("message exceeds {MAX_MESSAGE_LEN} characters")]
    MessageTooLong,

    /// Broadcast line is missing the sender name or the separating space
    #[error("malformed broadcast line")]
    MalformedBroadcast,
}

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Register a nickname (required before chatting)
    Nick { name: String },
    /// Send a chat line to everyone
    Chat { text: String },
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Protocol announcement, sent once per connection right after accept
    Hello { version: String },
    /// Nickname registration accepted
    NickAccepted,
    /// Request rejected; the connection stays open
    Error { reason: String },
    /// Chat line relayed to every live connection
    Chat { from: String, text: String },
}

/// Strip at most one trailing newline so both terminated wire lines and
/// already-split lines decode identically.
fn trim_terminator(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

impl ClientMessage {
    /// Encode into a full wire line, including the trailing newline
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::Nick { name } => format!("NICK {}\n", name),
            ClientMessage::Chat { text } => format!("MSG {}\n", text),
        }
    }

    /// Decode a client wire line
    pub fn decode(line: &str) -> Result<Self, ParseError> {
        let line = trim_terminator(line);

        if let Some(rest) = line.strip_prefix("NICK ") {
            let mut tokens = rest.split_ascii_whitespace();
            let name = tokens.next().ok_or(ParseError::MissingNickname)?;
            if tokens.next().is_some() {
                return Err(ParseError::TrailingInput);
            }
            if name.len() > MAX_NICKNAME_LEN {
                return Err(ParseError::NicknameTooLong);
            }
            Ok(ClientMessage::Nick {
                name: name.to_string(),
            })
        } else if let Some(text) = line.strip_prefix("MSG ") {
            if text.len() > MAX_MESSAGE_LEN {
                return Err(ParseError::MessageTooLong);
            }
            Ok(ClientMessage::Chat {
                text: text.to_string(),
            })
        } else if line == "NICK" {
            Err(ParseError::MissingNickname)
        } else {
            Err(ParseError::UnknownCommand)
        }
    }
}

impl ServerMessage {
    /// Encode into a full wire line, including the trailing newline
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Hello { version } => format!("HELLO {}\n", version),
            ServerMessage::NickAccepted => "OK\n".to_string(),
            ServerMessage::Error { reason } => format!("ERR {}\n", reason),
            ServerMessage::Chat { from, text } => format!("MSG {} {}\n", from, text),
        }
    }

    /// Decode a server wire line
    pub fn decode(line: &str) -> Result<Self, ParseError> {
        let line = trim_terminator(line);

        if let Some(version) = line.strip_prefix("HELLO ") {
            Ok(ServerMessage::Hello {
                version: version.to_string(),
            })
        } else if line == "OK" {
            Ok(ServerMessage::NickAccepted)
        } else if let Some(reason) = line.strip_prefix("ERR ") {
            Ok(ServerMessage::Error {
                reason: reason.to_string(),
            })
        } else if let Some(rest) = line.strip_prefix("MSG ") {
            // First token is the sender, everything after one space is the text
            let (from, text) = rest
                .split_once(' ')
                .ok_or(ParseError::MalformedBroadcast)?;
            if from.is_empty() || from.len() > MAX_NICKNAME_LEN {
                return Err(ParseError::MalformedBroadcast);
            }
            if text.len() > MAX_MESSAGE_LEN {
                return Err(ParseError::MessageTooLong);
            }
            Ok(ServerMessage::Chat {
                from: from.to_string(),
                text: text.to_string(),
            })
        } else {
            Err(ParseError::UnknownCommand)
        }
    }
}

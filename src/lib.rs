//! Multi-client TCP text chat relay
//!
//! A line-protocol chat service: the server greets every connection with a
//! protocol announcement, requires nickname registration, and then relays
//! each accepted chat line to every live connection. The companion client
//! performs the mirror-image handshake and interleaves keyboard input with
//! incoming broadcasts.
//!
//! # Wire protocol
//! Newline-delimited ASCII lines over TCP:
//! - `HELLO 1` - server -> client, once per connection on accept
//! - `NICK <name>` - registration attempt (1-12 chars of `[A-Za-z0-9_]`)
//! - `OK` / `ERR <reason>` - server verdicts
//! - `MSG <text>` - chat line, client -> server (max 255 bytes)
//! - `MSG <name> <text>` - broadcast form, relayed to everyone including
//!   the sender
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor and the sole owner of the
//!   fixed-capacity `ConnectionTable`
//! - Each socket gets a `handler` task bridging it to the actor
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use relay_chat::{ChatServer, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:7667").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod connection;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod session;
pub mod table;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use connection::Connection;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use protocol::{ClientMessage, ParseError, ServerMessage};
pub use server::{ChatServer, ServerCommand};
pub use session::ClientSession;
pub use table::ConnectionTable;
pub use types::SlotId;
pub use validation::is_valid_nickname;

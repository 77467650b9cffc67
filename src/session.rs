//! Client session
//!
//! The client-side mirror of the server's protocol: perform the two-step
//! handshake as the initiating peer, then interleave keyboard input with
//! incoming broadcasts.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::warn;

use crate::error::AppError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};

/// An established, verified chat session
///
/// Constructed by [`ClientSession::connect`], which consumes the handshake;
/// afterwards [`ClientSession::run`] pumps stdin and the socket until one of
/// them ends the session.
#[derive(Debug)]
pub struct ClientSession {
    nickname: String,
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl ClientSession {
    /// Perform the handshake on a fresh connection
    ///
    /// Expects `HELLO 1`, registers `nickname`, and requires `OK` back.
    /// Any other outcome is fatal: the server speaks a different protocol
    /// version, rejected the name, or went away.
    pub async fn connect(stream: TcpStream, nickname: String) -> Result<Self, AppError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half).lines();

        let line = reader
            .next_line()
            .await?
            .ok_or(AppError::ConnectionClosed)?;
        match ServerMessage::decode(&line) {
            Ok(ServerMessage::Hello { version }) if version == PROTOCOL_VERSION => {}
            Ok(ServerMessage::Hello { version }) => {
                return Err(AppError::UnsupportedProtocol(version));
            }
            _ => return Err(AppError::UnexpectedReply(line)),
        }

        let nick = ClientMessage::Nick {
            name: nickname.clone(),
        };
        writer.write_all(nick.encode().as_bytes()).await?;

        let line = reader
            .next_line()
            .await?
            .ok_or(AppError::ConnectionClosed)?;
        match ServerMessage::decode(&line) {
            Ok(ServerMessage::NickAccepted) => {}
            Ok(ServerMessage::Error { reason }) => {
                return Err(AppError::NickRejected(reason));
            }
            _ => return Err(AppError::UnexpectedReply(line)),
        }

        Ok(Self {
            nickname,
            reader,
            writer,
        })
    }

    /// Run the chat loop until stdin or the server ends the session
    ///
    /// Keyboard lines are wrapped as `MSG <text>` and sent; incoming
    /// broadcasts are printed as `<name>: <text>`, except that broadcasts
    /// attributed to this client's own nickname are suppressed. Unparseable
    /// or unexpected server lines are reported and skipped; only a socket
    /// failure (or EOF) ends the session with an error.
    pub async fn run(mut self) -> Result<(), AppError> {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                input = stdin.next_line() => match input? {
                    Some(text) => {
                        let msg = ClientMessage::Chat { text };
                        self.writer.write_all(msg.encode().as_bytes()).await?;
                    }
                    // Keyboard EOF: leave quietly
                    None => return Ok(()),
                },
                line = self.reader.next_line() => {
                    let line = line?.ok_or(AppError::ConnectionClosed)?;
                    self.display(&line);
                }
            }
        }
    }

    /// Print one incoming server line, applying self-echo suppression
    fn display(&self, line: &str) {
        match ServerMessage::decode(line) {
            Ok(ServerMessage::Chat { from, text }) => {
                // The server echoes our own messages back; filter them by
                // name, which also hides same-named peers
                if from != self.nickname {
                    println!("{}: {}", from, text);
                }
            }
            Ok(ServerMessage::Error { reason }) => {
                warn!("server: {}", reason);
            }
            Ok(other) => {
                warn!("ignoring unexpected server line: {:?}", other);
            }
            Err(e) => {
                warn!("failed to parse server line {:?}: {}", line, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn serve_one(greeting: &'static [u8], reply: &'static [u8]) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(greeting).await.unwrap();
            socket.write_all(reply).await.unwrap();
            // Keep the socket open until the client is done with it
            let mut buf = vec![0u8; 64];
            while socket.read(&mut buf).await.map(|n| n > 0).unwrap_or(false) {}
        });
        addr
    }

    #[tokio::test]
    async fn test_handshake_succeeds() {
        let addr = serve_one(b"HELLO 1\n", b"OK\n").await;
        let stream = TcpStream::connect(addr).await.unwrap();

        let session = ClientSession::connect(stream, "alice".to_string()).await;

        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn test_handshake_rejects_unknown_version() {
        let addr = serve_one(b"HELLO 2\n", b"OK\n").await;
        let stream = TcpStream::connect(addr).await.unwrap();

        let err = ClientSession::connect(stream, "alice".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedProtocol(v) if v == "2"));
    }

    #[tokio::test]
    async fn test_handshake_surfaces_nick_rejection() {
        let addr = serve_one(b"HELLO 1\n", b"ERR Invalid name!\n").await;
        let stream = TcpStream::connect(addr).await.unwrap();

        let err = ClientSession::connect(stream, "a!ice".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NickRejected(r) if r == "Invalid name!"));
    }

    #[tokio::test]
    async fn test_handshake_fails_on_garbage_greeting() {
        let addr = serve_one(b"WELCOME\n", b"OK\n").await;
        let stream = TcpStream::connect(addr).await.unwrap();

        let err = ClientSession::connect(stream, "alice".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnexpectedReply(_)));
    }
}

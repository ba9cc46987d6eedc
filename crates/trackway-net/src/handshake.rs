//! Connection handshake, both sides.
//!
//! ```text
//! C→S: HANDSHAKE TAOnline <nickname>
//! S→C: ACCEPT TAOnline        | ERROR UnknownHandshake
//! C→S: ACK
//! S→C: ACK <id>               | ERROR <reason>
//! ```
//!
//! The final `ACK <id>` / `ERROR` is sent by registration, not here.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use trackway_game::PlayerId;

use crate::framing::{LineConfig, LineError, read_line, write_line};
use crate::messages::{ACK, HANDSHAKE, PROTOCOL_NAME, ServerMessage};

/// Reason sent when the greeting is not understood.
pub const UNKNOWN_HANDSHAKE: &str = "UnknownHandshake";

/// Why a handshake failed.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The peer did not send a line in time.
    #[error("handshake timed out")]
    Timeout,
    /// The greeting is not `HANDSHAKE TAOnline <nickname>`.
    #[error("unrecognised greeting {0:?}")]
    Malformed(String),
    /// The client answered `ACCEPT` with something other than `ACK`.
    #[error("expected ACK, got {0:?}")]
    MissingAck(String),
    /// The server answered with `ERROR <reason>`.
    #[error("server refused: {0}")]
    Rejected(String),
    /// The server answered with something unexpected.
    #[error("unexpected reply {0:?}")]
    UnexpectedReply(String),
    /// Framing failed.
    #[error(transparent)]
    Line(#[from] LineError),
}

async fn read_within<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    config: &LineConfig,
    limit: Duration,
) -> Result<String, HandshakeError> {
    match tokio::time::timeout(limit, read_line(reader, config)).await {
        Ok(line) => Ok(line?),
        Err(_) => Err(HandshakeError::Timeout),
    }
}

/// Server side, up to and including the client's `ACK`. Returns the
/// nickname. Each read is bounded by `limit`.
///
/// A failure other than a wrong `ACK` is answered with
/// `ERROR UnknownHandshake` before returning; a wrong `ACK` gets no reply.
pub async fn accept_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    config: &LineConfig,
    limit: Duration,
) -> Result<String, HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = server_exchange(reader, writer, config, limit).await;
    if let Err(err) = &result
        && !matches!(err, HandshakeError::MissingAck(_))
    {
        let reply = ServerMessage::Error(UNKNOWN_HANDSHAKE.to_string()).to_string();
        let _ = write_line(writer, &reply).await;
    }
    result
}

async fn server_exchange<R, W>(
    reader: &mut R,
    writer: &mut W,
    config: &LineConfig,
    limit: Duration,
) -> Result<String, HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = read_within(reader, config, limit).await?;
    let tokens: Vec<&str> = greeting.split_whitespace().collect();
    let name = match tokens.as_slice() {
        [HANDSHAKE, PROTOCOL_NAME, name, ..] => name.to_string(),
        _ => return Err(HandshakeError::Malformed(greeting)),
    };

    write_line(writer, &ServerMessage::Accept.to_string()).await?;

    let ack = read_within(reader, config, limit).await?;
    if ack != ACK {
        return Err(HandshakeError::MissingAck(ack));
    }
    Ok(name)
}

/// Client side, through to the server's `ACK <id>`. Returns the assigned id.
pub async fn connect_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    name: &str,
    config: &LineConfig,
) -> Result<PlayerId, HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(writer, &format!("{HANDSHAKE} {PROTOCOL_NAME} {name}")).await?;

    let reply = read_line(reader, config).await?;
    if reply != ServerMessage::Accept.to_string() {
        return Err(refusal(reply));
    }

    write_line(writer, ACK).await?;

    let reply = read_line(reader, config).await?;
    match reply.split_once(' ') {
        Some((ACK, id)) => id
            .trim()
            .parse()
            .map(PlayerId)
            .map_err(|_| HandshakeError::UnexpectedReply(reply.clone())),
        _ => Err(refusal(reply)),
    }
}

fn refusal(reply: String) -> HandshakeError {
    match reply.strip_prefix("ERROR ") {
        Some(reason) => HandshakeError::Rejected(reason.to_string()),
        None => HandshakeError::UnexpectedReply(reply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader, duplex, split};

    const LIMIT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_accepts_greeting_and_ack() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let mut server_rd = BufReader::new(server_rd);
        let (client_rd, mut client_wr) = split(client);
        let mut client_rd = BufReader::new(client_rd);
        let config = LineConfig::default();

        client_wr
            .write_all(b"HANDSHAKE TAOnline ada extra tokens\nACK\n")
            .await
            .unwrap();
        let name = accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT)
            .await
            .unwrap();
        assert_eq!(name, "ada");
        assert_eq!(
            read_line(&mut client_rd, &config).await.unwrap(),
            "ACCEPT TAOnline"
        );
    }

    #[tokio::test]
    async fn test_bad_greeting_gets_error() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let mut server_rd = BufReader::new(server_rd);
        let (client_rd, mut client_wr) = split(client);
        let mut client_rd = BufReader::new(client_rd);
        let config = LineConfig::default();

        client_wr.write_all(b"HELLO TAOnline ada\n").await.unwrap();
        let result = accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT).await;
        assert!(matches!(result, Err(HandshakeError::Malformed(_))));
        assert_eq!(
            read_line(&mut client_rd, &config).await.unwrap(),
            "ERROR UnknownHandshake"
        );
    }

    #[tokio::test]
    async fn test_missing_nickname_is_malformed() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let mut server_rd = BufReader::new(server_rd);
        let (_client_rd, mut client_wr) = split(client);

        client_wr.write_all(b"HANDSHAKE TAOnline\n").await.unwrap();
        let result =
            accept_handshake(&mut server_rd, &mut server_wr, &LineConfig::default(), LIMIT).await;
        assert!(matches!(result, Err(HandshakeError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let mut server_rd = BufReader::new(server_rd);
        let (client_rd, _client_wr) = split(client);
        let mut client_rd = BufReader::new(client_rd);
        let config = LineConfig::default();

        let result = accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT).await;
        assert!(matches!(result, Err(HandshakeError::Timeout)));
        assert_eq!(
            read_line(&mut client_rd, &config).await.unwrap(),
            "ERROR UnknownHandshake"
        );
    }

    #[tokio::test]
    async fn test_wrong_ack_closes_silently() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let mut server_rd = BufReader::new(server_rd);
        let (client_rd, mut client_wr) = split(client);
        let mut client_rd = BufReader::new(client_rd);
        let config = LineConfig::default();

        client_wr
            .write_all(b"HANDSHAKE TAOnline ada\nNACK\n")
            .await
            .unwrap();
        let result = accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT).await;
        assert!(matches!(result, Err(HandshakeError::MissingAck(ref s)) if s == "NACK"));
        drop(server_wr);
        drop(server_rd);

        assert_eq!(
            read_line(&mut client_rd, &config).await.unwrap(),
            "ACCEPT TAOnline"
        );
        assert!(matches!(
            read_line(&mut client_rd, &config).await,
            Err(LineError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_client_side_against_server_side() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let (client_rd, mut client_wr) = split(client);
        let config = LineConfig::default();

        let server_task = tokio::spawn(async move {
            let mut server_rd = BufReader::new(server_rd);
            let config = LineConfig::default();
            let name = accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT)
                .await
                .unwrap();
            write_line(&mut server_wr, "ACK 42").await.unwrap();
            name
        });

        let mut client_rd = BufReader::new(client_rd);
        let id = connect_handshake(&mut client_rd, &mut client_wr, "bo", &config)
            .await
            .unwrap();
        assert_eq!(id, PlayerId(42));
        assert_eq!(server_task.await.unwrap(), "bo");
    }

    #[tokio::test]
    async fn test_client_side_sees_refusal() {
        let (client, server) = duplex(1024);
        let (server_rd, mut server_wr) = split(server);
        let (client_rd, mut client_wr) = split(client);

        tokio::spawn(async move {
            let mut server_rd = BufReader::new(server_rd);
            let config = LineConfig::default();
            accept_handshake(&mut server_rd, &mut server_wr, &config, LIMIT)
                .await
                .unwrap();
            write_line(&mut server_wr, "ERROR Server is full").await.unwrap();
        });

        let mut client_rd = BufReader::new(client_rd);
        let result =
            connect_handshake(&mut client_rd, &mut client_wr, "bo", &LineConfig::default()).await;
        assert!(matches!(result, Err(HandshakeError::Rejected(ref r)) if r == "Server is full"));
    }
}

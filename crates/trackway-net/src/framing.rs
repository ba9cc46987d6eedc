//! Newline-delimited framing for TCP streams.
//!
//! Every message on the wire is one UTF-8 line:
//!
//! ```text
//! +----------------------------+------+
//! |  payload (no '\n')         | '\n' |
//! +----------------------------+------+
//! ```
//!
//! A trailing `'\r'` before the newline is stripped on read. A final line
//! without a newline before EOF is still delivered.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum accepted line length in bytes, excluding the newline.
    pub max_line_length: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
        }
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// No newline within the configured maximum. The rest of the line
    /// was discarded.
    #[error("line exceeds maximum length {max}")]
    LineTooLong {
        /// The configured maximum.
        max: usize,
    },

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// The line is not valid UTF-8. The bytes were consumed.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one line from the stream, without its terminator.
///
/// Returns [`LineError::ConnectionClosed`] at EOF.
pub async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    config: &LineConfig,
) -> Result<String, LineError> {
    let limit = config.max_line_length as u64 + 1;
    let mut buf = Vec::new();
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Err(LineError::ConnectionClosed);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() as u64 >= limit {
        discard_line(reader).await?;
        return Err(LineError::LineTooLong {
            max: config.max_line_length,
        });
    }

    String::from_utf8(buf).map_err(|_| LineError::InvalidUtf8)
}

/// Drop input up to and including the next `'\n'`, or to EOF.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<(), LineError> {
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(());
        }
        match chunk.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
            }
        }
    }
}

/// Write one line followed by `'\n'` and flush.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), LineError> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{BufReader, duplex};

    fn default_config() -> LineConfig {
        LineConfig::default()
    }

    #[tokio::test]
    async fn test_single_line_roundtrip() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);

        write_line(&mut client, "HANDSHAKE TAOnline ada").await.unwrap();
        let received = read_line(&mut server, &default_config()).await.unwrap();
        assert_eq!(received, "HANDSHAKE TAOnline ada");
    }

    #[tokio::test]
    async fn test_back_to_back_lines_dont_merge() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        let config = default_config();

        client.write_all(b"READY\nPING\nMSG hi there\n").await.unwrap();

        assert_eq!(read_line(&mut server, &config).await.unwrap(), "READY");
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "PING");
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "MSG hi there");
    }

    #[tokio::test]
    async fn test_partial_read_resumes_correctly() {
        // tiny buffer forces the line to arrive in pieces
        let (mut client, server) = duplex(8);
        let mut server = BufReader::new(server);
        let line = "PLACERAIL 10 7 NE and a long tail that spans many reads";

        let write_task = tokio::spawn(async move {
            write_line(&mut client, line).await.unwrap();
        });

        let received = read_line(&mut server, &default_config()).await.unwrap();
        write_task.await.unwrap();
        assert_eq!(received, line);
    }

    #[tokio::test]
    async fn test_crlf_stripped() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);

        client.write_all(b"ACK\r\n").await.unwrap();
        assert_eq!(read_line(&mut server, &default_config()).await.unwrap(), "ACK");
    }

    #[tokio::test]
    async fn test_empty_line() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);

        client.write_all(b"\nREADY\n").await.unwrap();
        let config = default_config();
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "");
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "READY");
    }

    #[tokio::test]
    async fn test_oversized_line_rejected() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        let config = LineConfig { max_line_length: 8 };

        client.write_all(b"MSG this is far too long\nREADY\n").await.unwrap();
        let result = read_line(&mut server, &config).await;
        assert!(matches!(result, Err(LineError::LineTooLong { max: 8 })));
        // the tail of the long line is skipped, not read as a command
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "READY");
    }

    #[tokio::test]
    async fn test_oversized_line_spanning_reads_is_skipped() {
        let (mut client, server) = duplex(16);
        let mut server = BufReader::with_capacity(4, server);
        let config = LineConfig { max_line_length: 8 };

        let write_task = tokio::spawn(async move {
            let mut line = "MSG ".to_string();
            line.push_str(&"x".repeat(200));
            write_line(&mut client, &line).await.unwrap();
            write_line(&mut client, "PING").await.unwrap();
        });

        assert!(matches!(
            read_line(&mut server, &config).await,
            Err(LineError::LineTooLong { max: 8 })
        ));
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "PING");
        write_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        let config = LineConfig { max_line_length: 5 };

        client.write_all(b"READY\n").await.unwrap();
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "READY");
    }

    #[tokio::test]
    async fn test_invalid_utf8_consumes_line() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        let config = default_config();

        client.write_all(b"MSG \xff\xfe\nPING\n").await.unwrap();
        assert!(matches!(
            read_line(&mut server, &config).await,
            Err(LineError::InvalidUtf8)
        ));
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "PING");
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let (mut client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        let config = default_config();

        client.write_all(b"READY").await.unwrap();
        drop(client);
        assert_eq!(read_line(&mut server, &config).await.unwrap(), "READY");
        assert!(matches!(
            read_line(&mut server, &config).await,
            Err(LineError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (client, server) = duplex(8192);
        let mut server = BufReader::new(server);
        drop(client);

        let result = read_line(&mut server, &default_config()).await;
        assert!(matches!(result, Err(LineError::ConnectionClosed)));
    }
}

//! TCP client for a Trackway game server.
//!
//! Performs the client side of the handshake, then exposes line-level send
//! and receive. A background task sends `PING` at a fixed interval so idle
//! connections survive middleboxes. State changes are broadcast via a
//! [`watch`] channel so any number of consumers can react without polling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use trackway_game::PlayerId;

use crate::framing::{LineConfig, LineError, read_line, write_line};
use crate::handshake::{HandshakeError, connect_handshake};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP connect and handshake in progress.
    Connecting,
    /// Handshake complete, the server assigned an id.
    Connected,
    /// Connection lost or intentionally closed.
    Disconnected,
}

/// Observable connection state backed by a [`watch`] channel.
pub struct ConnectionStateWatch {
    tx: watch::Sender<ConnectionState>,
    rx: watch::Receiver<ConnectionState>,
}

impl Default for ConnectionStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateWatch {
    /// Create a new watch initialized to [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx, rx }
    }

    /// Set the current connection state, notifying all subscribers.
    pub fn set(&self, state: ConnectionState) {
        let _ = self.tx.send(state);
    }

    /// Return a new subscriber receiver.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.rx.clone()
    }

    /// Return the current state without blocking.
    pub fn current(&self) -> ConnectionState {
        *self.rx.borrow()
    }
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interval between `PING` lines. Default: 10 s.
    pub ping_interval: Duration,
    /// Framing limits.
    pub line: LineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            line: LineConfig::default(),
        }
    }
}

/// Why [`GameClient::connect`] failed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// TCP connect failed.
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    /// The handshake failed or the server refused registration.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

/// Handle to a registered session with a game server.
pub struct GameClient {
    id: PlayerId,
    reader: BufReader<OwnedReadHalf>,
    /// Writer half, shared with the heartbeat task.
    writer: Arc<Mutex<OwnedWriteHalf>>,
    line: LineConfig,
    state: Arc<ConnectionStateWatch>,
    /// Sending `true` stops the heartbeat task.
    shutdown_tx: watch::Sender<bool>,
}

impl GameClient {
    /// Connect with default settings and register as `name`.
    pub async fn connect(addr: SocketAddr, name: &str) -> Result<Self, ClientError> {
        Self::connect_with(addr, name, ClientConfig::default()).await
    }

    /// Connect to `addr`, run the handshake as `name` and start the
    /// heartbeat. Returns once the server has assigned an id.
    pub async fn connect_with(
        addr: SocketAddr,
        name: &str,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let state = Arc::new(ConnectionStateWatch::new());
        state.set(ConnectionState::Connecting);

        let result = Self::establish(addr, name, &config).await;
        let (id, reader, writer) = match result {
            Ok(parts) => parts,
            Err(err) => {
                state.set(ConnectionState::Disconnected);
                return Err(err);
            }
        };
        state.set(ConnectionState::Connected);
        tracing::debug!(id = %id, name, "registered with server");

        let writer = Arc::new(Mutex::new(writer));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let hb_writer = Arc::clone(&writer);
        let hb_state = Arc::clone(&state);
        let interval = config.ping_interval;
        tokio::spawn(async move {
            heartbeat_loop(&hb_writer, &hb_state, shutdown_rx, interval).await;
        });

        Ok(Self {
            id,
            reader,
            writer,
            line: config.line,
            state,
            shutdown_tx,
        })
    }

    async fn establish(
        addr: SocketAddr,
        name: &str,
        config: &ClientConfig,
    ) -> Result<(PlayerId, BufReader<OwnedReadHalf>, OwnedWriteHalf), ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let id = connect_handshake(&mut reader, &mut writer, name, &config.line).await?;
        Ok((id, reader, writer))
    }

    /// Id assigned by the server.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Return the connection state watch.
    pub fn state(&self) -> &Arc<ConnectionStateWatch> {
        &self.state
    }

    /// Send one line.
    pub async fn send_line(&self, line: &str) -> Result<(), LineError> {
        let mut writer = self.writer.lock().await;
        let result = write_line(&mut *writer, line).await;
        if result.is_err() {
            self.state.set(ConnectionState::Disconnected);
        }
        result
    }

    /// Receive the next line. Any error marks the connection disconnected.
    pub async fn recv_line(&mut self) -> Result<String, LineError> {
        let result = read_line(&mut self.reader, &self.line).await;
        if result.is_err() {
            self.state.set(ConnectionState::Disconnected);
        }
        result
    }

    /// Stop the heartbeat and close the write side.
    pub async fn disconnect(&self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.writer.lock().await.shutdown().await;
        self.state.set(ConnectionState::Disconnected);
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Send `PING` every `period` until shutdown or a write fails.
async fn heartbeat_loop(
    writer: &Mutex<OwnedWriteHalf>,
    state: &ConnectionStateWatch,
    mut shutdown_rx: watch::Receiver<bool>,
    period: Duration,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if state.current() != ConnectionState::Connected {
                    break;
                }
                let mut w = writer.lock().await;
                if write_line(&mut *w, "PING").await.is_err() {
                    tracing::warn!("heartbeat write failed");
                    state.set(ConnectionState::Disconnected);
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

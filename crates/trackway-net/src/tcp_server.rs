//! TCP server: accept loop, per-connection tasks and the operator console.
//!
//! Each accepted socket gets an id, then a task that runs the handshake and
//! registration. Once admitted, a reader loop forwards lines to the command
//! channel and a writer task drains the client's outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc, watch};
use trackway_game::PlayerId;

use crate::channel::{CommandReceiver, CommandSender, command_channel};
use crate::framing::{LineConfig, LineError, read_line, write_line};
use crate::handshake::accept_handshake;
use crate::messages::{ConsoleCommand, ServerMessage};
use crate::routing::Dispatcher;
use crate::session::{ClientLink, LobbyLimits, SessionRegistry};

/// Atomic generator for monotonically increasing client ids.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique id.
    pub fn next_id(&self) -> PlayerId {
        PlayerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for [`GameServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Default: `0.0.0.0:4686`.
    pub bind_addr: SocketAddr,
    /// Lobby limits.
    pub limits: LobbyLimits,
    /// Bound on each handshake read. Default: 500 ms.
    pub handshake_timeout: Duration,
    /// Framing limits.
    pub line: LineConfig,
    /// Fixed seed for city dealing.
    pub city_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4686)),
            limits: LobbyLimits::default(),
            handshake_timeout: Duration::from_millis(500),
            line: LineConfig::default(),
            city_seed: None,
        }
    }
}

/// What a connection task needs, shared by all of them.
#[derive(Clone)]
struct ConnectionContext {
    registry: Arc<SessionRegistry>,
    commands: CommandSender,
    line: LineConfig,
    handshake_timeout: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

/// TCP game server that accepts connections and manages their lifecycle.
pub struct GameServer {
    config: ServerConfig,
    /// Connected clients and server status (public for test inspection).
    pub registry: Arc<SessionRegistry>,
    id_gen: Arc<IdGenerator>,
    commands: CommandSender,
    dispatcher: Mutex<Option<(Dispatcher, CommandReceiver)>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GameServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let registry = Arc::new(SessionRegistry::new(config.limits));
        let (commands, receiver) = command_channel();
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            config.city_seed,
            Arc::clone(&shutdown_tx),
        );
        Self {
            config,
            registry,
            id_gen: Arc::new(IdGenerator::new()),
            commands,
            dispatcher: Mutex::new(Some((dispatcher, receiver))),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Bind to the configured address and run the server.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);
        self.run_with_listener(listener).await
    }

    /// Run the consumer and the accept loop on a pre-bound listener (useful
    /// for tests). Returns after shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let (dispatcher, receiver) = self
            .dispatcher
            .lock()
            .await
            .take()
            .ok_or_else(|| std::io::Error::other("server is already running"))?;
        let consumer = tokio::spawn(dispatcher.run(receiver));

        let mut shutdown_rx = self.shutdown_rx.clone();
        let context = ConnectionContext {
            registry: Arc::clone(&self.registry),
            commands: self.commands.clone(),
            line: self.config.line.clone(),
            handshake_timeout: self.config.handshake_timeout,
            shutdown_rx: self.shutdown_rx.clone(),
        };

        while !*shutdown_rx.borrow() {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer_addr) = match result {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            tracing::warn!("Accept failed: {err}");
                            continue;
                        }
                    };
                    let id = self.id_gen.next_id();
                    tracing::info!(id = %id, peer = %peer_addr, "accepted connection");

                    let context = context.clone();
                    tokio::spawn(async move {
                        handle_connection(id, stream, context).await;
                        tracing::info!(id = %id, "connection closed");
                    });
                }
                _ = shutdown_rx.changed() => {}
            }
        }

        tracing::info!("Server shutting down");
        let _ = consumer.await;
        Ok(())
    }

    /// Producer handle for feeding console lines from outside.
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether shutdown was signalled.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Read operator commands from `input` until EOF or shutdown. `EXIT`
    /// shuts the server down; everything else is queued for the consumer.
    pub async fn run_console<R: AsyncBufRead + Unpin>(&self, mut input: R) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let config = LineConfig::default();
        while !*shutdown_rx.borrow() {
            tokio::select! {
                line = read_line(&mut input, &config) => {
                    match line {
                        Ok(line) if matches!(line.parse::<ConsoleCommand>(), Ok(ConsoleCommand::Exit)) => {
                            self.shutdown();
                        }
                        Ok(line) => {
                            self.commands.console_line(line);
                        }
                        Err(err @ (LineError::InvalidUtf8 | LineError::LineTooLong { .. })) => {
                            tracing::warn!(error = %err, "console line dropped");
                        }
                        Err(_) => break,
                    }
                }
                _ = shutdown_rx.changed() => {}
            }
        }
    }
}

/// Handshake, registration, then the read loop. The writer task runs
/// alongside once the client is admitted.
async fn handle_connection(id: PlayerId, stream: TcpStream, context: ConnectionContext) {
    if let Err(err) = stream.set_nodelay(true) {
        tracing::debug!(id = %id, "set_nodelay failed: {err}");
    }
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let name = match accept_handshake(
        &mut reader,
        &mut writer,
        &context.line,
        context.handshake_timeout,
    )
    .await
    {
        Ok(name) => name,
        Err(err) => {
            tracing::info!(id = %id, error = %err, "handshake failed");
            let _ = writer.shutdown().await;
            return;
        }
    };

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (close, close_rx) = watch::channel(false);
    if let Err(err) = context
        .registry
        .register(id, &name, ClientLink { outbound, close })
        .await
    {
        tracing::info!(id = %id, name = %name, reason = %err, "registration refused");
        let _ = write_line(&mut writer, &ServerMessage::Error(err.to_string()).to_string()).await;
        let _ = writer.shutdown().await;
        return;
    }

    let writer_task = tokio::spawn(write_loop(writer, outbound_rx, context.shutdown_rx.clone()));
    read_loop(id, &name, reader, close_rx, &context).await;
    context.commands.client_closed(id);
    let _ = writer_task.await;
}

async fn read_loop(
    id: PlayerId,
    name: &str,
    mut reader: BufReader<OwnedReadHalf>,
    mut close_rx: watch::Receiver<bool>,
    context: &ConnectionContext,
) {
    let mut shutdown_rx = context.shutdown_rx.clone();
    loop {
        if *close_rx.borrow() || *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            line = read_line(&mut reader, &context.line) => {
                match line {
                    Ok(line) => {
                        tracing::trace!(id = %id, line = %line, "recv");
                        if !context.commands.client_line(id, line) {
                            break;
                        }
                    }
                    Err(LineError::InvalidUtf8) => {
                        tracing::warn!(id = %id, name, "invalid data: not UTF-8");
                    }
                    Err(err @ LineError::LineTooLong { .. }) => {
                        tracing::warn!(id = %id, name, error = %err, "invalid data: line dropped");
                    }
                    Err(err) => {
                        tracing::debug!(id = %id, name, error = %err, "read ended");
                        break;
                    }
                }
            }
            changed = close_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

/// Write queued lines until the queue closes (client unregistered), a write
/// fails or the server shuts down, then close the socket.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            line = outbound.recv() => {
                let Some(line) = line else { break };
                if write_line(&mut writer, &line).await.is_err() {
                    break;
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    let _ = writer.shutdown().await;
}

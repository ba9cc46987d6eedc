//! Session registry: the connected clients, their ready flags and the
//! coarse server status.
//!
//! The roster sits behind one [`RwLock`] touched by the accept path
//! (registration) and by the consumer (everything else). Outbound lines go
//! through each client's unbounded queue, so sending never blocks and a dead
//! socket never fails a broadcast.

use tokio::sync::{RwLock, mpsc, watch};
use trackway_game::PlayerId;

use crate::messages::ServerMessage;

/// Coarse server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Accepting joins; no round is running.
    Ready,
    /// A round is being set up.
    Starting,
    /// A round is live.
    InGame,
}

/// Lobby size limits.
#[derive(Debug, Clone, Copy)]
pub struct LobbyLimits {
    /// Connected clients at most.
    pub max_players: usize,
    /// Ready clients needed to start a round.
    pub min_players: usize,
}

impl Default for LobbyLimits {
    fn default() -> Self {
        Self {
            max_players: 6,
            min_players: 2,
        }
    }
}

/// Why a handshaken client was not admitted. `Display` is the reason sent
/// in the `ERROR` line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    /// A round is running.
    #[error("The game is already running!")]
    NotAccepting,
    /// The lobby is full.
    #[error("Server is full")]
    ServerFull,
    /// Another connected client uses this name.
    #[error("Name is already in use on the server")]
    NameTaken,
}

/// Outbound side of one connection, as held by the registry.
#[derive(Debug)]
pub struct ClientLink {
    /// Lines to write, drained by the connection's writer task.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Set to `true` to make the connection close itself.
    pub close: watch::Sender<bool>,
}

struct ClientEntry {
    id: PlayerId,
    name: String,
    ready: bool,
    link: ClientLink,
}

impl ClientEntry {
    fn send(&self, message: &str) {
        tracing::trace!(id = %self.id, name = %self.name, line = message, "send");
        // closed queue means the connection is already going away
        let _ = self.link.outbound.send(message.to_string());
    }
}

struct Roster {
    clients: Vec<ClientEntry>,
    status: ServerStatus,
}

impl Roster {
    fn broadcast(&self, line: &str) {
        for client in &self.clients {
            client.send(line);
        }
    }

    fn listing(&self, ready_only: bool) -> Vec<(PlayerId, String)> {
        self.clients
            .iter()
            .filter(|c| !ready_only || c.ready)
            .map(|c| (c.id, c.name.clone()))
            .collect()
    }
}

/// A client removed from the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departed {
    /// Its id.
    pub id: PlayerId,
    /// Its display name.
    pub name: String,
    /// Server status at the moment of removal.
    pub status: ServerStatus,
}

/// Connected clients plus server status.
pub struct SessionRegistry {
    roster: RwLock<Roster>,
    limits: LobbyLimits,
}

impl SessionRegistry {
    /// An empty registry in [`ServerStatus::Ready`].
    pub fn new(limits: LobbyLimits) -> Self {
        Self {
            roster: RwLock::new(Roster {
                clients: Vec::new(),
                status: ServerStatus::Ready,
            }),
            limits,
        }
    }

    /// Admit a handshaken client.
    ///
    /// On success the new client is queued `ACK <id>`, everyone else is told
    /// `CONNECTED <id> <name>`, and the new client then gets `CLIST` (itself
    /// included) and `RLIST`.
    pub async fn register(&self, id: PlayerId, name: &str, link: ClientLink) -> Result<(), RegisterError> {
        let mut roster = self.roster.write().await;
        if roster.status != ServerStatus::Ready {
            return Err(RegisterError::NotAccepting);
        }
        if roster.clients.len() >= self.limits.max_players {
            return Err(RegisterError::ServerFull);
        }
        if roster.clients.iter().any(|c| c.name == name) {
            return Err(RegisterError::NameTaken);
        }

        let entry = ClientEntry {
            id,
            name: name.to_string(),
            ready: false,
            link,
        };
        entry.send(&ServerMessage::Ack(id).to_string());
        roster.broadcast(&ServerMessage::Connected(id, name.to_string()).to_string());
        roster.clients.push(entry);

        let clients = ServerMessage::ClientList(roster.listing(false)).to_string();
        let ready = ServerMessage::ReadyList(roster.listing(true)).to_string();
        if let Some(entry) = roster.clients.last() {
            entry.send(&clients);
            entry.send(&ready);
        }

        tracing::info!(id = %id, name, "client registered");
        Ok(())
    }

    /// Remove a client. Returns `None` if it was not registered.
    pub async fn unregister(&self, id: PlayerId) -> Option<Departed> {
        let mut roster = self.roster.write().await;
        let index = roster.clients.iter().position(|c| c.id == id)?;
        let entry = roster.clients.remove(index);
        Some(Departed {
            id,
            name: entry.name,
            status: roster.status,
        })
    }

    /// Send one message to every connected client.
    pub async fn broadcast(&self, message: &ServerMessage) {
        let line = message.to_string();
        self.roster.read().await.broadcast(&line);
    }

    /// Current status.
    pub async fn status(&self) -> ServerStatus {
        self.roster.read().await.status
    }

    /// Move to `status`.
    pub async fn set_status(&self, status: ServerStatus) {
        self.roster.write().await.status = status;
    }

    /// Display name of a connected client.
    pub async fn name_of(&self, id: PlayerId) -> Option<String> {
        let roster = self.roster.read().await;
        roster.clients.iter().find(|c| c.id == id).map(|c| c.name.clone())
    }

    /// Set a client's ready flag. Returns `false` if it is not connected.
    pub async fn mark_ready(&self, id: PlayerId) -> bool {
        let mut roster = self.roster.write().await;
        match roster.clients.iter_mut().find(|c| c.id == id) {
            Some(client) => {
                client.ready = true;
                true
            }
            None => false,
        }
    }

    /// If the lobby is idle, has at least `min_players` clients and all of
    /// them are ready, switch to [`ServerStatus::Starting`] and return the
    /// participants in join order.
    pub async fn begin_round(&self) -> Option<Vec<(PlayerId, String)>> {
        let mut roster = self.roster.write().await;
        let ready = roster.status == ServerStatus::Ready
            && roster.clients.len() >= self.limits.min_players
            && roster.clients.iter().all(|c| c.ready);
        if !ready {
            return None;
        }
        roster.status = ServerStatus::Starting;
        Some(roster.listing(false))
    }

    /// Round is over: back to [`ServerStatus::Ready`] with every ready flag
    /// cleared.
    pub async fn reset_round(&self) {
        let mut roster = self.roster.write().await;
        roster.status = ServerStatus::Ready;
        for client in &mut roster.clients {
            client.ready = false;
        }
    }

    /// Connected clients in join order.
    pub async fn clients(&self) -> Vec<(PlayerId, String)> {
        self.roster.read().await.listing(false)
    }

    /// Connected clients that are ready.
    pub async fn ready_clients(&self) -> Vec<(PlayerId, String)> {
        self.roster.read().await.listing(true)
    }

    /// Number of connected clients.
    pub async fn len(&self) -> usize {
        self.roster.read().await.clients.len()
    }

    /// Whether nobody is connected.
    pub async fn is_empty(&self) -> bool {
        self.roster.read().await.clients.is_empty()
    }

    /// Send `KICKED` to the named client and tell its connection to close.
    /// The client stays registered until its disconnect is processed.
    pub async fn kick(&self, name: &str) -> Option<PlayerId> {
        let roster = self.roster.read().await;
        let client = roster.clients.iter().find(|c| c.name == name)?;
        client.send(&ServerMessage::Kicked.to_string());
        let _ = client.link.close.send(true);
        Some(client.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestLink {
        outbound: mpsc::UnboundedReceiver<String>,
        close: watch::Receiver<bool>,
    }

    fn link() -> (ClientLink, TestLink) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (close, close_rx) = watch::channel(false);
        (
            ClientLink { outbound, close },
            TestLink {
                outbound: rx,
                close: close_rx,
            },
        )
    }

    fn drain(link: &mut TestLink) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = link.outbound.try_recv() {
            lines.push(line);
        }
        lines
    }

    async fn join(registry: &SessionRegistry, id: u64, name: &str) -> TestLink {
        let (l, t) = link();
        registry.register(PlayerId(id), name, l).await.unwrap();
        t
    }

    #[tokio::test]
    async fn test_join_sequence() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let mut ada = join(&registry, 1, "ada").await;
        assert_eq!(drain(&mut ada), vec!["ACK 1", "CLIST 1 ada", "RLIST"]);

        registry.mark_ready(PlayerId(1)).await;
        let mut bo = join(&registry, 2, "bo").await;
        assert_eq!(drain(&mut ada), vec!["CONNECTED 2 bo"]);
        assert_eq!(
            drain(&mut bo),
            vec!["ACK 2", "CLIST 1 ada 2 bo", "RLIST 1 ada"]
        );
    }

    #[tokio::test]
    async fn test_name_taken() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let _ada = join(&registry, 1, "ada").await;
        let (l, _t) = link();
        assert_eq!(
            registry.register(PlayerId(2), "ada", l).await,
            Err(RegisterError::NameTaken)
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_server_full() {
        let registry = SessionRegistry::new(LobbyLimits {
            max_players: 2,
            min_players: 2,
        });
        let _a = join(&registry, 1, "a").await;
        let _b = join(&registry, 2, "b").await;
        let (l, _t) = link();
        assert_eq!(
            registry.register(PlayerId(3), "c", l).await,
            Err(RegisterError::ServerFull)
        );
        assert_eq!(RegisterError::ServerFull.to_string(), "Server is full");
    }

    #[tokio::test]
    async fn test_not_accepting_during_round() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        registry.set_status(ServerStatus::InGame).await;
        let (l, mut t) = link();
        assert_eq!(
            registry.register(PlayerId(1), "a", l).await,
            Err(RegisterError::NotAccepting)
        );
        assert!(drain(&mut t).is_empty());
    }

    #[tokio::test]
    async fn test_begin_round_needs_everyone_ready() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let _a = join(&registry, 1, "a").await;
        registry.mark_ready(PlayerId(1)).await;
        assert!(registry.begin_round().await.is_none(), "one player is not enough");

        let _b = join(&registry, 2, "b").await;
        assert!(registry.begin_round().await.is_none());

        registry.mark_ready(PlayerId(2)).await;
        let players = registry.begin_round().await.unwrap();
        assert_eq!(players, vec![(PlayerId(1), "a".into()), (PlayerId(2), "b".into())]);
        assert_eq!(registry.status().await, ServerStatus::Starting);
        assert!(registry.begin_round().await.is_none(), "already starting");
    }

    #[tokio::test]
    async fn test_reset_round_clears_ready() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let _a = join(&registry, 1, "a").await;
        let _b = join(&registry, 2, "b").await;
        registry.mark_ready(PlayerId(1)).await;
        registry.mark_ready(PlayerId(2)).await;
        registry.begin_round().await.unwrap();

        registry.reset_round().await;
        assert_eq!(registry.status().await, ServerStatus::Ready);
        assert!(registry.ready_clients().await.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_survives_closed_receiver() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let a = join(&registry, 1, "a").await;
        let mut b = join(&registry, 2, "b").await;
        drop(a);
        drain(&mut b);

        registry.broadcast(&ServerMessage::Starting).await;
        assert_eq!(drain(&mut b), vec!["STARTING"]);
    }

    #[tokio::test]
    async fn test_unregister_reports_status() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let _a = join(&registry, 1, "a").await;
        registry.set_status(ServerStatus::InGame).await;

        let departed = registry.unregister(PlayerId(1)).await.unwrap();
        assert_eq!(departed.name, "a");
        assert_eq!(departed.status, ServerStatus::InGame);
        assert!(registry.unregister(PlayerId(1)).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_kick_signals_close() {
        let registry = SessionRegistry::new(LobbyLimits::default());
        let mut a = join(&registry, 1, "a").await;
        drain(&mut a);

        assert_eq!(registry.kick("a").await, Some(PlayerId(1)));
        assert_eq!(drain(&mut a), vec!["KICKED"]);
        assert!(*a.close.borrow());
        assert_eq!(registry.kick("nobody").await, None);
    }
}

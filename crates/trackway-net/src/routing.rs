//! The single consumer of the command channel.
//!
//! [`Dispatcher`] owns the optional live [`Game`] and handles one
//! [`Envelope`] at a time: parse, validate against server status, apply to
//! the game, broadcast the outcome. Rule violations end the round; malformed
//! or out-of-phase lines are logged and dropped.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use trackway_game::{Game, IllegalMove, PlayerId, RailOutcome};

use crate::channel::{CommandReceiver, Envelope, Event, Origin};
use crate::messages::{ClientCommand, ConsoleCommand, ServerMessage};
use crate::session::{ServerStatus, SessionRegistry};

const CANNOT_START: &str = "Cannot start the game!";

/// Consumer loop state.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    game: Option<Game>,
    rng: StdRng,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Dispatcher {
    /// A dispatcher with no round running. `city_seed` fixes the city
    /// dealing; `None` seeds from the OS.
    pub fn new(
        registry: Arc<SessionRegistry>,
        city_seed: Option<u64>,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> Self {
        let rng = match city_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            registry,
            game: None,
            rng,
            shutdown,
        }
    }

    /// The live round, if any.
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Drain `commands` until shutdown is signalled or every sender is gone.
    pub async fn run(mut self, mut commands: CommandReceiver) {
        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                envelope = commands.recv() => {
                    match envelope {
                        Some(envelope) => self.handle(envelope).await,
                        None => break,
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("dispatcher stopped");
    }

    /// Fully handle one envelope.
    pub async fn handle(&mut self, envelope: Envelope) {
        match (envelope.origin, envelope.event) {
            (Origin::Client(id), Event::Line(line)) => self.client_line(id, &line).await,
            (Origin::Client(id), Event::Closed) => self.client_closed(id).await,
            (Origin::Console, Event::Line(line)) => self.console_line(&line).await,
            (Origin::Console, Event::Closed) => {}
        }
    }

    // --- Client lines ---

    async fn client_line(&mut self, id: PlayerId, line: &str) {
        let Some(name) = self.registry.name_of(id).await else {
            tracing::debug!(id = %id, line, "line from unregistered client dropped");
            return;
        };

        let command = match line.parse::<ClientCommand>() {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(id = %id, name = %name, line, error = %err, "invalid data");
                return;
            }
        };

        match command {
            ClientCommand::Ping => {}
            ClientCommand::Msg(text) => {
                tracing::info!(name = %name, text = %text, "chat");
                self.registry
                    .broadcast(&ServerMessage::Msg { sender: name, text })
                    .await;
            }
            ClientCommand::Ready => {
                if self.registry.status().await == ServerStatus::InGame {
                    tracing::warn!(id = %id, name = %name, line, "READY during a round");
                    return;
                }
                self.registry.mark_ready(id).await;
                self.registry.broadcast(&ServerMessage::Ready(id)).await;
                self.try_start_round().await;
            }
            ClientCommand::SetStart { x, y } => {
                if !self.in_game(id, &name, line).await {
                    return;
                }
                let result = self.game_mut().and_then(|g| g.select_position(id, x, y));
                match result {
                    Ok(_) => {
                        self.registry
                            .broadcast(&ServerMessage::SetStart { player: id, x, y })
                            .await;
                    }
                    Err(err) => self.invalid_move(id, err).await,
                }
            }
            ClientCommand::PlaceRail { x, y, direction } => {
                if !self.in_game(id, &name, line).await {
                    return;
                }
                let result = self
                    .game_mut()
                    .and_then(|g| g.place_rail(id, x, y, direction));
                match result {
                    Ok(outcome) => {
                        self.registry
                            .broadcast(&ServerMessage::PlaceRail {
                                player: id,
                                x,
                                y,
                                direction,
                            })
                            .await;
                        if let RailOutcome::Finished(winners) = outcome {
                            self.finish_round(winners).await;
                        }
                    }
                    Err(err) => self.invalid_move(id, err).await,
                }
            }
        }
    }

    async fn in_game(&self, id: PlayerId, name: &str, line: &str) -> bool {
        let status = self.registry.status().await;
        if status != ServerStatus::InGame {
            tracing::warn!(id = %id, name, line, ?status, "move outside a round");
            return false;
        }
        true
    }

    fn game_mut(&mut self) -> Result<&mut Game, IllegalMove> {
        self.game
            .as_mut()
            .ok_or(IllegalMove::WrongPhase(trackway_game::Phase::Waiting))
    }

    async fn invalid_move(&mut self, id: PlayerId, err: IllegalMove) {
        tracing::warn!(id = %id, error = %err, "illegal move");
        self.abort_round(&format!("Invalid move by player {id}")).await;
    }

    async fn client_closed(&mut self, id: PlayerId) {
        let Some(departed) = self.registry.unregister(id).await else {
            return;
        };
        tracing::info!(id = %id, name = %departed.name, "client disconnected");

        if matches!(departed.status, ServerStatus::Starting | ServerStatus::InGame) {
            self.abort_round(&format!("Player disconnected: {}", departed.name))
                .await;
        }
        self.registry
            .broadcast(&ServerMessage::Disconnected(id, departed.name))
            .await;
        self.try_start_round().await;
    }

    // --- Round lifecycle ---

    async fn try_start_round(&mut self) {
        let Some(players) = self.registry.begin_round().await else {
            return;
        };
        tracing::info!(players = players.len(), "round starting");

        self.registry.broadcast(&ServerMessage::Starting).await;
        self.registry
            .broadcast(&ServerMessage::Players(players.clone()))
            .await;

        let mut game = Game::new();
        for (id, name) in &players {
            if let Err(err) = game.add_player(*id, name.clone()) {
                tracing::warn!(error = %err, "cannot seat player");
                self.abort_round(CANNOT_START).await;
                return;
            }
        }

        self.registry.broadcast(&ServerMessage::NewRound).await;

        if let Err(err) = game.assign_cities(&mut self.rng) {
            tracing::warn!(error = %err, "cannot deal cities");
            self.abort_round(CANNOT_START).await;
            return;
        }
        for line in game.city_lines() {
            self.registry.broadcast(&ServerMessage::Cities(line)).await;
        }

        self.registry.set_status(ServerStatus::InGame).await;
        match game.start() {
            Ok(first) => {
                tracing::info!(first = %first, "round started");
                self.game = Some(game);
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot start round");
                self.abort_round(CANNOT_START).await;
            }
        }
    }

    async fn abort_round(&mut self, reason: &str) {
        tracing::info!(reason, "round aborted");
        self.registry
            .broadcast(&ServerMessage::Quit(reason.to_string()))
            .await;
        self.game = None;
        self.registry.reset_round().await;
    }

    async fn finish_round(&mut self, winners: Vec<PlayerId>) {
        tracing::info!(?winners, "round finished");
        self.registry
            .broadcast(&ServerMessage::Finished(winners))
            .await;
        self.game = None;
        self.registry.reset_round().await;
    }

    // --- Console ---

    async fn console_line(&mut self, line: &str) {
        match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::List) => {
                let clients = self.registry.clients().await;
                tracing::info!(count = clients.len(), "connected clients");
                for (id, name) in clients {
                    tracing::info!("  {id}: {name}");
                }
            }
            Ok(ConsoleCommand::Kick(name)) => match self.registry.kick(&name).await {
                Some(id) => tracing::info!(id = %id, name = %name, "player kicked"),
                None => tracing::info!(name = %name, "no such player"),
            },
            Ok(ConsoleCommand::Exit) => {
                tracing::info!("exit requested");
                let _ = self.shutdown.send(true);
            }
            Err(err) => tracing::debug!(line, error = %err, "unknown console input"),
        }
    }
}

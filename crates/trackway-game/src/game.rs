//! Round state machine: `Waiting → PositionSelection → Placement → Finished`.
//!
//! A [`Game`] is created per round and owns its [`Board`]. Every operation
//! validates all preconditions before touching state, so an `Err` leaves the
//! game exactly as it was.

use rand::Rng;
use trackway_board::{Board, CityColor, CityId, Direction, EdgeId, PlayerId, cities_of, city_by_name};

use crate::error::IllegalMove;
use crate::player::Player;

/// Minimum number of players for a round.
pub const MIN_PLAYERS: usize = 2;

// ---------------------------------------------------------------------------
// Phase / outcomes
// ---------------------------------------------------------------------------

/// Phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Players and cities are being set up.
    Waiting,
    /// Each player in turn picks a base.
    PositionSelection,
    /// Players take turns laying rails.
    Placement,
    /// Someone connected all their cities. Terminal.
    Finished,
}

/// Result of an accepted base selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOutcome {
    /// The named player selects next.
    NextSelects(PlayerId),
    /// Every base is chosen; placement starts with the named player.
    PlacementBegins(PlayerId),
}

/// Result of an accepted rail placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RailOutcome {
    /// First single placement of the turn; the same player may place again.
    SecondPlacementAllowed,
    /// The turn is over and the named player is now active.
    TurnPassed(PlayerId),
    /// The round is won. Winners are listed in turn order.
    Finished(Vec<PlayerId>),
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One round of play.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    players: Vec<Player>,
    phase: Phase,
    active: usize,
    placed_single: bool,
    winners: Vec<PlayerId>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// A new round on a fresh board with no players.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            players: Vec::new(),
            phase: Phase::Waiting,
            active: 0,
            placed_single: false,
            winners: Vec::new(),
        }
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the round is over.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Players in join order before [`start`](Self::start), turn order after.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    pub fn player(&self, id: PlayerId) -> Result<&Player, IllegalMove> {
        self.players
            .iter()
            .find(|p| p.id() == id)
            .ok_or(IllegalMove::UnknownPlayer(id))
    }

    /// Cities dealt to a player.
    pub fn player_cities(&self, id: PlayerId) -> Result<&[CityId], IllegalMove> {
        self.player(id).map(Player::cities)
    }

    /// The player allowed to act, while a turn-based phase is running.
    pub fn active_player(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::PositionSelection | Phase::Placement => {
                self.players.get(self.active).map(Player::id)
            }
            Phase::Waiting | Phase::Finished => None,
        }
    }

    /// One `<id> <city;city;...;>` line per player, in player order.
    pub fn city_lines(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|p| {
                let names: String = p
                    .cities()
                    .iter()
                    .map(|c| format!("{};", c.city().name))
                    .collect();
                format!("{} {}", p.id(), names)
            })
            .collect()
    }

    /// Whether `id` is the active player.
    pub fn is_active(&self, id: PlayerId) -> bool {
        self.active_player() == Some(id)
    }

    /// Winners of the last successful victory check, in turn order.
    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    // --- Setup ---

    /// Add a player. Only allowed while waiting.
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> Result<(), IllegalMove> {
        self.expect_phase(Phase::Waiting)?;
        if self.players.iter().any(|p| p.id() == id) {
            return Err(IllegalMove::DuplicatePlayer(id));
        }
        self.players.push(Player::new(id, name));
        Ok(())
    }

    /// Deal one city of every colour to every player, drawing without
    /// replacement from each colour's pool.
    pub fn assign_cities<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), IllegalMove> {
        self.expect_phase(Phase::Waiting)?;

        let mut pools: Vec<(CityColor, Vec<CityId>)> = CityColor::ALL
            .into_iter()
            .map(|color| (color, cities_of(color)))
            .collect();
        let mut players = self.players.clone();

        for player in &mut players {
            for (color, pool) in &mut pools {
                if pool.is_empty() {
                    return Err(IllegalMove::CityPoolExhausted(*color));
                }
                let city = pool.remove(rng.random_range(0..pool.len()));
                player.assign_city(city)?;
            }
        }

        self.players = players;
        Ok(())
    }

    /// Assign named cities to one player. `cities` is a `;`-separated list;
    /// empty entries are ignored.
    pub fn assign_cities_by_name(&mut self, id: PlayerId, cities: &str) -> Result<(), IllegalMove> {
        self.expect_phase(Phase::Waiting)?;
        let index = self.index_of(id)?;

        let mut player = self.players[index].clone();
        for name in cities.split(';').filter(|s| !s.is_empty()) {
            let city = city_by_name(name).ok_or_else(|| IllegalMove::UnknownCity(name.to_string()))?;
            player.assign_city(city)?;
        }

        self.players[index] = player;
        Ok(())
    }

    /// Enough players, each holding a full hand.
    pub fn is_ready_to_start(&self) -> bool {
        self.players.len() >= MIN_PLAYERS && self.players.iter().all(Player::has_all_cities)
    }

    /// Fix turn order by ascending id and open base selection. Returns the
    /// first player to act.
    pub fn start(&mut self) -> Result<PlayerId, IllegalMove> {
        self.expect_phase(Phase::Waiting)?;
        if !self.is_ready_to_start() {
            return Err(IllegalMove::NotReadyToStart);
        }

        self.players.sort_by_key(Player::id);
        self.active = 0;
        self.placed_single = false;
        self.phase = Phase::PositionSelection;

        let first = self.players[0].id();
        tracing::debug!(first = %first, players = self.players.len(), "round started");
        Ok(first)
    }

    // --- Turns ---

    /// The active player picks `(x, y)` as their base.
    pub fn select_position(
        &mut self,
        id: PlayerId,
        x: i32,
        y: i32,
    ) -> Result<PositionOutcome, IllegalMove> {
        self.expect_phase(Phase::PositionSelection)?;
        self.expect_active(id)?;
        let vertex = self.board.vertex_id(x, y)?;

        self.players[self.active].assign_base(vertex);
        self.board.set_base(vertex, id);
        self.board.refresh_reachability(vertex);

        let next = self.advance();
        if self.active == 0 {
            self.phase = Phase::Placement;
            Ok(PositionOutcome::PlacementBegins(next))
        } else {
            Ok(PositionOutcome::NextSelects(next))
        }
    }

    /// Whether `id` could lay a rail on `edge` right now, ignoring whose
    /// turn it is.
    pub fn can_place_rail(&self, id: PlayerId, edge: EdgeId) -> bool {
        self.check_rail(id, edge).is_ok()
    }

    /// The active player lays a rail on the edge leaving `(x, y)` towards
    /// `direction`.
    pub fn place_rail(
        &mut self,
        id: PlayerId,
        x: i32,
        y: i32,
        direction: Direction,
    ) -> Result<RailOutcome, IllegalMove> {
        self.expect_phase(Phase::Placement)?;
        self.expect_active(id)?;
        let edge = self.board.get_edge(x, y, direction)?;
        self.place_rail_on(id, edge)
    }

    /// The active player lays a rail on `edge`.
    ///
    /// A turn is two single placements or one double placement. Victory is
    /// checked after every placement and ends the round immediately.
    pub fn place_rail_on(&mut self, id: PlayerId, edge: EdgeId) -> Result<RailOutcome, IllegalMove> {
        self.expect_phase(Phase::Placement)?;
        self.expect_active(id)?;
        self.check_rail(id, edge)?;

        self.board.place_rail(edge)?;
        let [a, b] = self.board.edge(edge).ends();
        self.board.refresh_reachability(a);
        self.board.refresh_reachability(b);

        if self.check_for_victory() {
            self.phase = Phase::Finished;
            tracing::debug!(winners = ?self.winners, "round won");
            return Ok(RailOutcome::Finished(self.winners.clone()));
        }

        if self.board.edge(edge).is_double() || self.placed_single {
            self.placed_single = false;
            Ok(RailOutcome::TurnPassed(self.advance()))
        } else {
            self.placed_single = true;
            Ok(RailOutcome::SecondPlacementAllowed)
        }
    }

    // --- Internals ---

    fn check_rail(&self, id: PlayerId, edge: EdgeId) -> Result<(), IllegalMove> {
        self.player(id)?;
        let e = self.board.edge(edge);
        if e.has_rail() {
            return Err(IllegalMove::EdgeAlreadyRailed);
        }
        if e.is_double() && self.placed_single {
            return Err(IllegalMove::DoubleAfterSingle);
        }
        let connected = e
            .ends()
            .iter()
            .any(|&v| self.board.vertex(v).is_reachable_by(id));
        if !connected {
            return Err(IllegalMove::NotConnected(id));
        }
        Ok(())
    }

    /// Recompute the winner set: every player whose five cities are all
    /// reachable from their base.
    fn check_for_victory(&mut self) -> bool {
        let board = &self.board;
        self.winners = self
            .players
            .iter()
            .filter(|p| {
                p.cities().iter().all(|c| {
                    let city = c.city();
                    board
                        .get_vertex(i32::from(city.x), i32::from(city.y))
                        .is_ok_and(|v| v.is_reachable_by(p.id()))
                })
            })
            .map(Player::id)
            .collect();
        !self.winners.is_empty()
    }

    fn advance(&mut self) -> PlayerId {
        self.active = (self.active + 1) % self.players.len();
        self.players[self.active].id()
    }

    fn expect_phase(&self, phase: Phase) -> Result<(), IllegalMove> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(IllegalMove::WrongPhase(self.phase))
        }
    }

    fn expect_active(&self, id: PlayerId) -> Result<(), IllegalMove> {
        self.player(id)?;
        let active = self.players[self.active].id();
        if active == id {
            Ok(())
        } else {
            Err(IllegalMove::NotActivePlayer { player: id, active })
        }
    }

    fn index_of(&self, id: PlayerId) -> Result<usize, IllegalMove> {
        self.players
            .iter()
            .position(|p| p.id() == id)
            .ok_or(IllegalMove::UnknownPlayer(id))
    }
}

//! Rules engine for one round: players, city hands, turn order, phase
//! transitions, rail-placement legality and victory detection.

pub mod error;
pub mod game;
pub mod player;

pub use error::IllegalMove;
pub use game::{Game, Phase, PositionOutcome, RailOutcome};
pub use player::Player;
pub use trackway_board::{Board, CityColor, CityId, Direction, PlayerId};

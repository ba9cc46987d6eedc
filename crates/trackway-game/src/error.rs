//! Rules violations.

use trackway_board::{BoardError, CityColor, Direction, PlayerId};

use crate::game::Phase;

/// A move or setup step that the rules do not allow.
///
/// Returned by every [`Game`](crate::Game) operation that can be refused. The
/// game state is left untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    /// The operation is not allowed in the current phase.
    #[error("not allowed during {0:?}")]
    WrongPhase(Phase),
    /// The player id is not part of this round.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// A player with this id was already added.
    #[error("player {0} already joined")]
    DuplicatePlayer(PlayerId),
    /// Someone other than the active player tried to act.
    #[error("player {player} acted out of turn (active: {active})")]
    NotActivePlayer {
        /// Who tried to act.
        player: PlayerId,
        /// Whose turn it is.
        active: PlayerId,
    },
    /// Start requested with too few players or incomplete city hands.
    #[error("game is not ready to start")]
    NotReadyToStart,
    /// The player already holds a city of this colour.
    #[error("player {player} already holds a {color:?} city")]
    DuplicateColor {
        /// The receiving player.
        player: PlayerId,
        /// The colour held twice.
        color: CityColor,
    },
    /// No city has this name.
    #[error("unknown city {0:?}")]
    UnknownCity(String),
    /// A colour pool ran dry while dealing.
    #[error("no {0:?} cities left to deal")]
    CityPoolExhausted(CityColor),
    /// The coordinates are not on the board.
    #[error("no vertex at ({x}, {y})")]
    NoSuchVertex {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// No edge leaves the vertex in that direction.
    #[error("no edge leaving ({x}, {y}) towards {direction}")]
    NoSuchEdge {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Requested direction.
        direction: Direction,
    },
    /// A direction code other than the six known ones.
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    /// The edge already has a rail.
    #[error("edge already has a rail")]
    EdgeAlreadyRailed,
    /// Neither endpoint of the edge is on the player's network.
    #[error("edge is not connected to player {0}'s network")]
    NotConnected(PlayerId),
    /// A double-capacity edge cannot follow a single placement in one turn.
    #[error("double edge cannot be the second placement of a turn")]
    DoubleAfterSingle,
}

impl From<BoardError> for IllegalMove {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::NoSuchVertex { x, y } => IllegalMove::NoSuchVertex { x, y },
            BoardError::NoSuchEdge { x, y, direction } => {
                IllegalMove::NoSuchEdge { x, y, direction }
            }
            BoardError::AlreadyRailed => IllegalMove::EdgeAlreadyRailed,
            BoardError::UnknownDirection(code) => IllegalMove::UnknownDirection(code),
        }
    }
}

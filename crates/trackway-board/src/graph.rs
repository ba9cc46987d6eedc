//! Vertex/edge graph of the map and reachability propagation.
//!
//! Vertices and edges live in flat arenas addressed by [`VertexId`] and
//! [`EdgeId`]. Each vertex keeps up to six edge references, one per
//! [`Direction`]; an edge stored as the north-west link of one vertex is the
//! south-east link of its neighbour, and so on.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashSet;

use crate::PlayerId;
use crate::city::{CityId, all_cities};
use crate::layout::{
    BOARD_HEIGHT, BOARD_WIDTH, DOUBLE_EAST, DOUBLE_NORTH_EAST, DOUBLE_NORTH_WEST, ROW_RUNS,
};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the six directions an edge can leave a vertex in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up and to the left.
    NorthWest,
    /// Up and to the right.
    NorthEast,
    /// Left.
    West,
    /// Right.
    East,
    /// Down and to the left.
    SouthWest,
    /// Down and to the right.
    SouthEast,
}

impl Direction {
    /// All six directions.
    pub const ALL: [Direction; 6] = [
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::West,
        Direction::East,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// The direction of the same edge seen from its other end.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::NorthWest => Direction::SouthEast,
            Direction::NorthEast => Direction::SouthWest,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }

    /// Wire code (`NW`, `NE`, `W`, `E`, `SW`, `SE`).
    pub fn code(self) -> &'static str {
        match self {
            Direction::NorthWest => "NW",
            Direction::NorthEast => "NE",
            Direction::West => "W",
            Direction::East => "E",
            Direction::SouthWest => "SW",
            Direction::SouthEast => "SE",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.code() == s)
            .ok_or_else(|| BoardError::UnknownDirection(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by board lookups and mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The coordinates are not a valid board position.
    #[error("no vertex at ({x}, {y})")]
    NoSuchVertex {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// No edge leaves the vertex in the requested direction.
    #[error("no edge leaving ({x}, {y}) towards {direction}")]
    NoSuchEdge {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Requested direction.
        direction: Direction,
    },
    /// The edge already carries a rail.
    #[error("edge already has a rail")]
    AlreadyRailed,
    /// A direction code other than the six known ones.
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
}

// ---------------------------------------------------------------------------
// Vertex / Edge
// ---------------------------------------------------------------------------

/// Arena index of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u16);

/// Arena index of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u16);

/// A rail intersection or city site.
#[derive(Debug, Clone)]
pub struct Vertex {
    x: u8,
    y: u8,
    edges: [Option<EdgeId>; 6],
    city: Option<CityId>,
    base_of: Option<PlayerId>,
    reachable_by: FxHashSet<PlayerId>,
}

impl Vertex {
    fn new(x: u8, y: u8) -> Self {
        Self {
            x,
            y,
            edges: [None; 6],
            city: None,
            base_of: None,
            reachable_by: FxHashSet::default(),
        }
    }

    /// Column.
    pub fn x(&self) -> i32 {
        i32::from(self.x)
    }

    /// Row.
    pub fn y(&self) -> i32 {
        i32::from(self.y)
    }

    /// The edge leaving this vertex in `direction`, if any.
    pub fn edge(&self, direction: Direction) -> Option<EdgeId> {
        self.edges[direction.index()]
    }

    /// City occupying this vertex.
    pub fn city(&self) -> Option<CityId> {
        self.city
    }

    /// Player whose base this vertex is.
    pub fn base_of(&self) -> Option<PlayerId> {
        self.base_of
    }

    /// Whether `player` has a rail path from their base to this vertex.
    pub fn is_reachable_by(&self, player: PlayerId) -> bool {
        self.reachable_by.contains(&player)
    }

    /// Players connected to this vertex, in no particular order.
    pub fn reachable_by(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.reachable_by.iter().copied()
    }
}

/// A potential rail placement between two adjacent vertices.
#[derive(Debug, Clone)]
pub struct Edge {
    from: VertexId,
    to: VertexId,
    double: bool,
    rail: bool,
}

impl Edge {
    /// The vertex the edge was created from.
    pub fn from(&self) -> VertexId {
        self.from
    }

    /// The neighbour the edge leads to.
    pub fn to(&self) -> VertexId {
        self.to
    }

    /// Both endpoints.
    pub fn ends(&self) -> [VertexId; 2] {
        [self.from, self.to]
    }

    /// Whether placing a rail here consumes a whole turn.
    pub fn is_double(&self) -> bool {
        self.double
    }

    /// Whether a rail has been placed.
    pub fn has_rail(&self) -> bool {
        self.rail
    }

    /// The endpoint that is not `v`.
    pub fn other_end(&self, v: VertexId) -> VertexId {
        if v == self.from { self.to } else { self.from }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The full map for one round.
#[derive(Debug, Clone)]
pub struct Board {
    grid: Vec<Option<VertexId>>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Build a fresh board: no rails, no bases, nothing reachable.
    pub fn new() -> Self {
        let mut board = Self {
            grid: vec![None; BOARD_WIDTH * BOARD_HEIGHT],
            vertices: Vec::new(),
            edges: Vec::new(),
        };

        for (y, runs) in ROW_RUNS.iter().enumerate() {
            for &(first, last) in *runs {
                for x in first..=last {
                    let id = VertexId(board.vertices.len() as u16);
                    board.vertices.push(Vertex::new(x, y as u8));
                    board.grid[y * BOARD_WIDTH + x as usize] = Some(id);
                }
            }
        }

        for index in 0..board.vertices.len() {
            let id = VertexId(index as u16);
            let x = board.vertices[index].x as usize;
            let y = board.vertices[index].y as usize;
            if y > 0
                && let Some(n) = board.lookup(x, y - 1)
            {
                board.link(id, Direction::NorthWest, n);
            }
            if let Some(n) = board.lookup(x + 1, y) {
                board.link(id, Direction::East, n);
            }
            if y > 0
                && let Some(n) = board.lookup(x + 1, y - 1)
            {
                board.link(id, Direction::NorthEast, n);
            }
        }

        for (list, direction) in [
            (DOUBLE_NORTH_WEST, Direction::NorthWest),
            (DOUBLE_NORTH_EAST, Direction::NorthEast),
            (DOUBLE_EAST, Direction::East),
        ] {
            for &(x, y) in list {
                if let Some(e) = board
                    .lookup(x as usize, y as usize)
                    .and_then(|v| board.vertex(v).edge(direction))
                {
                    board.edges[e.0 as usize].double = true;
                }
            }
        }

        for (id, city) in all_cities() {
            if let Some(v) = board.lookup(city.x as usize, city.y as usize) {
                board.vertices[v.0 as usize].city = Some(id);
            }
        }

        board
    }

    fn lookup(&self, x: usize, y: usize) -> Option<VertexId> {
        if x >= BOARD_WIDTH || y >= BOARD_HEIGHT {
            return None;
        }
        self.grid[y * BOARD_WIDTH + x]
    }

    fn link(&mut self, from: VertexId, direction: Direction, to: VertexId) {
        let edge = EdgeId(self.edges.len() as u16);
        self.edges.push(Edge {
            from,
            to,
            double: false,
            rail: false,
        });
        self.vertices[from.0 as usize].edges[direction.index()] = Some(edge);
        self.vertices[to.0 as usize].edges[direction.opposite().index()] = Some(edge);
    }

    /// Resolve grid coordinates to a vertex id.
    pub fn vertex_id(&self, x: i32, y: i32) -> Result<VertexId, BoardError> {
        usize::try_from(x)
            .ok()
            .zip(usize::try_from(y).ok())
            .and_then(|(ux, uy)| self.lookup(ux, uy))
            .ok_or(BoardError::NoSuchVertex { x, y })
    }

    /// The vertex at grid coordinates.
    pub fn get_vertex(&self, x: i32, y: i32) -> Result<&Vertex, BoardError> {
        self.vertex_id(x, y).map(|id| self.vertex(id))
    }

    /// The edge leaving `(x, y)` towards `direction`.
    pub fn get_edge(&self, x: i32, y: i32, direction: Direction) -> Result<EdgeId, BoardError> {
        self.get_vertex(x, y)?
            .edge(direction)
            .ok_or(BoardError::NoSuchEdge { x, y, direction })
    }

    /// Vertex by id.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0 as usize]
    }

    /// Edge by id.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    /// Every vertex in row-major order.
    pub fn all_vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// Every edge in creation order.
    pub fn all_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId(i as u16), e))
    }

    /// Direction in which `edge` leaves `vertex`, if it is attached there.
    pub fn edge_direction(&self, vertex: VertexId, edge: EdgeId) -> Option<Direction> {
        let v = self.vertex(vertex);
        Direction::ALL.into_iter().find(|&d| v.edge(d) == Some(edge))
    }

    /// Lay a rail. Rails are permanent; a second placement is an error.
    pub fn place_rail(&mut self, edge: EdgeId) -> Result<(), BoardError> {
        let e = &mut self.edges[edge.0 as usize];
        if e.rail {
            return Err(BoardError::AlreadyRailed);
        }
        e.rail = true;
        Ok(())
    }

    /// Record `player`'s base on a vertex and seed its reachability there.
    pub fn set_base(&mut self, vertex: VertexId, player: PlayerId) {
        let v = &mut self.vertices[vertex.0 as usize];
        v.base_of = Some(player);
        v.reachable_by.insert(player);
    }

    /// Breadth-first propagation of reachable-by sets across railed edges,
    /// starting at `start`.
    ///
    /// Every player already reachable at a dequeued vertex is pushed across
    /// each railed edge; neighbours that gain a player are enqueued. Sets only
    /// grow, so the walk terminates.
    pub fn refresh_reachability(&mut self, start: VertexId) {
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let vertex = &self.vertices[current.0 as usize];
            let players: Vec<PlayerId> = vertex.reachable_by.iter().copied().collect();
            let edges = vertex.edges;
            for edge in edges.into_iter().flatten() {
                let edge = &self.edges[edge.0 as usize];
                if !edge.rail {
                    continue;
                }
                let other = edge.other_end(current);
                let set = &mut self.vertices[other.0 as usize].reachable_by;
                let mut grew = false;
                for &p in &players {
                    grew |= set.insert(p);
                }
                if grew {
                    queue.push_back(other);
                }
            }
        }
    }
}

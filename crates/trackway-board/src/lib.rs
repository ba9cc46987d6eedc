//! Static rail-network board: vertex layout, edge capacities, the fixed city
//! table, and per-player reachability propagation.

pub mod city;
pub mod graph;
pub mod layout;

pub use city::{CITIES, City, CityColor, CityId, all_cities, cities_of, city_by_name};
pub use graph::{Board, BoardError, Direction, Edge, EdgeId, Vertex, VertexId};

/// Identifier of a player on the board. Matches the connection id assigned
/// by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

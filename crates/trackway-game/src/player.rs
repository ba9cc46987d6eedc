//! A participant in one round.

use trackway_board::{CityColor, CityId, PlayerId, VertexId};

use crate::error::IllegalMove;

/// One player: id, display name, dealt cities and chosen base.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: String,
    cities: Vec<CityId>,
    base: Option<VertexId>,
}

impl Player {
    /// Create a player with an empty hand and no base.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cities: Vec::with_capacity(CityColor::ALL.len()),
            base: None,
        }
    }

    /// Player id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cities dealt so far, in dealing order.
    pub fn cities(&self) -> &[CityId] {
        &self.cities
    }

    /// Chosen starting vertex.
    pub fn base(&self) -> Option<VertexId> {
        self.base
    }

    /// Add a city to the hand. A hand holds at most one city per colour.
    pub fn assign_city(&mut self, city: CityId) -> Result<(), IllegalMove> {
        let color = city.city().color;
        if self.cities.iter().any(|c| c.city().color == color) {
            return Err(IllegalMove::DuplicateColor {
                player: self.id,
                color,
            });
        }
        self.cities.push(city);
        Ok(())
    }

    /// Whether the hand holds one city of every colour.
    pub fn has_all_cities(&self) -> bool {
        self.cities.len() == CityColor::ALL.len()
    }

    pub(crate) fn assign_base(&mut self, vertex: VertexId) {
        self.base = Some(vertex);
    }
}

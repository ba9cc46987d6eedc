//! The fixed set of 35 cities, seven per colour.

/// One of the five city colours. Each player is dealt exactly one city of
/// every colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CityColor {
    /// West coast.
    Green,
    /// Mid-west and plains.
    Yellow,
    /// Great lakes.
    Blue,
    /// South.
    Red,
    /// East coast.
    Orange,
}

impl CityColor {
    /// All colours in dealing order.
    pub const ALL: [CityColor; 5] = [
        CityColor::Green,
        CityColor::Blue,
        CityColor::Yellow,
        CityColor::Red,
        CityColor::Orange,
    ];
}

/// Index of a city in [`CITIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityId(pub u8);

impl CityId {
    /// The static definition of this city.
    pub fn city(self) -> &'static City {
        &CITIES[self.0 as usize]
    }
}

/// A named city sitting on a board vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    /// Display name. May contain spaces but never `;`.
    pub name: &'static str,
    /// Column of the vertex the city occupies.
    pub x: u8,
    /// Row of the vertex the city occupies.
    pub y: u8,
    /// Colour group.
    pub color: CityColor,
}

const fn city(name: &'static str, x: u8, y: u8, color: CityColor) -> City {
    City { name, x, y, color }
}

/// Every city on the map.
pub static CITIES: [City; 35] = [
    city("Seattle", 4, 0, CityColor::Green),
    city("Portland", 3, 1, CityColor::Green),
    city("Medford", 2, 3, CityColor::Green),
    city("Sacramento", 1, 5, CityColor::Green),
    city("San Francisco", 0, 6, CityColor::Green),
    city("Los Angeles", 0, 9, CityColor::Green),
    city("San Diego", 0, 10, CityColor::Green),
    city("Salt Lake City", 4, 4, CityColor::Yellow),
    city("Denver", 6, 5, CityColor::Yellow),
    city("Omaha", 9, 4, CityColor::Yellow),
    city("Kansas City", 9, 6, CityColor::Yellow),
    city("St. Louis", 11, 6, CityColor::Yellow),
    city("Oklahoma City", 7, 8, CityColor::Yellow),
    city("Santa Fe", 4, 8, CityColor::Yellow),
    city("Helena", 6, 1, CityColor::Blue),
    city("Bismarck", 10, 1, CityColor::Blue),
    city("Duluth", 13, 1, CityColor::Blue),
    city("Minneapolis", 12, 2, CityColor::Blue),
    city("Chicago", 14, 3, CityColor::Blue),
    city("Buffalo", 17, 2, CityColor::Blue),
    city("Cincinnati", 14, 5, CityColor::Blue),
    city("Boston", 19, 2, CityColor::Orange),
    city("New York", 17, 4, CityColor::Orange),
    city("Washington", 16, 5, CityColor::Orange),
    city("Richmond", 15, 7, CityColor::Orange),
    city("Winston", 13, 8, CityColor::Orange),
    city("Charleston", 13, 10, CityColor::Orange),
    city("Jacksonville", 11, 12, CityColor::Orange),
    city("Phoenix", 2, 9, CityColor::Red),
    city("El Paso", 3, 11, CityColor::Red),
    city("Dallas", 7, 10, CityColor::Red),
    city("Houston", 6, 12, CityColor::Red),
    city("Memphis", 10, 9, CityColor::Red),
    city("Atlanta", 11, 10, CityColor::Red),
    city("New Orleans", 8, 12, CityColor::Red),
];

/// Iterate over every city id paired with its definition.
pub fn all_cities() -> impl Iterator<Item = (CityId, &'static City)> {
    CITIES
        .iter()
        .enumerate()
        .map(|(i, c)| (CityId(i as u8), c))
}

/// Look up a city by exact name.
pub fn city_by_name(name: &str) -> Option<CityId> {
    all_cities().find(|(_, c)| c.name == name).map(|(id, _)| id)
}

/// All cities of one colour, in table order.
pub fn cities_of(color: CityColor) -> Vec<CityId> {
    all_cities()
        .filter(|(_, c)| c.color == color)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::is_on_board;

    #[test]
    fn test_seven_cities_per_color() {
        for color in CityColor::ALL {
            assert_eq!(cities_of(color).len(), 7, "{color:?}");
        }
    }

    #[test]
    fn test_cities_sit_on_board() {
        for (_, c) in all_cities() {
            assert!(is_on_board(c.x as usize, c.y as usize), "{} off board", c.name);
        }
    }

    #[test]
    fn test_city_positions_unique() {
        let mut seen = std::collections::HashSet::new();
        for (_, c) in all_cities() {
            assert!(seen.insert((c.x, c.y)), "{} shares a vertex", c.name);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let id = city_by_name("San Francisco").unwrap();
        assert_eq!(id.city().x, 0);
        assert_eq!(id.city().y, 6);
        assert!(city_by_name("Gotham").is_none());
    }

    #[test]
    fn test_names_have_no_separator() {
        assert!(CITIES.iter().all(|c| !c.name.contains(';')));
    }
}

//! Board content: which grid positions hold a vertex and which edges are
//! double-capacity.
//!
//! Coordinates are `(x, y)` with `x` the column and `y` the row. Row 0 is the
//! northern edge of the map. A vertex at `(x, y)` links north-west to
//! `(x, y - 1)`, north-east to `(x + 1, y - 1)` and east to `(x + 1, y)`.

/// Number of columns in the backing grid.
pub const BOARD_WIDTH: usize = 20;

/// Number of rows in the backing grid.
pub const BOARD_HEIGHT: usize = 13;

/// Inclusive `(first_x, last_x)` runs of valid vertices, one slice per row.
pub const ROW_RUNS: [&[(u8, u8)]; BOARD_HEIGHT] = [
    &[(4, 13)],
    &[(3, 14), (18, 19)],
    &[(2, 14), (17, 19)],
    &[(2, 18)],
    &[(1, 17)],
    &[(1, 16)],
    &[(0, 15)],
    &[(0, 15)],
    &[(0, 15)],
    &[(0, 14)],
    &[(0, 13)],
    &[(1, 12)],
    &[(3, 11)],
];

/// Vertices whose north-western edge is double-capacity.
pub const DOUBLE_NORTH_WEST: &[(u8, u8)] = &[
    (4, 1),
    (8, 1),
    (9, 1),
    (3, 2),
    (2, 4),
    (12, 4),
    (17, 4),
    (16, 5),
    (1, 6),
    (2, 6),
    (4, 6),
    (10, 6),
    (11, 6),
    (13, 6),
    (14, 6),
    (15, 6),
    (3, 7),
    (5, 7),
    (12, 7),
    (14, 7),
    (2, 8),
    (11, 8),
    (13, 8),
    (10, 9),
    (12, 9),
    (1, 10),
    (3, 10),
    (9, 10),
    (8, 12),
];

/// Vertices whose north-eastern edge is double-capacity.
pub const DOUBLE_NORTH_EAST: &[(u8, u8)] = &[
    (5, 1),
    (7, 1),
    (8, 1),
    (9, 1),
    (5, 2),
    (6, 2),
    (9, 2),
    (12, 2),
    (2, 3),
    (6, 3),
    (9, 3),
    (12, 3),
    (5, 4),
    (9, 4),
    (1, 5),
    (2, 5),
    (4, 5),
    (9, 5),
    (11, 5),
    (4, 6),
    (5, 6),
    (9, 6),
    (10, 6),
    (11, 6),
    (13, 6),
    (0, 7),
    (11, 7),
    (1, 9),
    (2, 9),
    (2, 10),
    (8, 11),
];

/// Vertices whose eastern edge is double-capacity.
pub const DOUBLE_EAST: &[(u8, u8)] = &[
    (4, 0),
    (3, 1),
    (5, 1),
    (6, 1),
    (9, 1),
    (12, 1),
    (2, 2),
    (5, 2),
    (6, 2),
    (9, 2),
    (12, 2),
    (2, 3),
    (6, 3),
    (9, 3),
    (12, 3),
    (1, 4),
    (9, 4),
    (11, 4),
    (16, 4),
    (1, 5),
    (2, 5),
    (5, 5),
    (9, 5),
    (11, 5),
    (15, 5),
    (1, 6),
    (3, 6),
    (5, 6),
    (11, 6),
    (12, 6),
    (14, 6),
    (0, 7),
    (2, 7),
    (4, 7),
    (11, 7),
    (13, 7),
    (0, 8),
    (1, 8),
    (2, 8),
    (10, 8),
    (12, 8),
    (0, 9),
    (1, 9),
    (2, 9),
    (9, 9),
    (11, 9),
    (0, 10),
    (8, 10),
    (8, 11),
];

/// Returns `true` if `(x, y)` lies inside one of the row runs.
pub fn is_on_board(x: usize, y: usize) -> bool {
    ROW_RUNS
        .get(y)
        .is_some_and(|runs| {
            runs.iter()
                .any(|&(first, last)| (first as usize..=last as usize).contains(&x))
        })
}

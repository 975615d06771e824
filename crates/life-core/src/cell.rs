//! Cell coordinates on the unbounded grid.
//!
//! Coordinates are 64-bit signed integers. Neighbour arithmetic wraps at
//! the `i64` limits, which no reachable pattern ever approaches.

use serde::{Deserialize, Serialize};

/// Offsets of the eight Moore neighbours, row by row.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A coordinate on the grid. Equality and hashing are by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Column, growing to the right.
    pub x: i64,
    /// Row, growing downwards.
    pub y: i64,
}

impl Cell {
    /// Create a cell at `(x, y)`.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Iterate the eight cells of this cell's Moore neighbourhood.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy)))
    }
}

impl From<(i64, i64)> for Cell {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn neighbors_are_the_eight_surrounding_cells() {
        let n: HashSet<Cell> = Cell::new(0, 0).neighbors().collect();
        assert_eq!(n.len(), 8);
        assert!(!n.contains(&Cell::new(0, 0)));
        for x in -1..=1 {
            for y in -1..=1 {
                if (x, y) != (0, 0) {
                    assert!(n.contains(&Cell::new(x, y)), "missing ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn serializes_as_object() {
        let json = serde_json::to_value(Cell::new(-3, 7)).unwrap();
        assert_eq!(json, serde_json::json!({ "x": -3, "y": 7 }));
    }
}

//! The live cell set for one generation.
//!
//! A [`Universe`] is built once (by a seed pattern or by the engine's
//! collector) and then shared read-only behind an [`Arc`](std::sync::Arc).
//! Its bounding box is maintained while cells are inserted during
//! construction, so it is always the tight box of the live set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Inclusive bounding box of a non-empty set of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest live x.
    pub min_x: i64,
    /// Smallest live y.
    pub min_y: i64,
    /// Largest live x.
    pub max_x: i64,
    /// Largest live y.
    pub max_y: i64,
}

impl Bounds {
    /// The one-cell box around `cell`.
    pub const fn around(cell: Cell) -> Self {
        Self {
            min_x: cell.x,
            min_y: cell.y,
            max_x: cell.x,
            max_y: cell.y,
        }
    }

    /// Grow the box so that it contains `cell`.
    pub fn include(&mut self, cell: Cell) {
        self.min_x = self.min_x.min(cell.x);
        self.min_y = self.min_y.min(cell.y);
        self.max_x = self.max_x.max(cell.x);
        self.max_y = self.max_y.max(cell.y);
    }

    /// Whether `cell` lies inside the box.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.y >= self.min_y && cell.y <= self.max_y
    }
}

/// A full snapshot of all live cells at one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    cells: HashSet<Cell>,
    bounds: Option<Bounds>,
    generation: u64,
}

impl Universe {
    /// An empty universe at generation 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a generation-0 universe from live cells. Duplicates collapse.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        Self::from_cells_at(0, cells)
    }

    /// Build a universe at an explicit generation number.
    pub fn from_cells_at<I>(generation: u64, cells: I) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut universe = Self::with_generation(generation);
        for cell in cells {
            universe.insert(cell);
        }
        universe
    }

    /// Empty universe that the engine's collector fills in.
    pub(crate) fn with_generation(generation: u64) -> Self {
        Self {
            cells: HashSet::new(),
            bounds: None,
            generation,
        }
    }

    /// Add a live cell during construction, keeping the bounds tight.
    pub(crate) fn insert(&mut self, cell: Cell) {
        if self.cells.insert(cell) {
            match self.bounds.as_mut() {
                Some(bounds) => bounds.include(cell),
                None => self.bounds = Some(Bounds::around(cell)),
            }
        }
    }

    /// Whether `cell` is alive.
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Count of live cells in the Moore neighbourhood of `cell`.
    pub fn live_neighbors(&self, cell: Cell) -> usize {
        cell.neighbors().filter(|n| self.cells.contains(n)).count()
    }

    /// Iterate the live cells in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// The live cells sorted by row, then column.
    pub fn sorted_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.cells.iter().copied().collect();
        cells.sort_unstable_by_key(|c| (c.y, c.x));
        cells
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is alive.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The tight bounding box, or `None` for an empty universe.
    pub const fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Generation number of this snapshot.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Project this universe into the structured value the view layer renders.
    pub fn frame(&self) -> Frame {
        Frame {
            generation: self.generation,
            bounds: self.bounds,
            cells: self.sorted_cells(),
        }
    }
}

/// The current frame of a session: live coordinates plus bounding box.
///
/// Serialization is left to the transport; the HTTP server sends it as
/// JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Generation the frame was taken from.
    pub generation: u64,
    /// Tight bounding box of `cells`, absent when nothing is alive.
    pub bounds: Option<Bounds>,
    /// Live cells, sorted by row then column.
    pub cells: Vec<Cell>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_universe_has_no_bounds() {
        let u = Universe::empty();
        assert!(u.is_empty());
        assert_eq!(u.bounds(), None);
        assert_eq!(u.generation(), 0);
    }

    #[test]
    fn bounds_are_tight() {
        let u = Universe::from_cells([Cell::new(3, -2), Cell::new(-4, 5), Cell::new(0, 0)]);
        assert_eq!(
            u.bounds(),
            Some(Bounds {
                min_x: -4,
                min_y: -2,
                max_x: 3,
                max_y: 5,
            })
        );
        let b = u.bounds().unwrap();
        assert!(u.cells().all(|c| b.contains(*c)));
    }

    #[test]
    fn duplicate_cells_collapse() {
        let u = Universe::from_cells([Cell::new(1, 1), Cell::new(1, 1)]);
        assert_eq!(u.len(), 1);
    }

    #[test]
    fn live_neighbors_counts_moore_neighbourhood() {
        let u = Universe::from_cells([Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)]);
        assert_eq!(u.live_neighbors(Cell::new(1, 0)), 2);
        assert_eq!(u.live_neighbors(Cell::new(1, 1)), 3);
        assert_eq!(u.live_neighbors(Cell::new(5, 5)), 0);
    }

    #[test]
    fn frame_is_sorted_and_carries_generation() {
        let u = Universe::from_cells_at(7, [Cell::new(2, 1), Cell::new(0, 1), Cell::new(5, 0)]);
        let frame = u.frame();
        assert_eq!(frame.generation, 7);
        assert_eq!(
            frame.cells,
            vec![Cell::new(5, 0), Cell::new(0, 1), Cell::new(2, 1)]
        );
        assert_eq!(frame.bounds, u.bounds());
    }
}

//! Seed patterns for new sessions.
//!
//! Every fixed pattern is given in `(x, y)` cell coordinates with its top
//! left corner near the origin. [`Pattern::Random`] fills a rectangle with
//! a seeded soup so that runs are reproducible.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use serde::Deserialize;

use crate::cell::Cell;
use crate::universe::Universe;

const R_PENTOMINO: &[(i64, i64)] = &[(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)];

const GLIDER: &[(i64, i64)] = &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

const BLINKER: &[(i64, i64)] = &[(-1, 0), (0, 0), (1, 0)];

const TOAD: &[(i64, i64)] = &[(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)];

#[rustfmt::skip]
const BEACON: &[(i64, i64)] = &[
    (0, 0), (1, 0), (0, 1), (1, 1),
    (2, 2), (3, 2), (2, 3), (3, 3),
];

const ACORN: &[(i64, i64)] = &[(1, 0), (3, 1), (0, 2), (1, 2), (4, 2), (5, 2), (6, 2)];

#[rustfmt::skip]
const GOSPER_GLIDER_GUN: &[(i64, i64)] = &[
    (24, 0),
    (22, 1), (24, 1),
    (12, 2), (13, 2), (20, 2), (21, 2), (34, 2), (35, 2),
    (11, 3), (15, 3), (20, 3), (21, 3), (34, 3), (35, 3),
    (0, 4), (1, 4), (10, 4), (16, 4), (20, 4), (21, 4),
    (0, 5), (1, 5), (10, 5), (14, 5), (16, 5), (17, 5), (22, 5), (24, 5),
    (10, 6), (16, 6), (24, 6),
    (11, 7), (15, 7),
    (12, 8), (13, 8),
];

/// A named starting configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Five-cell methuselah that stabilises after 1103 generations.
    #[default]
    RPentomino,
    /// The smallest spaceship; moves one cell diagonally every 4 generations.
    Glider,
    /// Period-2 oscillator.
    Blinker,
    /// Period-2 oscillator.
    Toad,
    /// Period-2 oscillator.
    Beacon,
    /// Seven-cell methuselah.
    Acorn,
    /// Emits a glider every 30 generations.
    GosperGliderGun,
    /// Seeded random soup, see [`RandomSoup`].
    Random,
}

impl Pattern {
    /// Every pattern, in menu order.
    pub const ALL: [Self; 8] = [
        Self::RPentomino,
        Self::Glider,
        Self::Blinker,
        Self::Toad,
        Self::Beacon,
        Self::Acorn,
        Self::GosperGliderGun,
        Self::Random,
    ];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RPentomino => "R-pentomino",
            Self::Glider => "Glider",
            Self::Blinker => "Blinker",
            Self::Toad => "Toad",
            Self::Beacon => "Beacon",
            Self::Acorn => "Acorn",
            Self::GosperGliderGun => "Gosper Glider Gun",
            Self::Random => "Random",
        }
    }

    /// Generation-0 universe for this pattern. Random uses the default soup.
    pub fn seed(self) -> Universe {
        self.seed_with(&RandomSoup::default())
    }

    /// Generation-0 universe, drawing random soups from `soup`.
    pub fn seed_with(self, soup: &RandomSoup) -> Universe {
        let fixed = match self {
            Self::RPentomino => R_PENTOMINO,
            Self::Glider => GLIDER,
            Self::Blinker => BLINKER,
            Self::Toad => TOAD,
            Self::Beacon => BEACON,
            Self::Acorn => ACORN,
            Self::GosperGliderGun => GOSPER_GLIDER_GUN,
            Self::Random => return soup.generate(),
        };
        Universe::from_cells(fixed.iter().copied().map(Cell::from))
    }
}

/// Parameters of a random soup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RandomSoup {
    /// RNG seed; equal seeds give equal soups.
    #[serde(default = "default_soup_seed")]
    pub seed: u64,
    /// Columns filled, starting at x = 0.
    #[serde(default = "default_soup_side")]
    pub width: u32,
    /// Rows filled, starting at y = 0.
    #[serde(default = "default_soup_side")]
    pub height: u32,
    /// Probability that a cell starts alive, clamped to `0.0..=1.0`.
    #[serde(default = "default_soup_density")]
    pub density: f64,
}

impl Default for RandomSoup {
    fn default() -> Self {
        Self {
            seed: default_soup_seed(),
            width: default_soup_side(),
            height: default_soup_side(),
            density: default_soup_density(),
        }
    }
}

const fn default_soup_seed() -> u64 {
    42
}

const fn default_soup_side() -> u32 {
    64
}

const fn default_soup_density() -> f64 {
    0.33
}

impl RandomSoup {
    /// Fill the configured rectangle.
    pub fn generate(&self) -> Universe {
        let density = if self.density.is_nan() {
            0.0
        } else {
            self.density.clamp(0.0, 1.0)
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut cells = Vec::new();
        for y in 0..i64::from(self.height) {
            for x in 0..i64::from(self.width) {
                if rng.random_bool(density) {
                    cells.push(Cell::new(x, y));
                }
            }
        }
        Universe::from_cells(cells)
    }
}

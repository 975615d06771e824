//! Sparse universe model and parallel generation engine for Sparse Life.
//!
//! This crate owns the simulation core: an unbounded set of live cells
//! and the function that turns one generation into the next under the
//! standard B3/S23 rules.
//!
//! # Modules
//!
//! - [`cell`] -- Signed cell coordinates and the Moore neighbourhood.
//! - [`universe`] -- Immutable-per-generation live cell set with its
//!   derived bounding box, plus the [`Frame`] projection handed to viewers.
//! - [`pattern`] -- Named seed patterns and seeded random soups.
//! - [`engine`] -- The fan-out/fan-in [`GenerationEngine`], the
//!   sequential [`reference_next_generation`] it must agree with, and the
//!   `GenerationStep` trait producers are written against.
//! - [`error`] -- [`EngineError`].
//!
//! [`Frame`]: universe::Frame
//! [`GenerationEngine`]: engine::GenerationEngine
//! [`reference_next_generation`]: engine::reference_next_generation
//! [`EngineError`]: error::EngineError

pub mod cell;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod universe;

// Re-export primary types for convenience.
pub use cell::Cell;
pub use engine::{reference_next_generation, EngineConfig, GenerationEngine, GenerationStep};
pub use error::EngineError;
pub use pattern::{Pattern, RandomSoup};
pub use universe::{Bounds, Frame, Universe};

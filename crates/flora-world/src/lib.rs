//! World simulation engine.
//!
//! This module implements the unbounded 2D terrain grid where cells absorb,
//! exchange, and split resources one discrete tick at a time.

pub mod cell;
pub mod grid;
pub mod simulation;

pub use cell::LifeCell;
pub use grid::{Tile, TileGrid};
pub use simulation::{PopulationStats, Simulation};

//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position one step away in the given direction
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Cardinal direction on the grid. North points toward negative `y` (the sky).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Canonical ordering, also the default flow and grow order for new cells
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }
}

/// One of the four resource kinds a cell can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Mineral,
    Sugar,
    Water,
    Carbon,
}

impl Resource {
    pub fn all() -> [Resource; 4] {
        [
            Resource::Mineral,
            Resource::Sugar,
            Resource::Water,
            Resource::Carbon,
        ]
    }
}

/// Terrain kind of a tile, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainKind {
    Dirt,
    Sky,
}

impl TerrainKind {
    /// Terrain assignment rule: everything at `y >= 0` is underground dirt,
    /// negative `y` is open sky.
    pub fn for_y(y: i32) -> Self {
        if y >= 0 {
            TerrainKind::Dirt
        } else {
            TerrainKind::Sky
        }
    }
}

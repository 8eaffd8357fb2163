//! Sparse tile grid for the world.

use crate::cell::LifeCell;
use flora_core::{Position, TerrainKind};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// One slot of the coordinate grid: fixed terrain plus an optional occupant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    position: Position,
    terrain: TerrainKind,
    pub cell: Option<LifeCell>,
}

impl Tile {
    /// Terrain is resolved from the position and never changes afterwards
    pub fn new(position: Position) -> Self {
        Self {
            position,
            terrain: TerrainKind::for_y(position.y),
            cell: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn terrain(&self) -> TerrainKind {
        self.terrain
    }

    pub fn has_living_cell(&self, death_age: u64) -> bool {
        self.cell.as_ref().is_some_and(|cell| !cell.is_dead(death_age))
    }
}

/// An unbounded, lazily-populated grid.
///
/// Tiles are materialized on first access and never evicted, so `get` is
/// idempotent. Creation order is tracked explicitly because the backing map
/// does not preserve it and the simulation passes depend on a deterministic
/// iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileGrid {
    tiles: HashMap<Position, Tile>,
    creation_order: Vec<Position>,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total lookup: returns the persisted tile, creating it on first access
    pub fn get(&mut self, position: Position) -> &Tile {
        self.get_mut(position)
    }

    pub fn get_mut(&mut self, position: Position) -> &mut Tile {
        match self.tiles.entry(position) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.creation_order.push(position);
                entry.insert(Tile::new(position))
            }
        }
    }

    /// Read-only lookup that does not materialize missing tiles
    pub fn peek(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Positions of tiles holding a living cell, in grid creation order
    pub fn living_positions(&self, death_age: u64) -> Vec<Position> {
        self.creation_order
            .iter()
            .copied()
            .filter(|position| {
                self.tiles
                    .get(position)
                    .is_some_and(|tile| tile.has_living_cell(death_age))
            })
            .collect()
    }

    /// All materialized tiles, in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.creation_order
            .iter()
            .filter_map(|position| self.tiles.get(position))
    }
}

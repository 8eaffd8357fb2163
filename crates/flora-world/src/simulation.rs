//! Simulation engine: the per-tick diffusion, growth, and aging passes.

use crate::cell::LifeCell;
use crate::grid::{Tile, TileGrid};
use flora_core::{Direction, Position, Resource, Result, SimConfig, TerrainKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Census of the materialized world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub living: usize,
    pub dead: usize,
    pub tiles: usize,
}

/// How a neighboring tile participates in diffusion
enum Occupancy {
    Living,
    Dead,
    Empty,
}

/// The simulation engine.
///
/// Owns the grid and advances it one discrete tick at a time. Every pass
/// mutates the live grid in place: a tile visited later in a pass observes
/// transfers performed earlier in the same pass. Together with the creation-
/// order iteration and the per-cell direction orders this makes runs fully
/// deterministic.
pub struct Simulation {
    grid: TileGrid,
    config: SimConfig,
    ticks: u64,
}

impl Simulation {
    /// Build a world holding a single full-capacity seed cell at the origin
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut grid = TileGrid::new();
        grid.get_mut(Position::new(0, 0)).cell = Some(LifeCell::seed(config.resource_cap));
        Ok(Self {
            grid,
            config,
            ticks: 0,
        })
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Lazily-creating tile lookup, the read surface for presentation layers
    pub fn tile(&mut self, x: i32, y: i32) -> &Tile {
        self.grid.get(Position::new(x, y))
    }

    /// Place a fresh full-capacity seed cell at the coordinate.
    ///
    /// Occupied tiles are left alone, dead occupants included; returns
    /// whether a cell was placed.
    pub fn seed_at(&mut self, x: i32, y: i32) -> bool {
        let cap = self.config.resource_cap;
        let tile = self.grid.get_mut(Position::new(x, y));
        if tile.cell.is_some() {
            return false;
        }
        tile.cell = Some(LifeCell::seed(cap));
        debug!(x, y, "seeded new cell");
        true
    }

    pub fn population(&self) -> PopulationStats {
        let mut living = 0;
        let mut dead = 0;
        for tile in self.grid.iter() {
            match &tile.cell {
                Some(cell) if cell.is_dead(self.config.death_age) => dead += 1,
                Some(_) => living += 1,
                None => {}
            }
        }
        PopulationStats {
            living,
            dead,
            tiles: self.grid.len(),
        }
    }

    /// Advance the simulation by one discrete step
    pub fn tick(&mut self) {
        self.diffuse();
        self.grow();
        self.age_cells();
        self.ticks += 1;
    }

    /// Batch driver: run `num_ticks` steps with periodic population logging
    #[instrument(skip(self))]
    pub fn run(&mut self, num_ticks: u64) {
        for i in 0..num_ticks {
            self.tick();

            if (i + 1) % 100 == 0 {
                let stats = self.population();
                info!(
                    tick = self.ticks,
                    living = stats.living,
                    dead = stats.dead,
                    tiles = stats.tiles,
                    "population snapshot"
                );
            }
        }

        let stats = self.population();
        info!(
            ticks = self.ticks,
            living = stats.living,
            dead = stats.dead,
            tiles = stats.tiles,
            "run complete"
        );
    }

    /// Phase 1: balance resources with living neighbors and absorb from
    /// adjacent terrain, at most one unit per resource per cell per tick.
    fn diffuse(&mut self) {
        let death_age = self.config.death_age;
        let mut balanced: HashSet<(Position, Position, Resource)> = HashSet::new();

        for position in self.grid.living_positions(death_age) {
            let flow_order = match &self.grid.get(position).cell {
                Some(cell) => cell.flow_order,
                None => continue,
            };
            let mut moved: HashSet<Resource> = HashSet::new();

            for direction in flow_order {
                let neighbor_pos = position.step(direction);
                let (terrain, occupancy) = {
                    let neighbor = self.grid.get(neighbor_pos);
                    let occupancy = match &neighbor.cell {
                        Some(cell) if cell.is_dead(death_age) => Occupancy::Dead,
                        Some(_) => Occupancy::Living,
                        None => Occupancy::Empty,
                    };
                    (neighbor.terrain(), occupancy)
                };

                match occupancy {
                    Occupancy::Living => {
                        self.balance_with_neighbor(position, neighbor_pos, &mut moved, &mut balanced);
                    }
                    // Dead occupants are inert: no exchange, and they mask
                    // the terrain underneath them.
                    Occupancy::Dead => {}
                    Occupancy::Empty => match terrain {
                        TerrainKind::Dirt => {
                            self.absorb(position, Resource::Mineral, &mut moved);
                            // dirt yields water only through a cell's underside
                            if direction == Direction::South {
                                self.absorb(position, Resource::Water, &mut moved);
                            }
                        }
                        TerrainKind::Sky => {
                            self.absorb(position, Resource::Carbon, &mut moved);
                            // photosynthesis needs upward exposure
                            if direction == Direction::North {
                                self.absorb(position, Resource::Sugar, &mut moved);
                            }
                        }
                    },
                }
            }
        }
    }

    /// Move at most one unit of each resource between the visited cell and a
    /// living neighbor, always from the larger holder toward the smaller.
    ///
    /// The canonical pair key lets whichever tile is visited first claim the
    /// exchange for a resource; the reverse visit from the neighbor's own
    /// turn finds the key consumed and skips it.
    fn balance_with_neighbor(
        &mut self,
        position: Position,
        neighbor_pos: Position,
        moved: &mut HashSet<Resource>,
        balanced: &mut HashSet<(Position, Position, Resource)>,
    ) {
        let cap = self.config.resource_cap;
        let (lo, hi) = if position <= neighbor_pos {
            (position, neighbor_pos)
        } else {
            (neighbor_pos, position)
        };

        for resource in Resource::all() {
            let key = (lo, hi, resource);
            if balanced.contains(&key) || moved.contains(&resource) {
                continue;
            }

            let ours = self.cell_amount(position, resource);
            let theirs = self.cell_amount(neighbor_pos, resource);
            if ours == theirs {
                continue;
            }

            let (source, dest, source_amount, dest_amount) = if ours > theirs {
                (position, neighbor_pos, ours, theirs)
            } else {
                (neighbor_pos, position, theirs, ours)
            };
            if source_amount == 0 || dest_amount >= cap {
                continue;
            }

            if let Some(cell) = &mut self.grid.get_mut(source).cell {
                *cell.amount_mut(resource) -= 1;
            }
            if let Some(cell) = &mut self.grid.get_mut(dest).cell {
                *cell.amount_mut(resource) += 1;
            }
            moved.insert(resource);
            balanced.insert(key);
        }
    }

    /// Terrain absorption: a pure source, gated only by the cap and the
    /// per-tick moved-set.
    fn absorb(&mut self, position: Position, resource: Resource, moved: &mut HashSet<Resource>) {
        let cap = self.config.resource_cap;
        if moved.contains(&resource) {
            return;
        }
        if let Some(cell) = &mut self.grid.get_mut(position).cell {
            if cell.amount(resource) < cap {
                *cell.amount_mut(resource) += 1;
                moved.insert(resource);
            }
        }
    }

    fn cell_amount(&mut self, position: Position, resource: Resource) -> u32 {
        self.grid
            .get(position)
            .cell
            .as_ref()
            .map_or(0, |cell| cell.amount(resource))
    }

    /// Phase 2: ready cells bud into the first unoccupied adjacent tile in
    /// grow order, at most one child per parent per tick. Cells born here do
    /// not reproduce until the next tick.
    fn grow(&mut self) {
        let cap = self.config.resource_cap;
        let death_age = self.config.death_age;

        for position in self.grid.living_positions(death_age) {
            let (ready, grow_order) = match &self.grid.get(position).cell {
                Some(cell) => (cell.can_reproduce(cap), cell.grow_order),
                None => continue,
            };
            if !ready {
                continue;
            }

            for direction in grow_order {
                let target = position.step(direction);
                if self.grid.get(target).cell.is_some() {
                    continue;
                }

                let child = match &mut self.grid.get_mut(position).cell {
                    Some(cell) => cell.reproduce(),
                    None => break,
                };
                self.grid.get_mut(target).cell = Some(child);
                debug!(
                    parent_x = position.x,
                    parent_y = position.y,
                    child_x = target.x,
                    child_y = target.y,
                    tick = self.ticks,
                    "cell budded"
                );
                break;
            }
        }
    }

    /// Phase 3: everyone alive after growth ages by one, newborns included.
    /// Cells already past the death age are skipped and stay frozen.
    fn age_cells(&mut self) {
        let death_age = self.config.death_age;

        for position in self.grid.living_positions(death_age) {
            if let Some(cell) = &mut self.grid.get_mut(position).cell {
                cell.age += 1;
                if cell.is_dead(death_age) {
                    debug!(
                        x = position.x,
                        y = position.y,
                        age = cell.age,
                        tick = self.ticks,
                        "cell died of old age"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_sim() -> Simulation {
        Simulation::new(SimConfig::default()).unwrap()
    }

    /// A simulation with no seed cell, for scenarios that need a clean world
    fn empty_sim() -> Simulation {
        Simulation {
            grid: TileGrid::new(),
            config: SimConfig::default(),
            ticks: 0,
        }
    }

    fn place_cell(sim: &mut Simulation, x: i32, y: i32, amounts: [u32; 4]) {
        let [minerals, sugar, water, carbon] = amounts;
        sim.grid.get_mut(Position::new(x, y)).cell = Some(LifeCell {
            minerals,
            sugar,
            water,
            carbon,
            ..LifeCell::new()
        });
    }

    fn cell_at(sim: &mut Simulation, x: i32, y: i32) -> LifeCell {
        sim.tile(x, y).cell.clone().expect("cell expected at tile")
    }

    #[test]
    fn test_world_starts_with_seed_at_origin() {
        let mut sim = default_sim();
        assert_eq!(sim.tick_count(), 0);

        let tile = sim.tile(0, 0);
        assert_eq!(tile.terrain(), TerrainKind::Dirt);
        let cell = tile.cell.as_ref().unwrap();
        assert_eq!(cell.age, 0);
        for resource in Resource::all() {
            assert_eq!(cell.amount(resource), 10);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            resource_cap: 0,
            ..Default::default()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_tick_counter_advances_by_one() {
        let mut sim = empty_sim();
        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.tick_count(), 5);
    }

    // A full seed cell cannot absorb anything, buds north on its first tick,
    // and both parent and child end the tick at age 1.
    #[test]
    fn test_first_tick_of_seed_world() {
        let mut sim = default_sim();
        sim.tick();

        let parent = cell_at(&mut sim, 0, 0);
        for resource in Resource::all() {
            assert_eq!(parent.amount(resource), 5);
        }
        assert_eq!(parent.age, 1);

        let child_tile = sim.tile(0, -1);
        assert_eq!(child_tile.terrain(), TerrainKind::Sky);
        let child = child_tile.cell.clone().unwrap();
        for resource in Resource::all() {
            assert_eq!(child.amount(resource), 5);
        }
        assert_eq!(child.age, 1);

        assert_eq!(sim.tick_count(), 1);
    }

    // Two adjacent cells exchange exactly one unit of water per tick until
    // their amounts meet, and never overshoot. Placed in the sky with the
    // other resources below the half-cap threshold so neither terrain
    // absorption of water nor reproduction can interfere.
    #[test]
    fn test_water_equalizes_one_unit_per_tick() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [4, 4, 10, 4]);
        place_cell(&mut sim, 1, -5, [4, 4, 0, 4]);

        sim.tick();
        assert_eq!(cell_at(&mut sim, 0, -5).water, 9);
        assert_eq!(cell_at(&mut sim, 1, -5).water, 1);

        for _ in 0..9 {
            sim.tick();
        }
        assert_eq!(cell_at(&mut sim, 0, -5).water, 5);
        assert_eq!(cell_at(&mut sim, 1, -5).water, 5);

        // sky offers no minerals, so they stayed where they started
        assert_eq!(cell_at(&mut sim, 0, -5).minerals, 4);
        assert_eq!(cell_at(&mut sim, 1, -5).minerals, 4);
    }

    // The pair key is claimed by whichever tile is visited first, so the
    // reverse visit moves nothing even when the neighbor walks its
    // directions in the opposite order.
    #[test]
    fn test_pair_exchanges_at_most_once_per_tick() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [4, 4, 10, 4]);
        place_cell(&mut sim, 1, -5, [4, 4, 0, 4]);
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(1, -5)).cell {
            cell.flow_order = [
                Direction::West,
                Direction::South,
                Direction::East,
                Direction::North,
            ];
        }

        sim.tick();
        assert_eq!(cell_at(&mut sim, 0, -5).water, 9);
        assert_eq!(cell_at(&mut sim, 1, -5).water, 1);
    }

    // A cell with sky above, dirt below, and equal living neighbors east and
    // west gains exactly one unit of each resource in a tick.
    #[test]
    fn test_terrain_sources_feed_all_four_resources() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, 0, [2, 2, 2, 2]);
        place_cell(&mut sim, 1, 0, [2, 2, 2, 2]);
        place_cell(&mut sim, -1, 0, [2, 2, 2, 2]);

        sim.tick();

        let center = cell_at(&mut sim, 0, 0);
        assert_eq!(center.minerals, 3);
        assert_eq!(center.sugar, 3);
        assert_eq!(center.water, 3);
        assert_eq!(center.carbon, 3);
    }

    // Terrain gains respect the resource cap.
    #[test]
    fn test_terrain_gains_are_capped() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [4, 4, 4, 10]);

        sim.tick();

        let cell = cell_at(&mut sim, 0, -5);
        assert_eq!(cell.carbon, 10);
        assert_eq!(cell.sugar, 5);
    }

    #[test]
    fn test_dead_cells_are_inert_and_frozen() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [10, 10, 10, 10]);
        place_cell(&mut sim, 1, -5, [3, 3, 3, 3]);
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(1, -5)).cell {
            cell.age = 51;
        }
        // keep the living cell below the reproduce threshold so the census
        // stays at exactly one living cell
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(0, -5)).cell {
            cell.minerals = 4;
        }

        sim.tick();

        let dead = cell_at(&mut sim, 1, -5);
        assert_eq!(dead.age, 51);
        for resource in Resource::all() {
            assert_eq!(dead.amount(resource), 3);
        }

        let stats = sim.population();
        assert_eq!(stats.living, 1);
        assert_eq!(stats.dead, 1);
    }

    #[test]
    fn test_cells_die_past_death_age() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [4, 4, 4, 4]);
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(0, -5)).cell {
            cell.age = 50;
        }

        sim.tick();
        // aged to 51, now past the threshold
        assert_eq!(cell_at(&mut sim, 0, -5).age, 51);
        assert_eq!(sim.population().living, 0);
        assert_eq!(sim.population().dead, 1);

        sim.tick();
        // frozen from here on
        assert_eq!(cell_at(&mut sim, 0, -5).age, 51);
    }

    #[test]
    fn test_reproduction_blocked_when_surrounded() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [6, 6, 6, 6]);
        for (x, y) in [(0, -6), (0, -4), (1, -5), (-1, -5)] {
            place_cell(&mut sim, x, y, [3, 3, 3, 3]);
            if let Some(cell) = &mut sim.grid.get_mut(Position::new(x, y)).cell {
                cell.age = 51;
            }
        }
        let tiles_before = sim.population().tiles;

        sim.tick();

        // no child was placed and the parent kept its resources
        let center = cell_at(&mut sim, 0, -5);
        for resource in Resource::all() {
            assert_eq!(center.amount(resource), 6);
        }
        assert_eq!(sim.population().living, 1);
        assert_eq!(sim.population().tiles, tiles_before);
    }

    #[test]
    fn test_grow_order_picks_first_empty_direction() {
        let mut sim = empty_sim();
        place_cell(&mut sim, 0, -5, [6, 6, 6, 6]);
        // north blocked by a corpse, so the child lands south
        place_cell(&mut sim, 0, -6, [3, 3, 3, 3]);
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(0, -6)).cell {
            cell.age = 51;
        }

        sim.tick();

        assert!(sim.tile(0, -4).cell.is_some());
        assert_eq!(sim.population().living, 2);
    }

    #[test]
    fn test_seed_at_respects_occupancy() {
        let mut sim = empty_sim();
        assert!(sim.seed_at(3, 3));
        let placed = cell_at(&mut sim, 3, 3);
        assert_eq!(placed.water, 10);

        // a second seed on the same tile is refused
        if let Some(cell) = &mut sim.grid.get_mut(Position::new(3, 3)).cell {
            cell.age = 7;
        }
        assert!(!sim.seed_at(3, 3));
        assert_eq!(cell_at(&mut sim, 3, 3).age, 7);
    }

    // Long colony run: every resource counter everywhere stays within
    // bounds, through growth, die-offs, and the death-age transition.
    #[test]
    fn test_resources_stay_bounded_over_long_run() {
        let mut sim = default_sim();
        sim.run(60);

        assert_eq!(sim.tick_count(), 60);
        let cap = sim.config().resource_cap;
        for tile in sim.grid.iter() {
            if let Some(cell) = &tile.cell {
                for resource in Resource::all() {
                    assert!(cell.amount(resource) <= cap);
                }
            }
        }
        // the colony outgrew its seed
        assert!(sim.population().living > 1);
    }

    proptest! {
        // Whatever two adjacent cells start with, a few ticks never push any
        // counter outside [0, cap].
        #[test]
        fn prop_adjacent_cells_stay_bounded(
            left in proptest::array::uniform4(0u32..=10),
            right in proptest::array::uniform4(0u32..=10),
        ) {
            let mut sim = empty_sim();
            place_cell(&mut sim, 0, -5, left);
            place_cell(&mut sim, 1, -5, right);

            for _ in 0..5 {
                sim.tick();
            }

            for tile in sim.grid.iter() {
                if let Some(cell) = &tile.cell {
                    for resource in Resource::all() {
                        prop_assert!(cell.amount(resource) <= 10);
                    }
                }
            }
        }
    }
}

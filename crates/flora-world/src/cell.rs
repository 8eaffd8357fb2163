//! Life cell state and resource accounting.

use flora_core::{Direction, Resource};
use serde::{Deserialize, Serialize};

/// A living occupant of a tile.
///
/// Each of the four resource counters stays within `[0, cap]`, where the cap
/// comes from the simulation config rather than a process-wide constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeCell {
    pub minerals: u32,
    pub sugar: u32,
    pub water: u32,
    pub carbon: u32,
    pub age: u64,
    /// Direction priority for the diffusion pass
    pub flow_order: [Direction; 4],
    /// Direction priority when placing offspring
    pub grow_order: [Direction; 4],
}

impl LifeCell {
    pub fn new() -> Self {
        Self {
            minerals: 0,
            sugar: 0,
            water: 0,
            carbon: 0,
            age: 0,
            flow_order: Direction::all(),
            grow_order: Direction::all(),
        }
    }

    /// Cell at full capacity on every resource, used to start a colony
    pub fn seed(cap: u32) -> Self {
        Self {
            minerals: cap,
            sugar: cap,
            water: cap,
            carbon: cap,
            ..Self::new()
        }
    }

    pub fn amount(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Mineral => self.minerals,
            Resource::Sugar => self.sugar,
            Resource::Water => self.water,
            Resource::Carbon => self.carbon,
        }
    }

    pub fn amount_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Mineral => &mut self.minerals,
            Resource::Sugar => &mut self.sugar,
            Resource::Water => &mut self.water,
            Resource::Carbon => &mut self.carbon,
        }
    }

    /// Dead cells stay in the grid but no longer take part in any pass
    pub fn is_dead(&self, death_age: u64) -> bool {
        self.age > death_age
    }

    /// A cell is ready to bud once every resource reaches half its capacity
    pub fn can_reproduce(&self, cap: u32) -> bool {
        Resource::all().iter().all(|&r| self.amount(r) * 2 >= cap)
    }

    /// Split off a new cell, floor-halving every resource on both sides.
    ///
    /// An odd count loses one unit to the split. The child starts at age 0
    /// with the default direction orders; it inherits nothing but resources.
    pub fn reproduce(&mut self) -> LifeCell {
        let mut child = LifeCell::new();
        for resource in Resource::all() {
            let half = self.amount(resource) / 2;
            *child.amount_mut(resource) = half;
            *self.amount_mut(resource) = half;
        }
        child
    }
}

impl Default for LifeCell {
    fn default() -> Self {
        Self::new()
    }
}

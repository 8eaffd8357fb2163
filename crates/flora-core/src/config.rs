//! Configuration types for the simulation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Simulation tuning parameters.
///
/// Passed into the engine at construction so independent simulations never
/// share state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Shared capacity for every resource counter
    pub resource_cap: u32,
    /// Age beyond which a cell is dead and stops participating
    pub death_age: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            resource_cap: 10,
            death_age: 50,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.resource_cap == 0 {
            return Err(Error::Config(
                "resource_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Simulation configuration

use crate::lane::LaneTuning;
use crate::math::{Aabb, Vec2};
use crate::spatial::QuadTreeConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to build a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Parties per tick, the orchestrating thread included.
    pub workers: usize,
    /// Region covered by the spatial index.
    pub world: Aabb,
    pub quadtree: QuadTreeConfig,
    pub lane: LaneTuning,
    /// Footprint of every hand.
    pub hand_size: Vec2,
}

impl SimulationConfig {
    /// Default world region: a 250 000 unit square extending right and down from the origin.
    pub fn default_world() -> Aabb {
        Aabb::from_center_size(Vec2::new(125_000.0, -125_000.0), Vec2::splat(250_000.0))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            world: Self::default_world(),
            quadtree: QuadTreeConfig::default(),
            lane: LaneTuning::default(),
            hand_size: crate::hand::HAND_SIZE,
        }
    }
}

/// Available hardware parallelism, falling back to 4.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

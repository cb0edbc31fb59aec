//! Belt Core
//!
//! Conveyor belt simulation:
//! - Lanes carrying ordered items along waypoint polylines
//! - Hands transferring items between lanes
//! - Quadtree spatial index over lanes and hands
//! - Two-phase parallel tick scheduler
//!
//! ```no_run
//! use belt_core::{math::Vec2, Simulation};
//!
//! # fn main() -> Result<(), belt_core::SimError> {
//! let mut sim = Simulation::with_workers(4)?;
//! let a = sim.create_lane((0..10).map(|i| Vec2::new(0.0, -(i as f32))).collect())?;
//! let b = sim.create_lane((0..10).map(|i| Vec2::new(2.0, -(i as f32))).collect())?;
//! sim.create_hand(Vec2::new(1.0, -8.5), a, 8.5, b, 1.5)?;
//! sim.spawn_item(a, 0);
//! sim.tick(1.0 / 60.0)?;
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod hand;
pub mod handle;
pub mod lane;
pub mod math;
pub mod scheduler;
pub mod simulation;
pub mod spatial;
pub mod time;

pub use glam;

pub use config::SimulationConfig;
pub use error::{InsertError, LaneError, SimError};
pub use hand::{Hand, HandEvent, HandState};
pub use handle::{HandHandle, LaneHandle, ObjectKind, ObjectRef};
pub use lane::{Item, Lane, LaneTuning};
pub use scheduler::TickStats;
pub use simulation::Simulation;
pub use spatial::{QuadTree, QuadTreeConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

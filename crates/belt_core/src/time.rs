//! Simulation time
//!
//! The host owns the clock and hands a `dt` to every tick; this only keeps
//! count of what has been simulated so far.

use std::time::Duration;

/// Nominal host frame (60 Hz) used by the runtime when no `dt` is given.
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Simulation time tracker
#[derive(Debug, Clone, Default)]
pub struct SimulationTime {
    tick_count: u64,
    elapsed: f64,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self, dt: f32) {
        self.tick_count += 1;
        self.elapsed += f64::from(dt);
    }

    /// Total simulated progress units (seconds at unit belt speed).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

//! Settings management

use belt_core::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the worker count.
pub const WORKERS_ENV: &str = "BELTS_WORKERS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("environment variable {var} has unusable value {value:?}")]
    Env { var: &'static str, value: String },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Everything the host reads at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationConfig,
    pub run: RunSettings,
}

/// How long and how fast the host drives the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub ticks: u64,
    /// Progress units per tick; defaults to one 60 Hz frame.
    pub dt: f32,
    /// Log a throughput summary every this many ticks (0 disables it).
    pub report_every: u64,
    pub layout: LayoutSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            ticks: 600,
            dt: belt_core::time::TICK_DURATION.as_secs_f32(),
            report_every: 60,
            layout: LayoutSettings::default(),
        }
    }
}

/// Grid of belts the host lays out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Belts per row.
    pub columns: usize,
    pub rows: usize,
    /// Waypoints per belt, one world unit apart.
    pub waypoints: usize,
    /// Horizontal distance between neighbouring belts.
    pub spacing: f32,
    /// Seed an item at every n-th waypoint of each belt (0 seeds nothing).
    pub seed_every: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 1,
            waypoints: 11,
            spacing: 2.0,
            seed_every: 3,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_json(&text)?;
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        settings.validate()?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply overrides read through `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(WORKERS_ENV) {
            let workers = value.trim().parse().map_err(|_| SettingsError::Env {
                var: WORKERS_ENV,
                value: value.clone(),
            })?;
            tracing::debug!(workers, "worker count overridden from environment");
            self.simulation.workers = workers;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let sim = &self.simulation;
        if sim.workers == 0 {
            return Err(invalid("simulation.workers", "must be at least 1"));
        }
        if sim.quadtree.capacity == 0 {
            return Err(invalid("simulation.quadtree.capacity", "must be at least 1"));
        }
        let world = sim.world.size();
        if !(world.x > 0.0 && world.y > 0.0) {
            return Err(invalid("simulation.world", "must have a positive area"));
        }
        if !(sim.hand_size.x > 0.0 && sim.hand_size.y > 0.0) {
            return Err(invalid("simulation.hand_size", "must be positive"));
        }

        let lane = &sim.lane;
        for (field, value) in [
            ("simulation.lane.item_spacing", lane.item_spacing),
            ("simulation.lane.end_margin", lane.end_margin),
            ("simulation.lane.pickup_tolerance", lane.pickup_tolerance),
            ("simulation.lane.stuck_threshold", lane.stuck_threshold),
            ("simulation.lane.stuck_rest", lane.stuck_rest),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, format!("must be positive, got {value}")));
            }
        }

        let run = &self.run;
        if !(run.dt.is_finite() && run.dt >= 0.0) {
            return Err(invalid("run.dt", format!("must be non-negative, got {}", run.dt)));
        }
        if run.layout.waypoints < 2 {
            return Err(invalid("run.layout.waypoints", "a belt needs at least 2"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

//! Belt Services Layer
//!
//! Host-side services around the simulation core. Currently settings:
//! a JSON file plus environment overrides, validated into a
//! [`belt_core::SimulationConfig`] and a run description for the host.

pub mod settings;

pub use settings::{LayoutSettings, RunSettings, Settings, SettingsError, WORKERS_ENV};

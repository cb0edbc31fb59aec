use crate::handle::{HandHandle, LaneHandle};
use thiserror::Error;

/// Errors raised while constructing a lane.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LaneError {
    #[error("a lane needs at least 2 waypoints, got {waypoints}")]
    Degenerate { waypoints: usize },

    #[error("waypoint {index} is not finite")]
    NonFiniteWaypoint { index: usize },
}

/// Insertion failures. Never fatal: the lane is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InsertError {
    #[error("no room on lane for an item near progress {progress}")]
    NoRoom { progress: f32 },

    #[error("item progress is not a finite number")]
    NotFinite,

    #[error("lane {lane} does not exist")]
    MissingLane { lane: LaneHandle },
}

/// Errors surfaced by the simulation context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Lane(#[from] LaneError),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error("lane {0} does not exist")]
    UnknownLane(LaneHandle),

    #[error("hand {0} does not exist")]
    UnknownHand(HandHandle),

    #[error("hand progress must be finite, got {progress}")]
    NonFiniteProgress { progress: f32 },

    #[error("tick step must be finite and non-negative, got {dt}")]
    InvalidStep { dt: f32 },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("failed to spawn worker thread {index}: {reason}")]
    WorkerSpawn { index: usize, reason: String },

    #[error("worker thread {index} is gone; the tick cannot complete")]
    WorkerLost { index: usize },
}

//! Grid layout of belts and hands
//!
//! Belts run downward in rows. Within a row a hand sits between every pair
//! of neighbouring belts, taking items near the bottom of one belt and
//! dropping them near the top of the next; the last belt feeds the first so
//! every row is a closed loop.

use belt_core::math::Vec2;
use belt_core::{HandHandle, LaneHandle, SimError, Simulation};
use belt_services::LayoutSettings;

/// Gap between rows, in world units, beyond the belt length.
const ROW_GAP: f32 = 2.0;

/// Progress left before the end of a belt where hands pick up.
const PICKUP_FROM_END: f32 = 2.5;
const DROP_PROGRESS: f32 = 1.5;

pub struct Layout {
    pub lanes: Vec<LaneHandle>,
    pub hands: Vec<HandHandle>,
}

impl Layout {
    pub fn build(sim: &mut Simulation, settings: &LayoutSettings) -> Result<Self, SimError> {
        let waypoints = settings.waypoints;
        let row_height = waypoints as f32 - 1.0 + ROW_GAP;
        let pickup = (waypoints as f32 - PICKUP_FROM_END).max(0.5);
        let drop = DROP_PROGRESS.min(waypoints as f32 - 1.0);

        let mut lanes = Vec::with_capacity(settings.rows * settings.columns);
        let mut hands = Vec::with_capacity(settings.rows * settings.columns);

        for row in 0..settings.rows {
            let top = -(row as f32) * row_height;
            let row_lanes = (0..settings.columns)
                .map(|column| {
                    let x = column as f32 * settings.spacing;
                    let points = (0..waypoints)
                        .map(|i| Vec2::new(x, top - i as f32))
                        .collect();
                    sim.create_lane(points)
                })
                .collect::<Result<Vec<_>, _>>()?;

            if row_lanes.len() >= 2 {
                for (column, &from) in row_lanes.iter().enumerate() {
                    let to = row_lanes[(column + 1) % row_lanes.len()];
                    let position = Vec2::new(
                        column as f32 * settings.spacing + settings.spacing * 0.5,
                        top - pickup,
                    );
                    hands.push(sim.create_hand(position, from, pickup, to, drop)?);
                }
            }
            lanes.extend(row_lanes);
        }

        tracing::info!(lanes = lanes.len(), hands = hands.len(), "layout built");
        Ok(Self { lanes, hands })
    }

    /// Drop an item on every `every`-th waypoint, locating belts by world position.
    pub fn seed(&self, sim: &mut Simulation, settings: &LayoutSettings) -> usize {
        if settings.seed_every == 0 {
            return 0;
        }

        let points: Vec<Vec2> = self
            .lanes
            .iter()
            .filter_map(|&lane| sim.with_lane(lane, |l| l.waypoints().to_vec()))
            .flat_map(|waypoints| waypoints.into_iter().step_by(settings.seed_every))
            .collect();

        let seeded = points
            .into_iter()
            .filter(|&point| sim.spawn_item_at(point))
            .count();
        tracing::info!(seeded, "items seeded");
        seeded
    }
}

//! The simulation context
//!
//! Owns every lane and hand of a session together with the spatial index
//! over them and the scheduler that advances them. Lanes and hands are
//! created once and live until the context is dropped; callers refer to
//! them through [`LaneHandle`] and [`HandHandle`].

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::hand::{Hand, HandState};
use crate::handle::{HandHandle, LaneHandle, ObjectRef};
use crate::lane::{Item, Lane};
use crate::math::{Aabb, HasBounds, Vec2};
use crate::scheduler::{Scheduler, TickStats};
use crate::spatial::QuadTree;
use crate::time::SimulationTime;
use belt_metrics::{Counter, PhaseProfiler, TickTimer};
use rayon::prelude::*;
use std::hash::{Hash, Hasher};

/// Squared distance within which a world point selects a waypoint for spawning.
pub const SPAWN_PICK_DIST_SQ: f32 = 0.5;

/// Ticks kept in the rolling tick-time window.
const TIMING_WINDOW: usize = 120;

/// What the spatial index stores: an object and the bounds it had when registered.
#[derive(Debug, Clone, Copy)]
struct SpatialEntry {
    object: ObjectRef,
    bounds: Aabb,
}

impl PartialEq for SpatialEntry {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl Eq for SpatialEntry {}

impl Hash for SpatialEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
    }
}

impl HasBounds for SpatialEntry {
    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

pub struct Simulation {
    config: SimulationConfig,
    scheduler: Scheduler,
    index: QuadTree<SpatialEntry>,
    time: SimulationTime,
    timer: TickTimer,
    events: Counter,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        let scheduler = Scheduler::new(config.workers)?;
        let index = QuadTree::with_config(config.world, config.quadtree);

        tracing::info!(
            workers = config.workers,
            quadtree_capacity = config.quadtree.capacity,
            "simulation created"
        );

        Ok(Self {
            config,
            scheduler,
            index,
            time: SimulationTime::new(),
            timer: TickTimer::new(TIMING_WINDOW),
            events: Counter::new(),
        })
    }

    /// Default configuration with an explicit worker count.
    pub fn with_workers(workers: usize) -> Result<Self, SimError> {
        Self::new(SimulationConfig::default().with_workers(workers))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.scheduler.parties()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn create_lane(&mut self, waypoints: Vec<Vec2>) -> Result<LaneHandle, SimError> {
        let lane = Lane::with_tuning(waypoints, self.config.lane)?;
        let bounds = lane.bounds();
        let handle = self.scheduler.arenas_mut().push_lane(lane);
        self.register(ObjectRef::Lane(handle), bounds);
        tracing::trace!(%handle, "lane created");
        Ok(handle)
    }

    /// Create a hand moving items from `from` at `from_progress` to `to` at `to_progress`.
    pub fn create_hand(
        &mut self,
        position: Vec2,
        from: LaneHandle,
        from_progress: f32,
        to: LaneHandle,
        to_progress: f32,
    ) -> Result<HandHandle, SimError> {
        for progress in [from_progress, to_progress] {
            if !progress.is_finite() {
                return Err(SimError::NonFiniteProgress { progress });
            }
        }

        let mut arenas = self.scheduler.arenas_mut();
        for lane in [from, to] {
            if arenas.lane(lane).is_none() {
                tracing::warn!(%lane, "hand references an unknown lane");
                return Err(SimError::UnknownLane(lane));
            }
        }

        let hand = Hand::with_size(
            position,
            from,
            from_progress,
            to,
            to_progress,
            self.config.hand_size,
        );
        let bounds = hand.bounds();
        let handle = arenas.push_hand(hand);
        drop(arenas);

        self.register(ObjectRef::Hand(handle), bounds);
        tracing::trace!(%handle, %from, %to, "hand created");
        Ok(handle)
    }

    fn register(&mut self, object: ObjectRef, bounds: Aabb) {
        if !self.index.insert(SpatialEntry { object, bounds }) {
            tracing::warn!(%object, "object lies outside the indexed world region");
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Put a new item on `lane` at an arbitrary progress.
    ///
    /// The item is clamped into the gap it falls in; the landing index is returned.
    pub fn insert_item(&mut self, lane: LaneHandle, progress: f32) -> Result<usize, SimError> {
        let arenas = self.scheduler.arenas();
        let slot = arenas.lane(lane).ok_or(SimError::UnknownLane(lane))?;
        let index = slot.lock().insert(Item::new(progress))?;
        Ok(index)
    }

    /// Spawn an item at a waypoint of `lane`. Returns `false` when there is no room.
    pub fn spawn_item(&mut self, lane: LaneHandle, waypoint: usize) -> bool {
        match self.insert_item(lane, waypoint as f32) {
            Ok(_) => {
                self.events.increment("spawned", 1);
                true
            }
            Err(err) => {
                tracing::trace!(%lane, waypoint, %err, "spawn rejected");
                self.events.increment("spawn_rejected", 1);
                false
            }
        }
    }

    /// Spawn an item on the lane waypoint nearest a world point.
    ///
    /// Lanes whose bounds contain `point` are tried in creation order; the
    /// first one with a waypoint within [`SPAWN_PICK_DIST_SQ`] gets the item.
    pub fn spawn_item_at(&mut self, point: Vec2) -> bool {
        let mut lanes: Vec<LaneHandle> = self
            .index
            .query_point(point)
            .iter()
            .filter_map(|entry| entry.object.as_lane())
            .collect();
        lanes.sort_unstable();

        let waypoint = {
            let arenas = self.scheduler.arenas();
            lanes.into_iter().find_map(|handle| {
                let lane = arenas.lane(handle)?.lock();
                lane.nearest_waypoint(point, SPAWN_PICK_DIST_SQ)
                    .map(|index| (handle, index))
            })
        };

        match waypoint {
            Some((lane, index)) => self.spawn_item(lane, index),
            None => {
                tracing::trace!(?point, "no lane waypoint under spawn point");
                false
            }
        }
    }

    /// Take the item nearest `progress` off `lane`, if one is within pickup range.
    pub fn remove_item(&mut self, lane: LaneHandle, progress: f32) -> Option<Item> {
        let arenas = self.scheduler.arenas();
        let item = arenas.lane(lane)?.lock().remove_near(progress);
        item
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance every lane by `dt`, then every hand by `dt`.
    pub fn tick(&mut self, dt: f32) -> Result<TickStats, SimError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidStep { dt });
        }

        self.timer.begin();
        let stats = self.scheduler.tick(dt)?;
        self.timer.end();
        self.time.advance_tick(dt);

        self.events.increment("picked_up", stats.picked_up as u64);
        self.events.increment("delivered", stats.delivered as u64);
        self.events.increment("newly_stuck", stats.newly_stuck as u64);

        tracing::debug!(
            tick = self.time.tick_count(),
            advanced = stats.advanced,
            stuck = stats.newly_stuck,
            picked_up = stats.picked_up,
            delivered = stats.delivered,
            blocked = stats.blocked,
            "tick"
        );
        Ok(stats)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Lanes and hands whose bounds intersect `region`.
    pub fn query_region(&self, region: &Aabb) -> Vec<ObjectRef> {
        self.index
            .query(region)
            .into_iter()
            .map(|entry| entry.object)
            .collect()
    }

    /// Run `f` against a lane. Must not be called from inside another accessor closure.
    pub fn with_lane<R>(&self, handle: LaneHandle, f: impl FnOnce(&Lane) -> R) -> Option<R> {
        let arenas = self.scheduler.arenas();
        let lane = arenas.lane(handle)?.lock();
        Some(f(&lane))
    }

    pub fn with_hand<R>(&self, handle: HandHandle, f: impl FnOnce(&Hand) -> R) -> Option<R> {
        let arenas = self.scheduler.arenas();
        let hand = arenas.hand(handle)?.lock();
        Some(f(&hand))
    }

    /// World position of the item `hand` is swinging, if any.
    pub fn carried_item_point(&self, hand: HandHandle) -> Result<Option<Vec2>, SimError> {
        self.with_hand(hand, Hand::carried_item_point)
            .ok_or(SimError::UnknownHand(hand))
    }

    pub fn lane_items(&self, handle: LaneHandle) -> Option<Vec<Item>> {
        self.with_lane(handle, |lane| lane.items().to_vec())
    }

    pub fn stuck_count(&self, handle: LaneHandle) -> Option<usize> {
        self.with_lane(handle, Lane::stuck_count)
    }

    pub fn hand_state(&self, handle: HandHandle) -> Option<HandState> {
        self.with_hand(handle, Hand::state)
    }

    pub fn lane_count(&self) -> usize {
        self.scheduler.arenas().lanes().len()
    }

    pub fn hand_count(&self) -> usize {
        self.scheduler.arenas().hands().len()
    }

    /// Items on lanes plus items held by hands.
    pub fn item_count(&self) -> usize {
        let arenas = self.scheduler.arenas();
        let on_lanes: usize = arenas.lanes().par_iter().map(|lane| lane.lock().len()).sum();
        let carried = arenas
            .hands()
            .par_iter()
            .filter(|hand| hand.lock().carried().is_some())
            .count();
        on_lanes + carried
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    /// Rolling average wall time of a tick, in milliseconds.
    pub fn tick_time_ms(&self) -> f64 {
        self.timer.tick_time_ms()
    }

    pub fn tick_timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        self.scheduler.profiler()
    }

    pub fn events(&self) -> &Counter {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ObjectKind;

    fn column(x: f32, points: usize) -> Vec<Vec2> {
        (0..points).map(|i| Vec2::new(x, -(i as f32))).collect()
    }

    fn progresses(sim: &Simulation, lane: LaneHandle) -> Vec<f32> {
        sim.lane_items(lane)
            .unwrap()
            .iter()
            .map(|it| it.progress)
            .collect()
    }

    #[test]
    fn rejects_degenerate_lanes() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let err = sim.create_lane(vec![Vec2::ZERO]).unwrap_err();
        assert!(matches!(err, SimError::Lane(_)));
        assert_eq!(sim.lane_count(), 0);
    }

    #[test]
    fn hands_need_existing_lanes() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let a = sim.create_lane(column(0.0, 4)).unwrap();

        let mut other = Simulation::with_workers(1).unwrap();
        other.create_lane(column(0.0, 4)).unwrap();
        let stale = other.create_lane(column(2.0, 4)).unwrap();

        let err = sim
            .create_hand(Vec2::new(1.0, -2.0), a, 2.0, stale, 1.0)
            .unwrap_err();
        assert_eq!(err, SimError::UnknownLane(stale));
        assert_eq!(sim.hand_count(), 0);
    }

    #[test]
    fn rejects_non_finite_hand_progress() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let a = sim.create_lane(column(0.0, 4)).unwrap();
        let b = sim.create_lane(column(2.0, 4)).unwrap();

        let err = sim
            .create_hand(Vec2::new(1.0, -2.0), a, f32::NAN, b, 1.0)
            .unwrap_err();
        assert!(matches!(err, SimError::NonFiniteProgress { .. }));

        let err = sim
            .create_hand(Vec2::new(1.0, -2.0), a, 2.0, b, f32::INFINITY)
            .unwrap_err();
        assert_eq!(err, SimError::NonFiniteProgress { progress: f32::INFINITY });
        assert_eq!(sim.hand_count(), 0);
        let near = sim.query_region(&Aabb::new(Vec2::new(0.5, -2.5), Vec2::new(1.5, -1.5)));
        assert!(near.iter().all(|o| o.kind() == ObjectKind::Lane));
    }

    #[test]
    fn carried_item_follows_the_swing() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let a = sim.create_lane(column(0.0, 10)).unwrap();
        let b = sim.create_lane(column(2.0, 10)).unwrap();
        let hand = sim.create_hand(Vec2::new(1.0, -8.5), a, 8.5, b, 1.5).unwrap();
        assert_eq!(sim.carried_item_point(hand), Ok(None));

        assert!(sim.insert_item(a, 8.5).is_ok());
        sim.tick(0.0).unwrap();
        let start = sim.carried_item_point(hand).unwrap().unwrap();
        assert!((start - Vec2::new(0.2, -8.5)).length() < 1e-5);

        let mut other = Simulation::with_workers(1).unwrap();
        other.create_lane(column(0.0, 10)).unwrap();
        other.create_lane(column(2.0, 10)).unwrap();
        other.create_hand(Vec2::new(1.0, -8.5), a, 8.5, b, 1.5).unwrap();
        let stale = other.create_hand(Vec2::new(1.0, -4.5), a, 4.5, b, 1.5).unwrap();
        assert_eq!(sim.carried_item_point(stale), Err(SimError::UnknownHand(stale)));
    }

    #[test]
    fn items_advance_then_jam_at_the_end() {
        let mut sim = Simulation::with_workers(2).unwrap();
        let lane = sim.create_lane(column(0.0, 5)).unwrap();
        assert!(sim.spawn_item(lane, 1));

        sim.tick(0.5).unwrap();
        assert_eq!(progresses(&sim, lane), vec![1.5]);

        sim.tick(2.0).unwrap();
        assert_eq!(progresses(&sim, lane), vec![3.5]);
        assert_eq!(sim.stuck_count(lane), Some(0));

        let stats = sim.tick(0.5).unwrap();
        assert_eq!(stats.newly_stuck, 1);
        assert_eq!(sim.stuck_count(lane), Some(1));
        assert!((progresses(&sim, lane)[0] - 3.84).abs() < 1e-5);
    }

    #[test]
    fn hand_moves_item_between_lanes() {
        let mut sim = Simulation::with_workers(3).unwrap();
        let a = sim.create_lane(column(0.0, 10)).unwrap();
        let b = sim.create_lane(column(2.0, 10)).unwrap();
        let hand = sim.create_hand(Vec2::new(1.0, -8.5), a, 8.5, b, 1.5).unwrap();
        sim.insert_item(a, 8.5).unwrap();

        let mut delivered = false;
        for _ in 0..30 {
            if sim.tick(0.1).unwrap().delivered == 1 {
                delivered = true;
                break;
            }
        }

        assert!(delivered);
        assert_eq!(progresses(&sim, a), Vec::<f32>::new());
        assert_eq!(progresses(&sim, b), vec![1.5]);
        assert_eq!(sim.hand_state(hand), Some(HandState::Idle));
        assert_eq!(sim.item_count(), 1);
    }

    #[test]
    fn saturated_destination_holds_the_item() {
        let mut sim = Simulation::with_workers(2).unwrap();
        let a = sim.create_lane(column(0.0, 10)).unwrap();
        let b = sim.create_lane(column(2.0, 3)).unwrap();
        let hand = sim.create_hand(Vec2::new(1.0, -1.5), a, 8.5, b, 1.5).unwrap();

        for k in 0..6 {
            sim.insert_item(b, 0.19 + 0.33 * k as f32).unwrap();
        }
        sim.insert_item(a, 8.5).unwrap();

        for _ in 0..30 {
            sim.tick(0.1).unwrap();
        }
        assert_eq!(sim.stuck_count(b), Some(6));
        assert_eq!(
            sim.hand_state(hand),
            Some(HandState::Carrying { progress: 1.0 })
        );
        assert_eq!(sim.item_count(), 7);

        // Clear the destination and the held item goes through.
        for item in sim.lane_items(b).unwrap() {
            assert!(sim.remove_item(b, item.progress).is_some());
        }
        let stats = sim.tick(0.1).unwrap();
        assert_eq!(stats.delivered, 1);
        assert_eq!(progresses(&sim, b), vec![1.5]);
    }

    #[test]
    fn spawn_at_point_picks_nearby_waypoint() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let lane = sim.create_lane(column(0.0, 11)).unwrap();

        assert!(sim.spawn_item_at(Vec2::new(0.1, -3.2)));
        assert_eq!(progresses(&sim, lane), vec![3.0]);

        // Close to waypoint 5 but outside the lane bounds.
        assert!(!sim.spawn_item_at(Vec2::new(0.4, -5.0)));
        assert!(!sim.spawn_item_at(Vec2::new(50.0, -50.0)));
        assert_eq!(sim.item_count(), 1);
    }

    #[test]
    fn region_query_returns_lanes_and_hands() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let a = sim.create_lane(column(0.0, 5)).unwrap();
        let b = sim.create_lane(column(20.0, 5)).unwrap();
        let hand = sim.create_hand(Vec2::new(1.0, -2.0), a, 2.0, a, 3.0).unwrap();

        let near_a = sim.query_region(&Aabb::new(Vec2::new(-1.0, -3.0), Vec2::new(1.0, -1.0)));
        assert!(near_a.contains(&ObjectRef::Lane(a)));
        assert!(near_a.contains(&ObjectRef::Hand(hand)));
        assert!(!near_a.contains(&ObjectRef::Lane(b)));

        let lanes = near_a
            .iter()
            .filter(|o| o.kind() == ObjectKind::Lane)
            .count();
        assert_eq!(lanes, 1);
    }

    #[test]
    fn rejects_bad_steps() {
        let mut sim = Simulation::with_workers(1).unwrap();
        assert!(matches!(sim.tick(-0.1), Err(SimError::InvalidStep { .. })));
        assert!(matches!(sim.tick(f32::NAN), Err(SimError::InvalidStep { .. })));
        assert_eq!(sim.time().tick_count(), 0);

        sim.tick(0.0).unwrap();
        assert_eq!(sim.time().tick_count(), 1);
    }

    #[test]
    fn unknown_handles_read_as_none() {
        let mut sim = Simulation::with_workers(1).unwrap();
        let lane = sim.create_lane(column(0.0, 3)).unwrap();
        let hand = sim.create_hand(Vec2::ZERO, lane, 1.0, lane, 2.0).unwrap();

        let other = Simulation::with_workers(1).unwrap();
        assert_eq!(other.lane_items(lane), None);
        assert_eq!(other.hand_state(hand), None);
        assert!(sim.remove_item(lane, 1.0).is_none());
    }
}

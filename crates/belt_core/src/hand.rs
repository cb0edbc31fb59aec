//! Transfer hands
//!
//! A hand picks one item at a time off its source lane, swings it over for
//! one unit of progress, and drops it onto its destination lane. A full
//! destination keeps the hand holding the item, which in turn stops pickups
//! and lets the source lane jam.

use crate::error::InsertError;
use crate::handle::LaneHandle;
use crate::lane::{Item, Lane};
use crate::math::{Aabb, HasBounds, Vec2};
use parking_lot::Mutex;
use std::f32::consts::PI;

/// Default footprint of a hand in world units.
pub const HAND_SIZE: Vec2 = Vec2::new(2.0, 1.0);

/// Distance from the hand center to the item it carries.
const ARM_LENGTH: f32 = 0.8;

/// How a hand reaches the lanes it works between.
///
/// Implementations lock one lane per call; a hand never holds two lanes at once.
pub trait LaneAccess {
    fn remove_near(&self, lane: LaneHandle, progress: f32) -> Option<Item>;
    fn insert(&self, lane: LaneHandle, item: Item) -> Result<usize, InsertError>;
}

impl LaneAccess for [Mutex<Lane>] {
    fn remove_near(&self, lane: LaneHandle, progress: f32) -> Option<Item> {
        self.get(lane.index())?.lock().remove_near(progress)
    }

    fn insert(&self, lane: LaneHandle, item: Item) -> Result<usize, InsertError> {
        match self.get(lane.index()) {
            Some(slot) => slot.lock().insert(item),
            None => Err(InsertError::MissingLane { lane }),
        }
    }
}

/// Observable state of a hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandState {
    Idle,
    /// Carrying an item; `progress` is the completed fraction of the swing.
    Carrying { progress: f32 },
}

/// Outcome of a single [`Hand::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandEvent {
    /// Idle and nothing to pick up.
    Waiting,
    PickedUp,
    Moving,
    Delivered,
    /// Swing finished but the destination had no room.
    Blocked,
}

#[derive(Debug, Clone)]
pub struct Hand {
    position: Vec2,
    from: LaneHandle,
    from_progress: f32,
    to: LaneHandle,
    to_progress: f32,
    carried: Option<Item>,
    bounds: Aabb,
}

impl Hand {
    pub fn new(
        position: Vec2,
        from: LaneHandle,
        from_progress: f32,
        to: LaneHandle,
        to_progress: f32,
    ) -> Self {
        Self::with_size(position, from, from_progress, to, to_progress, HAND_SIZE)
    }

    pub fn with_size(
        position: Vec2,
        from: LaneHandle,
        from_progress: f32,
        to: LaneHandle,
        to_progress: f32,
        size: Vec2,
    ) -> Self {
        Self {
            position,
            from,
            from_progress,
            to,
            to_progress,
            carried: None,
            bounds: Aabb::from_center_size(position, size),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Lane the hand picks items from.
    #[inline]
    pub fn source(&self) -> LaneHandle {
        self.from
    }

    #[inline]
    pub fn source_progress(&self) -> f32 {
        self.from_progress
    }

    /// Lane the hand drops items onto.
    #[inline]
    pub fn destination(&self) -> LaneHandle {
        self.to
    }

    #[inline]
    pub fn destination_progress(&self) -> f32 {
        self.to_progress
    }

    #[inline]
    pub fn carried(&self) -> Option<Item> {
        self.carried
    }

    pub fn state(&self) -> HandState {
        match self.carried {
            None => HandState::Idle,
            Some(item) => HandState::Carrying {
                progress: item.progress,
            },
        }
    }

    /// Advance the transfer by `dt`.
    pub fn step<A: LaneAccess + ?Sized>(&mut self, dt: f32, lanes: &A) -> HandEvent {
        let Some(mut item) = self.carried else {
            return match lanes.remove_near(self.from, self.from_progress) {
                Some(_) => {
                    self.carried = Some(Item::new(0.0));
                    HandEvent::PickedUp
                }
                None => HandEvent::Waiting,
            };
        };

        let progress = item.progress + dt;
        if progress < 1.0 {
            item.progress = progress;
            self.carried = Some(item);
            return HandEvent::Moving;
        }

        match lanes.insert(self.to, Item::new(self.to_progress)) {
            Ok(_) => {
                self.carried = None;
                HandEvent::Delivered
            }
            Err(_) => {
                item.progress = 1.0;
                self.carried = Some(item);
                HandEvent::Blocked
            }
        }
    }

    /// World position of the carried item, swinging half a turn around the hand.
    pub fn carried_item_point(&self) -> Option<Vec2> {
        let item = self.carried?;
        let arm = Vec2::from_angle(item.progress * PI).rotate(Vec2::new(-ARM_LENGTH, 0.0));
        Some(self.position + arm)
    }
}

impl HasBounds for Hand {
    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes(count: usize, points: usize) -> Vec<Mutex<Lane>> {
        (0..count)
            .map(|x| {
                let waypoints = (0..points)
                    .map(|i| Vec2::new(2.0 * x as f32, -(i as f32)))
                    .collect();
                Mutex::new(Lane::new(waypoints).unwrap())
            })
            .collect()
    }

    fn hand() -> Hand {
        Hand::new(
            Vec2::new(1.0, -8.5),
            LaneHandle::new(0),
            8.5,
            LaneHandle::new(1),
            1.5,
        )
    }

    #[test]
    fn inserting_into_a_missing_lane_names_it() {
        let lanes = lanes(1, 10);
        let missing = LaneHandle::new(5);
        assert_eq!(
            LaneAccess::insert(lanes.as_slice(), missing, Item::new(1.0)),
            Err(InsertError::MissingLane { lane: missing })
        );
        assert!(lanes[0].lock().is_empty());
    }

    #[test]
    fn idle_hand_waits_for_items() {
        let lanes = lanes(2, 10);
        let mut hand = hand();
        assert_eq!(hand.step(0.1, lanes.as_slice()), HandEvent::Waiting);
        assert_eq!(hand.state(), HandState::Idle);
    }

    #[test]
    fn transfers_item_between_lanes() {
        let lanes = lanes(2, 10);
        lanes[0].lock().insert(Item::new(8.5)).unwrap();
        let mut hand = hand();

        assert_eq!(hand.step(0.25, lanes.as_slice()), HandEvent::PickedUp);
        assert_eq!(hand.state(), HandState::Carrying { progress: 0.0 });
        assert!(lanes[0].lock().is_empty());

        for _ in 0..3 {
            assert_eq!(hand.step(0.25, lanes.as_slice()), HandEvent::Moving);
        }
        assert_eq!(hand.step(0.25, lanes.as_slice()), HandEvent::Delivered);
        assert_eq!(hand.state(), HandState::Idle);

        let dest = lanes[1].lock();
        assert_eq!(dest.len(), 1);
        assert_eq!(dest.items()[0].progress, 1.5);
    }

    #[test]
    fn blocked_hand_keeps_item_pinned() {
        let lanes = lanes(2, 10);
        lanes[0].lock().insert(Item::new(8.5)).unwrap();
        {
            let mut dest = lanes[1].lock();
            dest.insert(Item::new(1.3)).unwrap();
            dest.insert(Item::new(1.7)).unwrap();
        }
        let mut hand = hand();
        hand.step(0.5, lanes.as_slice());
        hand.step(0.5, lanes.as_slice());

        for _ in 0..5 {
            assert_eq!(hand.step(0.5, lanes.as_slice()), HandEvent::Blocked);
            assert_eq!(hand.state(), HandState::Carrying { progress: 1.0 });
        }
        assert_eq!(lanes[1].lock().len(), 2);

        // Room frees up, the retry succeeds.
        lanes[1].lock().remove_near(1.7).unwrap();
        assert_eq!(hand.step(0.5, lanes.as_slice()), HandEvent::Delivered);
        assert_eq!(lanes[1].lock().len(), 2);
    }

    #[test]
    fn carried_item_swings_around_center() {
        let lanes = lanes(2, 10);
        lanes[0].lock().insert(Item::new(8.5)).unwrap();
        let mut hand = hand();
        assert!(hand.carried_item_point().is_none());

        hand.step(0.5, lanes.as_slice());
        let start = hand.carried_item_point().unwrap();
        assert!((start - Vec2::new(0.2, -8.5)).length() < 1e-5);

        hand.step(0.5, lanes.as_slice());
        let half = hand.carried_item_point().unwrap();
        assert!((half - Vec2::new(1.0, -9.3)).length() < 1e-5);
    }

    #[test]
    fn bounds_are_centered() {
        let hand = hand();
        let bounds = hand.bounds();
        assert_eq!(bounds.center(), Vec2::new(1.0, -8.5));
        assert_eq!(bounds.size(), HAND_SIZE);
    }
}

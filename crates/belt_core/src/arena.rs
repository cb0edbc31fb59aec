//! Storage for every lane and hand of a session.
//!
//! Slots are never freed, so handles stay valid for the arena's lifetime.
//! Each slot has its own lock: packs are disjoint by index, but a hand may
//! touch lanes that belong to another worker's pack.

use crate::hand::Hand;
use crate::handle::{HandHandle, LaneHandle};
use crate::lane::Lane;
use parking_lot::Mutex;

#[derive(Default)]
pub struct Arenas {
    lanes: Vec<Mutex<Lane>>,
    hands: Vec<Mutex<Hand>>,
}

impl Arenas {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lanes(&self) -> &[Mutex<Lane>] {
        &self.lanes
    }

    #[inline]
    pub fn hands(&self) -> &[Mutex<Hand>] {
        &self.hands
    }

    pub fn lane(&self, handle: LaneHandle) -> Option<&Mutex<Lane>> {
        self.lanes.get(handle.index())
    }

    pub fn hand(&self, handle: HandHandle) -> Option<&Mutex<Hand>> {
        self.hands.get(handle.index())
    }

    pub(crate) fn push_lane(&mut self, lane: Lane) -> LaneHandle {
        self.lanes.push(Mutex::new(lane));
        LaneHandle::new(self.lanes.len() - 1)
    }

    pub(crate) fn push_hand(&mut self, hand: Hand) -> HandHandle {
        self.hands.push(Mutex::new(hand));
        HandHandle::new(self.hands.len() - 1)
    }
}

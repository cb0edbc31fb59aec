//! Stable handles into the simulation arenas
//!
//! Lanes and hands live for the whole session, so a handle is a plain
//! index with no generation counter.

use std::fmt;

/// Handle to a lane owned by a [`Simulation`](crate::Simulation).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneHandle(u32);

impl LaneHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Return the raw index backing this handle.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LaneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane#{}", self.0)
    }
}

/// Handle to a hand owned by a [`Simulation`](crate::Simulation).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandHandle(u32);

impl HandHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hand#{}", self.0)
    }
}

/// Discriminator for objects registered in the spatial index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Lane,
    Hand,
}

/// Reference to either kind of world object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Lane(LaneHandle),
    Hand(HandHandle),
}

impl ObjectRef {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectRef::Lane(_) => ObjectKind::Lane,
            ObjectRef::Hand(_) => ObjectKind::Hand,
        }
    }

    pub fn as_lane(&self) -> Option<LaneHandle> {
        match *self {
            ObjectRef::Lane(lane) => Some(lane),
            ObjectRef::Hand(_) => None,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Lane(lane) => lane.fmt(f),
            ObjectRef::Hand(hand) => hand.fmt(f),
        }
    }
}

//! Belt lanes
//!
//! A lane is a polyline of waypoints carrying an ordered queue of items.
//! Each item is identified only by its *progress*: the integer part selects
//! the polyline segment, the fractional part interpolates inside it.
//!
//! Items that reach the end of the lane pile up into a contiguous *stuck*
//! suffix. Stuck items are skipped by [`Lane::advance`] until a hand removes
//! one of them.

use crate::error::{InsertError, LaneError};
use crate::math::{Aabb, HasBounds, Vec2};
use serde::{Deserialize, Serialize};

/// Padding added to the waypoint bounding box (total, per axis).
pub const BOUNDS_PADDING: f32 = 0.5;

/// Tolerance used when checking spacing after float arithmetic.
const SPACING_EPSILON: f32 = 1e-3;

/// Tunable spacing constants shared by every lane of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTuning {
    /// Minimum progress distance between two neighbouring items.
    pub item_spacing: f32,
    /// Slack kept free at both ends of the lane.
    pub end_margin: f32,
    /// Maximum distance for [`Lane::remove_near`] to match an item.
    pub pickup_tolerance: f32,
    /// Distance from the end past which an advancing item jams.
    pub stuck_threshold: f32,
    /// Distance from the end where the first jammed item comes to rest.
    pub stuck_rest: f32,
}

impl LaneTuning {
    pub const DEFAULT: LaneTuning = LaneTuning {
        item_spacing: 0.33,
        end_margin: 0.17,
        pickup_tolerance: 0.17,
        stuck_threshold: 1.176,
        stuck_rest: 1.16,
    };
}

impl Default for LaneTuning {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A single item riding on a lane (or carried by a hand).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub progress: f32,
}

impl Item {
    #[inline]
    pub const fn new(progress: f32) -> Self {
        Self { progress }
    }
}

/// One conveyor lane.
#[derive(Debug, Clone)]
pub struct Lane {
    waypoints: Vec<Vec2>,
    items: Vec<Item>,
    stuck_count: usize,
    bounds: Aabb,
    tuning: LaneTuning,
}

impl Lane {
    /// Create a lane with the default tuning.
    pub fn new(waypoints: Vec<Vec2>) -> Result<Self, LaneError> {
        Self::with_tuning(waypoints, LaneTuning::DEFAULT)
    }

    pub fn with_tuning(waypoints: Vec<Vec2>, tuning: LaneTuning) -> Result<Self, LaneError> {
        if waypoints.len() < 2 {
            return Err(LaneError::Degenerate {
                waypoints: waypoints.len(),
            });
        }
        if let Some(index) = waypoints.iter().position(|p| !p.is_finite()) {
            return Err(LaneError::NonFiniteWaypoint { index });
        }

        let bounds = Aabb::from_points(&waypoints)
            .ok_or(LaneError::Degenerate { waypoints: 0 })?
            .expanded(BOUNDS_PADDING);

        Ok(Self {
            waypoints,
            items: Vec::new(),
            stuck_count: 0,
            bounds,
            tuning,
        })
    }

    #[inline]
    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    /// Items sorted ascending by progress.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items at the tail that are jammed against the lane end.
    #[inline]
    pub fn stuck_count(&self) -> usize {
        self.stuck_count
    }

    #[inline]
    pub fn tuning(&self) -> &LaneTuning {
        &self.tuning
    }

    /// Total progress span of the lane (the waypoint count).
    #[inline]
    pub fn span(&self) -> f32 {
        self.waypoints.len() as f32
    }

    /// Insert an item, clamping its progress into the free gap it falls in.
    ///
    /// Returns the index the item landed at. On failure the lane is unchanged.
    pub fn insert(&mut self, mut item: Item) -> Result<usize, InsertError> {
        if !item.progress.is_finite() {
            return Err(InsertError::NotFinite);
        }

        let spacing = self.tuning.item_spacing;
        // Ties go after existing equal entries.
        let index = self.items.partition_point(|it| it.progress <= item.progress);

        let lower = match index {
            0 => self.tuning.end_margin,
            _ => self.items[index - 1].progress + spacing,
        };
        let upper = match self.items.get(index) {
            Some(next) => next.progress - spacing,
            None => self.span() - self.tuning.end_margin,
        };

        if upper < lower {
            return Err(InsertError::NoRoom {
                progress: item.progress,
            });
        }

        item.progress = item.progress.clamp(lower, upper);

        // Landing behind the first stuck item means being jammed with them.
        let first_stuck = self.items.len() - self.stuck_count;
        if self.stuck_count > 0 && index > first_stuck {
            self.stuck_count += 1;
        }

        self.items.insert(index, item);
        debug_assert!(self.is_consistent(), "lane invariants broken by insert");
        Ok(index)
    }

    /// Remove the item closest to `target` if it lies within the pickup tolerance.
    pub fn remove_near(&mut self, target: f32) -> Option<Item> {
        let index = self.items.partition_point(|it| it.progress <= target);
        let tolerance = self.tuning.pickup_tolerance;

        //  ... |  index - 1  |    index    | ...
        //  ... | p <= target | p > target  | ...
        if index > 0 && (self.items[index - 1].progress - target).abs() < tolerance {
            return Some(self.remove_at(index - 1));
        }
        if index < self.items.len() && (self.items[index].progress - target).abs() < tolerance {
            return Some(self.remove_at(index));
        }
        None
    }

    fn remove_at(&mut self, index: usize) -> Item {
        let from_end = self.items.len() - 1 - index;
        if from_end < self.stuck_count {
            self.stuck_count = from_end;
        }
        self.items.remove(index)
    }

    /// Move every non-stuck item forward by `dt`.
    ///
    /// An item that crosses the end threshold is parked at the next free rest
    /// slot and joins the stuck suffix. Returns how many items became stuck.
    pub fn advance(&mut self, dt: f32) -> usize {
        let span = self.span();
        let LaneTuning {
            item_spacing,
            stuck_threshold,
            stuck_rest,
            ..
        } = self.tuning;
        let before = self.stuck_count;

        // Tail first, so the item that jams is always the last free one.
        let free = self.items.len() - self.stuck_count;
        for item in self.items[..free].iter_mut().rev() {
            let stacked = self.stuck_count as f32 * item_spacing;
            let progress = item.progress + dt;
            if progress > span - stuck_threshold - stacked {
                // Jammed items sit on fixed rest slots, even one that was
                // placed beyond its slot.
                item.progress = span - stuck_rest - stacked;
                self.stuck_count += 1;
            } else {
                item.progress = progress;
            }
        }

        self.stuck_count - before
    }

    /// World position of a progress value along the waypoint polyline.
    pub fn point_at(&self, progress: f32) -> Vec2 {
        let last_segment = self.waypoints.len() - 2;
        let segment = (progress.max(0.0) as usize).min(last_segment);
        let t = progress - segment as f32;
        self.waypoints[segment].lerp(self.waypoints[segment + 1], t)
    }

    /// World positions of every item, in lane order.
    pub fn item_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.items.iter().map(|item| self.point_at(item.progress))
    }

    /// Index of the first waypoint whose squared distance to `point` is below `max_dist_sq`.
    pub fn nearest_waypoint(&self, point: Vec2, max_dist_sq: f32) -> Option<usize> {
        self.waypoints
            .iter()
            .position(|wp| wp.distance_squared(point) < max_dist_sq)
    }

    /// Check ordering, spacing and stuck bookkeeping.
    pub fn is_consistent(&self) -> bool {
        let spaced = self.items.windows(2).all(|pair| {
            pair[1].progress - pair[0].progress >= self.tuning.item_spacing - SPACING_EPSILON
        });
        spaced && self.stuck_count <= self.items.len()
    }
}

impl HasBounds for Lane {
    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

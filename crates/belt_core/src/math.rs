//! Planar math utilities
//!
//! Re-exports glam and adds the axis-aligned boxes used for culling

pub use glam::*;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world units.
///
/// Intersection and containment are inclusive on every edge, so two boxes
/// that merely touch still intersect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing every point. Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for point in rest {
            bounds.encapsulate(*point);
        }
        Some(bounds)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Half of the size.
    #[inline]
    pub fn extents(&self) -> Vec2 {
        self.size() * 0.5
    }

    pub fn encapsulate(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box by `amount` in total along each axis (half on each side).
    pub fn expanded(self, amount: f32) -> Self {
        let half = Vec2::splat(amount * 0.5);
        Self {
            min: self.min - half,
            max: self.max + half,
        }
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Split at the center into `[north_east, north_west, south_east, south_west]`.
    ///
    /// North is +y, east is +x.
    pub fn quadrants(&self) -> [Aabb; 4] {
        let c = self.center();
        [
            Aabb::new(c, self.max),
            Aabb::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Aabb::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Aabb::new(self.min, c),
        ]
    }
}

/// Anything that occupies a fixed region of the world.
pub trait HasBounds {
    fn bounds(&self) -> Aabb;
}

impl HasBounds for Aabb {
    fn bounds(&self) -> Aabb {
        *self
    }
}

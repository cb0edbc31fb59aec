//! Quadtree spatial index for region queries.
//!
//! Objects are registered by their bounds alone. A leaf holds up to
//! `capacity` objects; on overflow it splits into four equal quadrants and
//! pushes its members down. Splits are never undone. An object whose bounds
//! straddle a split line is stored in every quadrant it touches, so queries
//! deduplicate their results.

use crate::math::{Aabb, HasBounds, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Configuration for the quadtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTreeConfig {
    /// Objects a leaf can hold before it splits.
    pub capacity: usize,
    /// Leaves at this depth keep growing instead of splitting.
    pub max_depth: u32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            max_depth: 16,
        }
    }
}

struct Node<T> {
    region: Aabb,
    depth: u32,
    objects: Vec<T>,
    // North-east, north-west, south-east, south-west.
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: HasBounds + Clone + PartialEq> Node<T> {
    fn new(region: Aabb, depth: u32) -> Self {
        Self {
            region,
            depth,
            objects: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, object: T, bounds: &Aabb, config: &QuadTreeConfig) -> bool {
        if !self.region.intersects(bounds) {
            return false;
        }

        if self.children.is_none() {
            if self.objects.len() < config.capacity || self.depth >= config.max_depth {
                self.objects.push(object);
                return true;
            }
            self.subdivide(config);
        }

        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.insert(object.clone(), bounds, config);
            }
        }
        true
    }

    fn subdivide(&mut self, config: &QuadTreeConfig) {
        let depth = self.depth + 1;
        let [ne, nw, se, sw] = self.region.quadrants();
        let mut children = Box::new([
            Node::new(ne, depth),
            Node::new(nw, depth),
            Node::new(se, depth),
            Node::new(sw, depth),
        ]);

        for object in std::mem::take(&mut self.objects) {
            let bounds = object.bounds();
            for child in children.iter_mut() {
                child.insert(object.clone(), &bounds, config);
            }
        }

        self.children = Some(children);
    }

    fn remove(&mut self, object: &T, bounds: &Aabb) -> bool {
        if !self.region.intersects(bounds) {
            return false;
        }

        let before = self.objects.len();
        self.objects.retain(|o| o != object);
        let mut removed = self.objects.len() != before;

        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                removed |= child.remove(object, bounds);
            }
        }
        removed
    }

    fn visit<F>(&self, region: &Aabb, f: &mut F)
    where
        F: FnMut(&Aabb, &[T]),
    {
        if !self.region.intersects(region) {
            return;
        }
        match self.children.as_deref() {
            Some(children) => {
                for child in children {
                    child.visit(region, f);
                }
            }
            None => f(&self.region, &self.objects),
        }
    }

    fn max_depth(&self) -> u32 {
        match self.children.as_deref() {
            Some(children) => children.iter().map(Node::max_depth).max().unwrap_or(self.depth),
            None => self.depth,
        }
    }

    fn leaf_count(&self) -> usize {
        match self.children.as_deref() {
            Some(children) => children.iter().map(Node::leaf_count).sum(),
            None => 1,
        }
    }
}

/// Region quadtree over any object with bounds.
pub struct QuadTree<T> {
    root: Node<T>,
    config: QuadTreeConfig,
    len: usize,
}

impl<T: HasBounds + Clone + Eq + Hash> QuadTree<T> {
    /// Create an empty tree covering `region`.
    pub fn new(region: Aabb) -> Self {
        Self::with_config(region, QuadTreeConfig::default())
    }

    pub fn with_config(region: Aabb, config: QuadTreeConfig) -> Self {
        let config = QuadTreeConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            root: Node::new(region, 0),
            config,
            len: 0,
        }
    }

    /// Region covered by the root node.
    pub fn region(&self) -> Aabb {
        self.root.region
    }

    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// Register an object. Returns `false` if it lies entirely outside the tree.
    pub fn insert(&mut self, object: T) -> bool {
        let bounds = object.bounds();
        let inserted = self.root.insert(object, &bounds, &self.config);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Unregister an object from every leaf holding it.
    ///
    /// Returns `true` if it was found in at least one leaf.
    pub fn remove(&mut self, object: &T) -> bool {
        let bounds = object.bounds();
        let removed = self.root.remove(object, &bounds);
        if removed {
            self.len = self.len.saturating_sub(1);
        }
        removed
    }

    /// Objects whose bounds intersect `region`, each reported once.
    pub fn query(&self, region: &Aabb) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut collect = |_: &Aabb, objects: &[T]| {
            for object in objects {
                if object.bounds().intersects(region) && seen.insert(object.clone()) {
                    found.push(object.clone());
                }
            }
        };
        self.root.visit(region, &mut collect);
        found
    }

    /// Objects whose bounds contain `point`.
    pub fn query_point(&self, point: Vec2) -> Vec<T> {
        self.query(&Aabb::new(point, point))
    }

    /// Call `f` with the region and members of every leaf touching `region`.
    ///
    /// Members may repeat across leaves.
    pub fn visit_leaves<F>(&self, region: &Aabb, mut f: F)
    where
        F: FnMut(&Aabb, &[T]),
    {
        self.root.visit(region, &mut f);
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Depth of the deepest leaf (0 for an unsplit root).
    pub fn depth(&self) -> u32 {
        self.root.max_depth()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }
}

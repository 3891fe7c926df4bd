//! Path & Motion Model
//!
//! A planned path is an ordered list of points with axis-aligned bounds.
//! Each step the mover consumes up to `speed * delta` of travel from the
//! front of the path; the consumed part becomes that step's motion path,
//! which is what swept collision runs against.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of a point set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Bounds of a single point.
    pub fn point(p: Vec2) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include `p`.
    pub fn include(self, p: Vec2) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// Check if `p` lies on any edge of the bounds.
    pub fn on_edge(&self, p: Vec2) -> bool {
        p.x == self.min.x || p.x == self.max.x || p.y == self.min.y || p.y == self.max.y
    }
}

/// Ordered points with exact bounds.
///
/// Bounds are `None` exactly when the path is empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Vec2>,
    bounds: Option<Bounds>,
}

impl Path {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from points in travel order.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut path = Self::new();
        for point in points {
            path.add(point);
        }
        path
    }

    /// Append a point.
    pub fn add(&mut self, point: Vec2) {
        self.points.push(point);
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.include(point),
            None => Bounds::point(point),
        });
    }

    /// Remove and return the first point.
    ///
    /// Bounds are recomputed only if the removed point lay on an edge;
    /// otherwise the remaining points still span the same box.
    pub fn remove_first(&mut self) -> Option<Vec2> {
        if self.points.is_empty() {
            return None;
        }
        let removed = self.points.remove(0);
        if self.bounds.is_some_and(|bounds| bounds.on_edge(removed)) {
            self.recompute_bounds();
        }
        Some(removed)
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.points.clear();
        self.bounds = None;
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self
            .points
            .iter()
            .fold(None, |bounds: Option<Bounds>, &p| {
                Some(bounds.map_or(Bounds::point(p), |b| b.include(p)))
            });
    }

    /// Points in travel order.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Current bounds.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last point, if any.
    pub fn last(&self) -> Option<Vec2> {
        self.points.last().copied()
    }

    /// Consume up to `travel` distance from the front of the path.
    ///
    /// Points reached within `travel` are removed from `self` and copied to
    /// the returned motion path. If travel runs out between two points, the
    /// partial position is appended to the motion path and the unreached
    /// point stays planned.
    pub fn take_motion_path(&mut self, start: Vec2, travel: f32) -> Path {
        let mut motion = Path::new();
        let mut last = start;
        let mut remaining = travel;

        while let Some(&next) = self.points.first() {
            let diff = next - last;
            let distance = diff.length();
            if distance > remaining {
                motion.add(last + diff / distance * remaining);
                break;
            }
            self.remove_first();
            motion.add(next);
            remaining -= distance;
            last = next;
            if remaining <= 0.0 {
                break;
            }
        }
        motion
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Geometry Utilities
//!
//! Pure 2D vector math used by movement and collision code.
//! No owned state; every function is a plain transformation of its inputs.
//!
//! ## Angle Convention
//!
//! Facing angles are in degrees and follow the renderer's Y-up rotation,
//! which turns clockwise when seen from above. `direction_to_angle` therefore
//! flips the Y sign before `atan2`, and `facing_to_direction` is its inverse.

use glam::Vec2;
use serde::{Deserialize, Serialize};

// =============================================================================
// ANGLES
// =============================================================================

/// Convert a direction to a facing angle in degrees.
///
/// Screen-space Y is flipped: `(0, 1)` maps to `-90`.
#[inline]
pub fn direction_to_angle(direction: Vec2) -> f32 {
    (-direction.y).atan2(direction.x).to_degrees()
}

/// Convert a facing angle back to the direction it was derived from.
///
/// Inverse of [`direction_to_angle`] for unit vectors.
#[inline]
pub fn facing_to_direction(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), -radians.sin())
}

/// Shortest signed difference `target - current`, wrapped to `(-180, 180]`.
#[inline]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Move `current` towards `target` by at most `max_delta` degrees,
/// taking the short way around. Never overshoots.
pub fn move_towards_angle(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = delta_angle(current, target);
    if -max_delta < delta && delta < max_delta {
        return target;
    }
    let unwrapped_target = current + delta;
    if (unwrapped_target - current).abs() <= max_delta {
        return unwrapped_target;
    }
    current + (unwrapped_target - current).signum() * max_delta
}

// =============================================================================
// VECTORS
// =============================================================================

/// Rotate 90 degrees counter-clockwise: `(-y, x)`.
#[inline]
pub fn perpendicular(direction: Vec2) -> Vec2 {
    Vec2::new(-direction.y, direction.x)
}

/// Offset a point in the local frame of `direction`.
///
/// `offset.y` moves along `direction`, `offset.x` along its perpendicular.
#[inline]
pub fn offset_position(origin: Vec2, direction: Vec2, offset: Vec2) -> Vec2 {
    origin + direction * offset.y + perpendicular(direction) * offset.x
}

/// Express a local direction in the frame of `direction`, normalized.
#[inline]
pub fn offset_direction(direction: Vec2, amount: Vec2) -> Vec2 {
    (direction * amount.y + perpendicular(direction) * amount.x).normalize_or_zero()
}

// =============================================================================
// SEGMENTS & CIRCLES
// =============================================================================

/// Closest point on a segment, with the distance along the segment to it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentPoint {
    /// Closest point on the segment
    pub position: Vec2,
    /// Distance from the segment start, clamped to `[0, length]`
    pub projection: f32,
}

/// Project `point` onto the segment `start..end`.
///
/// A zero-length segment returns `start` with projection 0.
pub fn closest_point_on_segment(start: Vec2, end: Vec2, point: Vec2) -> SegmentPoint {
    let diff = end - start;
    let length = diff.length();
    if length == 0.0 {
        return SegmentPoint {
            position: start,
            projection: 0.0,
        };
    }
    let direction = diff / length;
    let projection = (point - start).dot(direction).clamp(0.0, length);
    SegmentPoint {
        position: start + direction * projection,
        projection,
    }
}

/// Check if two circles overlap (touching counts).
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> bool {
    pos_a.distance(pos_b) <= radius_a + radius_b
}

// =============================================================================
// TESTS
// =============================================================================

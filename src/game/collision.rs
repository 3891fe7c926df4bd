//! Collision Detection
//!
//! Deterministic entity-vs-hit-collider detection and resolution.
//!
//! Two detection modes:
//! - point: circle-vs-circle at a fixed position
//! - swept: closest point on each motion segment to every sub-collider
//!
//! Resolution snaps the entity to the nearest contact and keeps only the
//! other hits whose collider still overlaps the snapped position.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::geometry::{circles_overlap, closest_point_on_segment, direction_to_angle};
use crate::game::collider::{ColliderRef, HitCollider, SubCollider, TeamColliders};
use crate::game::entity::EntityId;

/// A registered hit between an entity and one collider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCollisionResult {
    /// Collider that registered the hit
    pub collider: ColliderRef,
    /// Position of the struck sub-collider
    pub position: Vec2,
    /// Health removed
    pub damage: i32,
    /// Knockback speed
    pub knockback: f32,
    /// Knockback direction
    pub knockback_direction: Vec2,
    /// Effect ids of the collider
    pub effects: Vec<String>,
    /// Stun frames
    pub stun: u32,
    /// Entity position at contact
    pub entity_position: Vec2,
    /// Entity facing at contact
    pub entity_facing: f32,
    /// Distance traveled along the motion before contact
    pub traveled_distance: f32,
}

impl PathCollisionResult {
    fn from_sub(at: ColliderRef, collider: &HitCollider, sub: &SubCollider) -> Self {
        Self {
            collider: at,
            position: sub.position,
            damage: sub.damage,
            knockback: sub.knockback,
            knockback_direction: sub.knockback_direction,
            effects: collider.effects.clone(),
            stun: collider.stun,
            ..Self::default()
        }
    }
}

/// How the entity moves this step.
#[derive(Clone, Copy, Debug)]
pub enum Motion<'a> {
    /// Stationary at a position
    Point(Vec2),
    /// Walking the segments `start -> points[0] -> points[1] ...`
    Path {
        /// Position before moving
        start: Vec2,
        /// Motion path points
        points: &'a [Vec2],
    },
}

impl Motion<'_> {
    /// Final position if nothing is hit.
    pub fn end(&self) -> Vec2 {
        match *self {
            Motion::Point(position) => position,
            Motion::Path { start, points } => points.last().copied().unwrap_or(start),
        }
    }
}

/// Check if an entity circle overlaps any sub-collider.
pub fn does_entity_collide(position: Vec2, radius: f32, collider: &HitCollider) -> bool {
    collider
        .shapes
        .iter()
        .any(|sub| circles_overlap(position, radius, sub.position, sub.radius))
}

/// Point collision: the colliding sub-collider with the closest center wins.
pub fn point_collision(
    at: ColliderRef,
    position: Vec2,
    radius: f32,
    facing: f32,
    collider: &HitCollider,
) -> Option<PathCollisionResult> {
    let mut closest: Option<(f32, &SubCollider)> = None;
    for sub in &collider.shapes {
        let distance = position.distance(sub.position);
        if distance <= sub.radius + radius && closest.map_or(true, |(best, _)| distance < best) {
            closest = Some((distance, sub));
        }
    }

    closest.map(|(_, sub)| PathCollisionResult {
        entity_position: position,
        entity_facing: facing,
        ..PathCollisionResult::from_sub(at, collider, sub)
    })
}

/// Swept collision along one segment.
///
/// The sub-collider whose center is nearest the segment wins. The contact
/// is the closest point on the segment to that center, and the traveled
/// distance is its projection along the segment.
pub fn segment_collision(
    at: ColliderRef,
    start: Vec2,
    end: Vec2,
    radius: f32,
    collider: &HitCollider,
) -> Option<PathCollisionResult> {
    let mut closest = None;
    let mut shortest = f32::INFINITY;
    for sub in &collider.shapes {
        let contact = closest_point_on_segment(start, end, sub.position);
        let distance = sub.position.distance(contact.position);
        if distance <= sub.radius + radius && distance < shortest {
            shortest = distance;
            closest = Some((contact, sub));
        }
    }

    closest.map(|(contact, sub)| PathCollisionResult {
        entity_position: contact.position,
        entity_facing: direction_to_angle(end - start),
        traveled_distance: contact.projection,
        ..PathCollisionResult::from_sub(at, collider, sub)
    })
}

/// Swept collision along a whole motion path.
///
/// The first segment with a hit ends the search. Traveled distance is
/// cumulative from `start`.
pub fn path_collision(
    at: ColliderRef,
    start: Vec2,
    points: &[Vec2],
    radius: f32,
    collider: &HitCollider,
) -> Option<PathCollisionResult> {
    let mut last = start;
    let mut traveled = 0.0;
    for &next in points {
        if let Some(mut hit) = segment_collision(at, last, next, radius, collider) {
            hit.traveled_distance += traveled;
            return Some(hit);
        }
        traveled += last.distance(next);
        last = next;
    }
    None
}

/// Run one collider against a motion.
pub fn motion_collision(
    at: ColliderRef,
    motion: Motion<'_>,
    radius: f32,
    facing: f32,
    collider: &HitCollider,
) -> Option<PathCollisionResult> {
    match motion {
        Motion::Point(position) => point_collision(at, position, radius, facing, collider),
        Motion::Path { start, points } => path_collision(at, start, points, radius, collider),
    }
}

/// Collect hits against the given colliders.
///
/// Colliders that already struck `entity` are skipped; every collider that
/// registers a hit marks `entity` as struck, whether or not the hit
/// survives resolution.
pub fn gather_candidates(
    entity: EntityId,
    motion: Motion<'_>,
    radius: f32,
    facing: f32,
    colliders: &mut TeamColliders,
    hostile: &[ColliderRef],
) -> Vec<PathCollisionResult> {
    let mut candidates = Vec::new();
    for &at in hostile {
        let Some(collider) = colliders.get_mut(at) else {
            continue;
        };
        if collider.has_struck(entity) {
            continue;
        }
        if let Some(hit) = motion_collision(at, motion, radius, facing, collider) {
            collider.mark_struck(entity);
            candidates.push(hit);
        }
    }
    candidates
}

/// Outcome of resolving one entity's candidate hits.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionResolution {
    /// Position the entity is snapped to
    pub position: Vec2,
    /// Hits to apply, the nearest one last
    pub hits: Vec<PathCollisionResult>,
}

/// Resolve candidate hits into a snap position and the hits that apply.
///
/// Candidates are ordered by traveled distance (stable, so equal distances
/// keep collider order). The nearest wins positioning; each other candidate
/// applies only if its own collider still overlaps the snapped position.
pub fn resolve_collisions(
    mut candidates: Vec<PathCollisionResult>,
    radius: f32,
    colliders: &TeamColliders,
) -> Option<CollisionResolution> {
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| a.traveled_distance.total_cmp(&b.traveled_distance));

    let nearest = candidates.remove(0);
    let position = nearest.entity_position;

    let mut hits: Vec<PathCollisionResult> = candidates
        .into_iter()
        .filter(|hit| {
            colliders
                .get(hit.collider)
                .is_some_and(|collider| does_entity_collide(position, radius, collider))
        })
        .collect();
    hits.push(nearest);

    Some(CollisionResolution { position, hits })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::game::collider::Hostility;

    fn sub(position: Vec2, radius: f32, damage: i32) -> SubCollider {
        SubCollider {
            position,
            radius,
            knockback: 2.0,
            damage,
            knockback_direction: Vec2::X,
        }
    }

    fn collider(shapes: Vec<SubCollider>, stun: u32) -> HitCollider {
        HitCollider {
            duration: 10,
            shapes,
            effects: vec!["burn".into()],
            stun,
            team: 1,
            struck: BTreeSet::new(),
        }
    }

    fn container(colliders: Vec<HitCollider>) -> TeamColliders {
        let mut container = TeamColliders::new();
        for collider in colliders {
            container.add(collider);
        }
        container
    }

    fn hostile(colliders: &TeamColliders) -> Vec<ColliderRef> {
        colliders.hostile_to(0, &Hostility::new())
    }

    #[test]
    fn test_point_collision_picks_closest_center() {
        let hit = collider(
            vec![sub(Vec2::new(1.0, 0.0), 1.0, 1), sub(Vec2::new(0.5, 0.0), 1.0, 2)],
            0,
        );
        let result = point_collision(ColliderRef::default(), Vec2::ZERO, 0.5, 30.0, &hit).unwrap();
        assert_eq!(result.damage, 2);
        assert_eq!(result.entity_position, Vec2::ZERO);
        assert_eq!(result.entity_facing, 30.0);
        assert_eq!(result.traveled_distance, 0.0);
        assert_eq!(result.effects, vec!["burn".to_string()]);
    }

    #[test]
    fn test_point_collision_touching_counts() {
        let hit = collider(vec![sub(Vec2::new(1.0, 0.0), 0.5, 1)], 0);
        assert!(point_collision(ColliderRef::default(), Vec2::ZERO, 0.5, 0.0, &hit).is_some());
        assert!(point_collision(ColliderRef::default(), Vec2::new(-0.1, 0.0), 0.5, 0.0, &hit).is_none());
    }

    #[test]
    fn test_segment_collision_contact_point() {
        // Entity walks (0,0) -> (0.5,0); collider at (1,0) r 0.5
        let hit = collider(vec![sub(Vec2::new(1.0, 0.0), 0.5, 5)], 0);
        let result = segment_collision(
            ColliderRef::default(),
            Vec2::ZERO,
            Vec2::new(0.5, 0.0),
            0.5,
            &hit,
        )
        .unwrap();
        assert_eq!(result.entity_position, Vec2::new(0.5, 0.0));
        assert_eq!(result.entity_facing, 0.0);
        assert_eq!(result.traveled_distance, 0.5);
        assert_eq!(result.damage, 5);
    }

    #[test]
    fn test_segment_collision_nearest_sub_wins() {
        let hit = collider(
            vec![sub(Vec2::new(2.0, 0.9), 1.0, 1), sub(Vec2::new(4.0, 0.2), 1.0, 2)],
            0,
        );
        let result =
            segment_collision(ColliderRef::default(), Vec2::ZERO, Vec2::new(6.0, 0.0), 0.5, &hit)
                .unwrap();
        assert_eq!(result.damage, 2);
        assert_eq!(result.entity_position, Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_path_collision_accumulates_distance() {
        let hit = collider(vec![sub(Vec2::new(1.0, 3.0), 0.5, 1)], 0);
        let points = [Vec2::new(1.0, 0.0), Vec2::new(1.0, 5.0)];
        let result = path_collision(ColliderRef::default(), Vec2::ZERO, &points, 0.5, &hit).unwrap();
        // 1 along the first segment, then 3 along the second
        assert_eq!(result.traveled_distance, 4.0);
        assert_eq!(result.entity_position, Vec2::new(1.0, 3.0));

        let miss = collider(vec![sub(Vec2::new(9.0, 9.0), 0.5, 1)], 0);
        assert!(path_collision(ColliderRef::default(), Vec2::ZERO, &points, 0.5, &miss).is_none());
    }

    #[test]
    fn test_nearest_hit_wins_and_far_hits_need_overlap() {
        // A at traveled 2, B at traveled 5 (no longer overlapping), C at 4 but wide
        let mut colliders = container(vec![
            collider(vec![sub(Vec2::new(5.0, 0.0), 0.5, 10)], 7),
            collider(vec![sub(Vec2::new(2.0, 1.0), 0.5, 3)], 2),
            collider(vec![sub(Vec2::new(4.0, 0.0), 2.0, 1)], 4),
        ]);
        let points = [Vec2::new(8.0, 0.0)];
        let motion = Motion::Path { start: Vec2::ZERO, points: &points };
        let refs = hostile(&colliders);

        let candidates = gather_candidates(EntityId(0), motion, 0.5, 0.0, &mut colliders, &refs);
        assert_eq!(candidates.len(), 3);

        let resolution = resolve_collisions(candidates, 0.5, &colliders).unwrap();
        assert_eq!(resolution.position, Vec2::new(2.0, 0.0));
        let damages: Vec<i32> = resolution.hits.iter().map(|h| h.damage).collect();
        assert_eq!(damages, vec![1, 3]);

        // Every collider that registered a hit remembers the entity
        for at in refs {
            assert!(colliders.get(at).unwrap().has_struck(EntityId(0)));
        }
    }

    #[test]
    fn test_collider_strikes_at_most_once() {
        // Two overlapping sub-colliders from one hazard
        let mut colliders = container(vec![collider(
            vec![sub(Vec2::new(1.0, 0.0), 0.5, 5), sub(Vec2::new(1.2, 0.0), 0.5, 5)],
            0,
        )]);
        let refs = hostile(&colliders);
        let points = [Vec2::new(0.5, 0.0)];
        let motion = Motion::Path { start: Vec2::ZERO, points: &points };

        let first = gather_candidates(EntityId(3), motion, 0.5, 0.0, &mut colliders, &refs);
        assert_eq!(first.len(), 1);

        let second = gather_candidates(EntityId(3), motion, 0.5, 0.0, &mut colliders, &refs);
        assert!(second.is_empty());

        // A different entity is still hit
        let other = gather_candidates(EntityId(4), motion, 0.5, 0.0, &mut colliders, &refs);
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_equal_distances_keep_collider_order() {
        let colliders = container(vec![
            collider(vec![sub(Vec2::new(1.0, 0.0), 0.5, 1)], 0),
            collider(vec![sub(Vec2::new(1.0, 0.0), 0.5, 2)], 0),
        ]);
        let candidates = vec![
            PathCollisionResult {
                collider: ColliderRef { team: 1, index: 0 },
                damage: 1,
                traveled_distance: 1.0,
                entity_position: Vec2::new(0.5, 0.0),
                ..PathCollisionResult::default()
            },
            PathCollisionResult {
                collider: ColliderRef { team: 1, index: 1 },
                damage: 2,
                traveled_distance: 1.0,
                entity_position: Vec2::new(0.6, 0.0),
                ..PathCollisionResult::default()
            },
        ];
        let resolution = resolve_collisions(candidates, 0.5, &colliders).unwrap();
        assert_eq!(resolution.position, Vec2::new(0.5, 0.0));
        assert_eq!(resolution.hits.last().unwrap().damage, 1);
    }

    #[test]
    fn test_resolve_nothing() {
        assert!(resolve_collisions(Vec::new(), 0.5, &TeamColliders::new()).is_none());
    }

    #[test]
    fn test_motion_end() {
        assert_eq!(Motion::Point(Vec2::ONE).end(), Vec2::ONE);
        let points = [Vec2::X, Vec2::Y];
        assert_eq!(Motion::Path { start: Vec2::ZERO, points: &points }.end(), Vec2::Y);
        assert_eq!(Motion::Path { start: Vec2::ONE, points: &[] }.end(), Vec2::ONE);
    }
}

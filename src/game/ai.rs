//! Enemy Turn Planning
//!
//! Between turns every enemy walks towards its target and, once close
//! enough, queues a random card from its deck at it. Destinations already
//! claimed this turn push later ones away so enemies do not stack up.

use std::sync::Arc;

use glam::Vec2;
use tracing::trace;

use crate::core::rng::DeterministicRng;
use crate::game::action::queue_cast;
use crate::game::card::{Card, CastTarget};
use crate::game::entity::{Entity, EntityId};
use crate::game::path::Path;

/// Most points a planned enemy path can hold.
pub const MAX_PLANNED_POINTS: usize = 11;

/// Plans one turn for a group of enemies.
#[derive(Clone, Debug, Default)]
pub struct TurnPlanner {
    claimed: Vec<Vec2>,
}

impl TurnPlanner {
    /// Create a planner with no claimed destinations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination just short of the target, spread away from claimed ones.
    pub fn destination(&self, entity: &Entity, target_position: Vec2) -> Vec2 {
        let away = (entity.position - target_position).normalize_or_zero();
        let mut destination = target_position + away * entity.radius * 2.0;
        for &other in &self.claimed {
            let diff = other - destination;
            let falloff = diff.length_squared().clamp(0.1, 6.0);
            destination -= diff.normalize_or_zero() * (1.0 / falloff);
        }
        destination
    }

    /// Replace the entity's path with a walk towards `target`, and queue a
    /// card at it when the entity is close.
    ///
    /// Returns the queued card, if any.
    pub fn plan_turn(
        &mut self,
        entity: &mut Entity,
        target: EntityId,
        target_position: Vec2,
        rng: &mut DeterministicRng,
    ) -> Option<Arc<Card>> {
        let destination = self.destination(entity, target_position);
        self.claimed.push(destination);

        let travel = (entity.speed * 2.0).min(entity.position.distance(destination));
        entity.path = draw_path_to_destination(entity.position, destination, entity.speed, travel);
        entity.target_entity = Some(target);

        if (entity.path.len() as f32) >= (entity.speed * 1.8).floor() {
            return None;
        }
        let card = entity.deck.random_card(rng)?;
        trace!(entity = %entity.id, card = %card.id, target = %target, "enemy queues card");
        queue_cast(entity, Arc::clone(&card), CastTarget::Entity(target));
        Some(card)
    }
}

/// Straight path of `speed / 4` long steps towards `destination`.
///
/// Stops once `travel` is covered or after [`MAX_PLANNED_POINTS`] points.
/// The last step may overshoot `travel` by less than one step.
pub fn draw_path_to_destination(start: Vec2, destination: Vec2, speed: f32, travel: f32) -> Path {
    let mut path = Path::new();
    let direction = (destination - start).normalize_or_zero();
    let step = speed / 4.0;
    if direction == Vec2::ZERO || step <= 0.0 {
        return path;
    }

    let mut last = start;
    let mut remaining = travel;
    for _ in 0..MAX_PLANNED_POINTS {
        let next = last + direction * step;
        remaining -= step;
        path.add(next);
        if remaining <= 0.0 {
            break;
        }
        last = next;
    }
    path
}

// =============================================================================
// TESTS
// =============================================================================

//! Card Actions
//!
//! Per-entity cast sequencing. Casts wait in the card queue until the
//! entity is free, then their actions move into the action queue where each
//! counts down its own delay and fires independently.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::geometry::{direction_to_angle, facing_to_direction, offset_position, perpendicular};
use crate::game::assets::AssetResolver;
use crate::game::card::{Card, CardAction, CastTarget};
use crate::game::collider::{HitCollider, TeamColliders};
use crate::game::effect::{spawn_effect, VisualEffect};
use crate::game::entity::{Entity, EntityId, TargetMode};
use crate::game::events::GameEvent;

/// A cast waiting for the entity to become free.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingCast {
    /// Card to cast
    pub card: Arc<Card>,
    /// Resolved target
    pub target: CastTarget,
}

/// A card action in flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Cloned action data
    pub action: CardAction,
    /// Position of the action in its card
    pub index: usize,
    /// Steps left before it fires
    pub remaining: u32,
}

/// Add a cast behind any already queued.
pub fn queue_cast(entity: &mut Entity, card: Arc<Card>, target: CastTarget) {
    entity.card_queue.push(PendingCast { card, target });
}

/// Start the next pending cast if the entity is free.
///
/// The entity is free when no action is in flight and the inter-card delay
/// has elapsed. Returns the started card.
pub fn promote_pending_cast(entity: &mut Entity) -> Option<Arc<Card>> {
    if !entity.action_queue.is_empty() || entity.action_delay > 0 || entity.card_queue.is_empty() {
        return None;
    }
    let cast = entity.card_queue.remove(0);

    entity.target_entity = None;
    match cast.target {
        CastTarget::Entity(id) => {
            entity.target_mode = TargetMode::TowardsTarget;
            entity.target_entity = Some(id);
            entity.target_direction = facing_to_direction(entity.facing);
        }
        CastTarget::Position(position) => {
            entity.target_mode = TargetMode::TowardsPosition;
            entity.target_position = position;
            entity.target_direction = Vec2::ZERO;
        }
        CastTarget::Direction(direction) => {
            entity.target_mode = TargetMode::TowardsDirection;
            entity.target_direction = direction.normalize_or_zero();
        }
    }

    entity.action_queue = cast
        .card
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| QueuedAction {
            action: action.clone(),
            index,
            remaining: action.delay,
        })
        .collect();
    entity.action_delay = cast.card.delay;

    Some(cast.card)
}

/// Remove the actions that fire this step and count the rest down.
///
/// An action fires on the step its countdown is already zero, so delay `N`
/// fires exactly `N` steps after the cast starts. Ready actions are
/// returned in reverse queue order.
pub fn take_ready_actions(entity: &mut Entity) -> Vec<QueuedAction> {
    let mut ready = Vec::new();
    entity.action_queue.retain_mut(|queued| {
        if queued.remaining == 0 {
            ready.push(queued.clone());
            false
        } else {
            queued.remaining -= 1;
            true
        }
    });
    ready.reverse();
    ready
}

/// Direction colliders, effects and impulses are laid out along.
///
/// Falls back to the facing when no cast direction is set.
pub fn aim_direction(entity: &Entity) -> Vec2 {
    if entity.target_direction == Vec2::ZERO {
        facing_to_direction(entity.facing)
    } else {
        entity.target_direction
    }
}

/// Snap the facing towards the cast target.
///
/// Tries the target entity, then the target direction, then the target
/// position. A target entity missing from `positions` is not an error.
pub fn face_target(entity: &mut Entity, positions: &BTreeMap<EntityId, Vec2>) {
    if let Some(target) = entity.target_entity {
        if let Some(&position) = positions.get(&target) {
            let diff = (position - entity.position).normalize_or_zero();
            if diff != Vec2::ZERO {
                entity.face_angle(direction_to_angle(diff));
                entity.target_direction = diff;
            }
            return;
        }
        trace!(entity = %entity.id, target = %target, "cast target no longer exists");
    }

    if entity.target_direction != Vec2::ZERO {
        entity.face_angle(direction_to_angle(entity.target_direction));
        return;
    }

    let diff = (entity.target_position - entity.position).normalize_or_zero();
    if diff != Vec2::ZERO {
        entity.face_angle(direction_to_angle(diff));
        entity.target_direction = diff;
    }
}

/// Encounter state an action may touch besides its own entity.
pub struct ActionContext<'a> {
    /// Current step
    pub step: u32,
    /// Asset lookup
    pub assets: &'a dyn AssetResolver,
    /// Team collider containers
    pub colliders: &'a mut TeamColliders,
    /// Live visual effects
    pub effects: &'a mut Vec<VisualEffect>,
    /// Event sink
    pub events: &'a mut Vec<GameEvent>,
    /// Entity positions at the start of the pass
    pub positions: &'a BTreeMap<EntityId, Vec2>,
}

/// Fire one action.
///
/// Facing, item swap, animation, colliders, visual effects, impulse and
/// sound run in that order; each is skipped when its field is empty.
pub fn run_action(entity: &mut Entity, queued: &QueuedAction, ctx: &mut ActionContext<'_>) {
    let action = &queued.action;
    ctx.events
        .push(GameEvent::action_executed(ctx.step, entity.id, queued.index));

    if action.face_target {
        face_target(entity, ctx.positions);
    }

    if let Some(item) = non_blank(&action.swap_item_id) {
        entity.item = Some(item.to_string());
        ctx.events
            .push(GameEvent::item_equipped(ctx.step, entity.id, item));
    }

    if let Some(animation_id) = non_blank(&action.animation_id) {
        play_action_animation(entity, animation_id, ctx.assets);
    }

    let direction = aim_direction(entity);

    for template in &action.colliders {
        let collider = HitCollider::from_template(template, entity.position, direction, entity.team);
        let position = collider
            .shapes
            .first()
            .map_or(entity.position, |shape| shape.position);
        ctx.events.push(GameEvent::collider_spawned(
            ctx.step,
            entity.team,
            position,
            collider.duration,
        ));
        ctx.colliders.add(collider);
    }

    for spawn in &action.visual_effects {
        let position = offset_position(entity.position, direction, spawn.local_offset);
        if spawn_effect(ctx.assets, ctx.effects, &spawn.effect_id, position, direction) {
            ctx.events.push(GameEvent::effect_spawned(
                ctx.step,
                spawn.effect_id.clone(),
                position,
                direction,
            ));
        }
    }

    if action.velocity != Vec2::ZERO {
        entity.velocity += direction * action.velocity.y + perpendicular(direction) * action.velocity.x;
    }

    if let Some(sound) = non_blank(&action.sound_id) {
        ctx.events
            .push(GameEvent::sound_played(ctx.step, sound, entity.position));
    }
}

/// Exported card data writes unset ids as empty strings.
fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

/// Register the clip on first use, then play it once.
fn play_action_animation(entity: &mut Entity, animation_id: &str, assets: &dyn AssetResolver) {
    if !entity.animator.has_animation(animation_id) {
        match assets.animation(animation_id) {
            Some(animation) => {
                entity.animator.add_animation(animation_id, animation);
            }
            None => {
                debug!(entity = %entity.id, animation = animation_id, "unknown animation");
                return;
            }
        }
    }
    entity.animator.play_animation(animation_id);
}

// =============================================================================
// TESTS
// =============================================================================

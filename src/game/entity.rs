//! Entities
//!
//! A simulated combatant: position and facing, health and stun, the two
//! motion modes (planned path or free velocity), the card/action queues and
//! a per-entity animator and deck.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::EntityAnimator;
use crate::core::geometry::{delta_angle, direction_to_angle, move_towards_angle};
use crate::core::hash::StateHasher;
use crate::game::action::{PendingCast, QueuedAction};
use crate::game::collision::PathCollisionResult;
use crate::game::deck::Deck;
use crate::game::path::Path;

/// Team index. Team 0 is the player-controlled side.
pub type TeamId = u8;

/// The player-controlled team.
pub const PLAYER_TEAM: TeamId = 0;

/// Unique entity identifier, assigned in spawn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which source drives the position this step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveMode {
    /// Free movement by velocity with friction (stunned or acting)
    MoveVelocity,
    /// Walk the planned path at `speed`
    #[default]
    MovePath,
}

/// What the entity's current cast is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetMode {
    /// Another entity
    TowardsTarget,
    /// A world position
    TowardsPosition,
    /// A direction
    TowardsDirection,
    /// No active cast
    #[default]
    None,
}

/// Static entity stats, resolved by id through the asset resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Definition id
    pub id: String,
    /// Starting and maximum health
    pub max_health: i32,
    /// Travel per second along a path
    pub speed: f32,
    /// Collision radius
    pub radius: f32,
    /// Velocity decay per second
    #[serde(default)]
    pub friction: f32,
    /// Animation slot (`idle`, `walk`, `hit`, ...) to animation asset id
    #[serde(default)]
    pub animations: BTreeMap<String, String>,
    /// Card ids in the starting deck
    #[serde(default)]
    pub cards: Vec<String>,
    /// Item equipped on spawn
    #[serde(default)]
    pub item: Option<String>,
}

/// A simulated combatant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id
    pub id: EntityId,
    /// Definition this entity was spawned from
    pub definition_id: String,
    /// Owning team
    pub team: TeamId,

    /// World position
    pub position: Vec2,
    /// Facing angle in degrees
    pub facing: f32,
    /// Angle the facing eases towards
    pub target_facing: f32,
    /// Collision radius
    pub radius: f32,

    /// Maximum health
    pub max_health: i32,
    /// Current health; dead at <= 0
    pub health: i32,
    /// Remaining stun frames
    pub stun: u32,

    /// Velocity used in velocity mode
    pub velocity: Vec2,
    /// Velocity decay per second
    pub friction: f32,
    /// Path travel per second
    pub speed: f32,
    /// Motion mode chosen this step
    pub move_mode: MoveMode,
    /// Planned path
    pub path: Path,

    /// Aim of the active cast
    pub target_mode: TargetMode,
    /// Entity targeted by the active cast (or the AI's chosen target)
    pub target_entity: Option<EntityId>,
    /// Position targeted by the active cast
    pub target_position: Vec2,
    /// Direction colliders and effects are laid out along
    pub target_direction: Vec2,

    /// Frames before the next cast may start
    pub action_delay: u32,
    /// Actions of the active cast
    pub action_queue: Vec<QueuedAction>,
    /// Casts waiting to start
    pub card_queue: Vec<PendingCast>,
    /// Draw pile, hand and discard
    pub deck: Deck,

    /// Equipped item id
    pub item: Option<String>,
    /// Keyframe animation player
    pub animator: EntityAnimator,
}

impl Entity {
    /// Create an entity from its definition.
    pub fn new(id: EntityId, definition: &EntityDefinition, team: TeamId, position: Vec2) -> Self {
        Self {
            id,
            definition_id: definition.id.clone(),
            team,
            position,
            facing: 0.0,
            target_facing: 0.0,
            radius: definition.radius,
            max_health: definition.max_health,
            health: definition.max_health,
            stun: 0,
            velocity: Vec2::ZERO,
            friction: definition.friction,
            speed: definition.speed.max(0.0),
            move_mode: MoveMode::MovePath,
            path: Path::new(),
            target_mode: TargetMode::None,
            target_entity: None,
            target_position: position,
            target_direction: Vec2::X,
            action_delay: 0,
            action_queue: Vec::new(),
            card_queue: Vec::new(),
            deck: Deck::new(),
            item: definition.item.clone(),
            animator: EntityAnimator::default(),
        }
    }

    /// Check if the entity is still alive.
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Raise stun to at least `amount` and switch to velocity mode.
    ///
    /// Stun never accumulates: simultaneous hits keep the largest value.
    pub fn set_stun(&mut self, amount: u32) {
        self.stun = self.stun.max(amount);
        self.move_mode = MoveMode::MoveVelocity;
    }

    /// Remove stun frames, stopping at zero.
    pub fn remove_stun(&mut self, amount: u32) {
        self.stun = self.stun.saturating_sub(amount);
    }

    /// Apply a collider hit: knockback, path cancel, damage and stun.
    pub fn hit_with_collision(&mut self, hit: &PathCollisionResult) {
        self.velocity = hit.knockback_direction * hit.knockback;
        self.path.clear();
        self.hit_and_damage(hit.damage, hit.stun);
    }

    /// Apply damage and stun, and play the hit reaction.
    ///
    /// Negative damage heals, capped at `max_health`.
    pub fn hit_and_damage(&mut self, damage: i32, stun: u32) {
        self.health = self.health.saturating_sub(damage).min(self.max_health);
        self.animator.play_hit();
        self.set_stun(stun);
    }

    /// Move without changing the target facing.
    pub fn move_to(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Move and face the direction of travel.
    pub fn move_facing(&mut self, position: Vec2) {
        let travel = position - self.position;
        if travel != Vec2::ZERO {
            self.target_facing = direction_to_angle(travel);
        }
        self.position = position;
    }

    /// Snap both facing and target facing.
    pub fn face_angle(&mut self, angle: f32) {
        self.facing = angle;
        self.target_facing = angle;
    }

    /// Ease the facing towards the target facing.
    ///
    /// The rate grows with the remaining angle, `(180 + |delta|)` degrees
    /// per second, and never overshoots.
    pub fn update_facing(&mut self, delta_time: f32) {
        let remaining = delta_angle(self.target_facing, self.facing).abs();
        self.facing = move_towards_angle(
            self.facing,
            self.target_facing,
            (180.0 + remaining) * delta_time,
        );
    }

    /// Add a point to the planned path.
    pub fn add_move_point(&mut self, point: Vec2) {
        self.path.add(point);
    }

    /// Feed the simulation-relevant fields into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_str(&self.definition_id);
        hasher.update_u8(self.team);
        hasher.update_vec2(self.position);
        hasher.update_f32(self.facing);
        hasher.update_f32(self.target_facing);
        hasher.update_i32(self.health);
        hasher.update_u32(self.stun);
        hasher.update_vec2(self.velocity);
        hasher.update_u8(self.move_mode as u8);
        hasher.update_u32(self.path.len() as u32);
        for &point in self.path.points() {
            hasher.update_vec2(point);
        }
        hasher.update_vec2(self.target_direction);
        hasher.update_u32(self.action_delay);
        hasher.update_u32(self.action_queue.len() as u32);
        for queued in &self.action_queue {
            hasher.update_u32(queued.remaining);
        }
        hasher.update_u32(self.card_queue.len() as u32);
        self.deck.hash_into(hasher);
        hasher.update_str(self.animator.playing());
        hasher.update_u32(self.animator.current_frame().map_or(u32::MAX, |f| f as u32));
    }
}

// =============================================================================
// TESTS
// =============================================================================

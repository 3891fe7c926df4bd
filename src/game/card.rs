//! Card Definitions
//!
//! A card is an ordered list of actions. Each action is one stage of the
//! cast: it fires after its own delay and may spawn colliders, spawn visual
//! effects, swap the held item, play an animation, push the caster and play
//! a sound. Every part is optional and independent of the others.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::collider::CardCollider;
use crate::game::entity::EntityId;

/// Visual effect spawned by an action, in the caster's local frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualEffectSpawn {
    /// Effect definition id
    pub effect_id: String,
    /// Local offset (`y` forward, `x` lateral)
    #[serde(default)]
    pub local_offset: Vec2,
}

/// One stage of a card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardAction {
    /// Frames between the cast starting and this action firing
    pub delay: u32,
    /// Item to equip
    pub swap_item_id: Option<String>,
    /// One-shot animation to play
    pub animation_id: Option<String>,
    /// Collider templates to spawn
    pub colliders: Vec<CardCollider>,
    /// Visual effects to spawn
    pub visual_effects: Vec<VisualEffectSpawn>,
    /// Impulse added to velocity (`y` forward, `x` lateral)
    pub velocity: Vec2,
    /// Sound to play
    pub sound_id: Option<String>,
    /// Turn to face the cast target first
    pub face_target: bool,
}

impl CardAction {
    /// Check if the action does nothing when it fires.
    pub fn is_empty(&self) -> bool {
        !self.face_target
            && self.swap_item_id.is_none()
            && self.animation_id.is_none()
            && self.colliders.is_empty()
            && self.visual_effects.is_empty()
            && self.velocity == Vec2::ZERO
            && self.sound_id.is_none()
    }
}

/// A castable card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Card id
    pub id: String,
    /// Frames the caster is busy after the cast starts
    #[serde(default)]
    pub delay: u32,
    /// Stages in cast order
    pub actions: Vec<CardAction>,
}

/// What a cast is aimed at. Exactly one is resolved per cast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CastTarget {
    /// Another entity
    Entity(EntityId),
    /// A world position
    Position(Vec2),
    /// A direction from the caster
    Direction(Vec2),
}

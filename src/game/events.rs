//! Game Events
//!
//! Events generated during simulation. The renderer and audio layers
//! consume them to mirror the simulation; tests use them to observe it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::entity::{EntityId, TeamId};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Encounter end first
    EncounterEnd = 0,
    /// Then removals, so handles are released before anything targets them
    Removal = 1,
    /// Then damage
    Hit = 2,
    /// Then card and action bookkeeping
    Action = 3,
    /// Effects and sounds
    Presentation = 4,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Entity added to the registry
    EntitySpawned {
        entity_id: EntityId,
        definition_id: String,
        team: TeamId,
        position: Vec2,
    },

    /// Cast added to an entity's card queue
    CardQueued { entity_id: EntityId, card_id: String },

    /// Cast promoted into the action queue
    CardStarted { entity_id: EntityId, card_id: String },

    /// A card action fired
    ActionExecuted { entity_id: EntityId, action_index: usize },

    /// Held item changed
    ItemEquipped { entity_id: EntityId, item_id: String },

    /// Hit collider spawned
    ColliderSpawned { team: TeamId, position: Vec2, duration: u32 },

    /// Visual effect spawned
    EffectSpawned { effect_id: String, position: Vec2, direction: Vec2 },

    /// Sound requested
    SoundPlayed { sound_id: String, position: Vec2 },

    /// Entity damaged by a collider
    EntityHit {
        entity_id: EntityId,
        damage: i32,
        stun: u32,
        health: i32,
    },

    /// Entity removed after dying
    EntityRemoved { entity_id: EntityId },

    /// Player entity died
    EncounterEnded { player_id: EntityId, steps: u32 },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Step when event occurred
    pub step: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity_id: Option<EntityId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(step: u32, priority: EventPriority, data: GameEventData) -> Self {
        let entity_id = match &data {
            GameEventData::EntitySpawned { entity_id, .. }
            | GameEventData::CardQueued { entity_id, .. }
            | GameEventData::CardStarted { entity_id, .. }
            | GameEventData::ActionExecuted { entity_id, .. }
            | GameEventData::ItemEquipped { entity_id, .. }
            | GameEventData::EntityHit { entity_id, .. }
            | GameEventData::EntityRemoved { entity_id } => Some(*entity_id),
            GameEventData::EncounterEnded { player_id, .. } => Some(*player_id),
            _ => None,
        };

        Self {
            step,
            priority,
            entity_id,
            data,
        }
    }

    /// Create entity spawned event.
    pub fn entity_spawned(
        step: u32,
        entity_id: EntityId,
        definition_id: impl Into<String>,
        team: TeamId,
        position: Vec2,
    ) -> Self {
        Self::new(
            step,
            EventPriority::Other,
            GameEventData::EntitySpawned {
                entity_id,
                definition_id: definition_id.into(),
                team,
                position,
            },
        )
    }

    /// Create card queued event.
    pub fn card_queued(step: u32, entity_id: EntityId, card_id: impl Into<String>) -> Self {
        Self::new(
            step,
            EventPriority::Action,
            GameEventData::CardQueued {
                entity_id,
                card_id: card_id.into(),
            },
        )
    }

    /// Create card started event.
    pub fn card_started(step: u32, entity_id: EntityId, card_id: impl Into<String>) -> Self {
        Self::new(
            step,
            EventPriority::Action,
            GameEventData::CardStarted {
                entity_id,
                card_id: card_id.into(),
            },
        )
    }

    /// Create action executed event.
    pub fn action_executed(step: u32, entity_id: EntityId, action_index: usize) -> Self {
        Self::new(
            step,
            EventPriority::Action,
            GameEventData::ActionExecuted { entity_id, action_index },
        )
    }

    /// Create item equipped event.
    pub fn item_equipped(step: u32, entity_id: EntityId, item_id: impl Into<String>) -> Self {
        Self::new(
            step,
            EventPriority::Action,
            GameEventData::ItemEquipped {
                entity_id,
                item_id: item_id.into(),
            },
        )
    }

    /// Create collider spawned event.
    pub fn collider_spawned(step: u32, team: TeamId, position: Vec2, duration: u32) -> Self {
        Self::new(
            step,
            EventPriority::Action,
            GameEventData::ColliderSpawned { team, position, duration },
        )
    }

    /// Create effect spawned event.
    pub fn effect_spawned(step: u32, effect_id: impl Into<String>, position: Vec2, direction: Vec2) -> Self {
        Self::new(
            step,
            EventPriority::Presentation,
            GameEventData::EffectSpawned {
                effect_id: effect_id.into(),
                position,
                direction,
            },
        )
    }

    /// Create sound played event.
    pub fn sound_played(step: u32, sound_id: impl Into<String>, position: Vec2) -> Self {
        Self::new(
            step,
            EventPriority::Presentation,
            GameEventData::SoundPlayed {
                sound_id: sound_id.into(),
                position,
            },
        )
    }

    /// Create entity hit event.
    pub fn entity_hit(step: u32, entity_id: EntityId, damage: i32, stun: u32, health: i32) -> Self {
        Self::new(
            step,
            EventPriority::Hit,
            GameEventData::EntityHit {
                entity_id,
                damage,
                stun,
                health,
            },
        )
    }

    /// Create entity removed event.
    pub fn entity_removed(step: u32, entity_id: EntityId) -> Self {
        Self::new(step, EventPriority::Removal, GameEventData::EntityRemoved { entity_id })
    }

    /// Create encounter ended event.
    pub fn encounter_ended(step: u32, player_id: EntityId) -> Self {
        Self::new(
            step,
            EventPriority::EncounterEnd,
            GameEventData::EncounterEnded { player_id, steps: step },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
            && self.priority == other.priority
            && self.entity_id == other.entity_id
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: step, then priority, then entity
        self.step
            .cmp(&other.step)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity_id.cmp(&other.entity_id))
    }
}

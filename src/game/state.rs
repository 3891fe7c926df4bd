//! Encounter State
//!
//! Everything one encounter owns: the entity registry, per-team collider
//! containers, live visual effects, the seeded RNG and the pending event
//! list. Commands here are the only ways callers mutate the encounter
//! besides stepping it.
//!
//! All collections iterate deterministically (`BTreeMap`, `Vec`).

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::animation::Pose;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::game::action::queue_cast;
use crate::game::ai::TurnPlanner;
use crate::game::assets::AssetResolver;
use crate::game::card::{Card, CastTarget};
use crate::game::collider::{Hostility, TeamColliders};
use crate::game::effect::VisualEffect;
use crate::game::entity::{Entity, EntityId, TeamId, PLAYER_TEAM};
use crate::game::events::GameEvent;
use crate::game::path::Path;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected encounter command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// No entity definition with this id.
    #[error("unknown entity definition: {0}")]
    UnknownDefinition(String),

    /// No card with this id.
    #[error("unknown card: {0}")]
    UnknownCard(String),

    /// Entity is not in the registry.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Hand has no card at this index.
    #[error("entity {entity} has no card at hand index {index}")]
    EmptyHandSlot {
        /// Entity whose hand was checked
        entity: EntityId,
        /// Requested index
        index: usize,
    },

    /// The encounter is over.
    #[error("encounter has ended")]
    EncounterEnded,
}

// =============================================================================
// ENCOUNTER PHASE
// =============================================================================

/// Current phase of the encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncounterPhase {
    /// Steps are simulated
    #[default]
    Active,
    /// Player died; stepping is a no-op
    Ended,
}

// =============================================================================
// RENDER EXPORT
// =============================================================================

/// What a renderer needs to mirror one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id
    pub id: EntityId,
    /// Definition id
    pub definition_id: String,
    /// Team
    pub team: TeamId,
    /// World position
    pub position: Vec2,
    /// Facing angle in degrees
    pub facing: f32,
    /// Collision radius
    pub radius: f32,
    /// Current health
    pub health: i32,
    /// Maximum health
    pub max_health: i32,
    /// Equipped item
    pub item: Option<String>,
    /// Clip currently playing
    pub animation: String,
    /// Bone pose
    pub pose: Pose,
}

/// One-way export of the encounter for rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Step the frame was taken at
    pub step: u32,
    /// Entities in id order
    pub entities: Vec<EntitySnapshot>,
    /// Live visual effects
    pub effects: Vec<VisualEffect>,
}

// =============================================================================
// ENCOUNTER STATE
// =============================================================================

/// Complete state of an encounter.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncounterState {
    /// Steps simulated so far
    pub step: u32,

    /// Current phase
    pub phase: EncounterPhase,

    /// RNG seed (for verification)
    pub seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// All entities (BTreeMap for deterministic iteration)
    pub entities: BTreeMap<EntityId, Entity>,

    /// Next entity id (monotonic counter)
    pub next_entity_id: u32,

    /// Player-controlled entity
    pub player: Option<EntityId>,

    /// Live hit colliders per team
    pub colliders: TeamColliders,

    /// Which teams' colliders hurt which teams
    pub hostility: Hostility,

    /// Live visual effects
    pub effects: Vec<VisualEffect>,

    /// Events generated since the last `take_events`
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl EncounterState {
    /// Create an empty encounter.
    pub fn new(seed: u64) -> Self {
        Self {
            step: 0,
            phase: EncounterPhase::Active,
            seed,
            rng: DeterministicRng::new(seed),
            entities: BTreeMap::new(),
            next_entity_id: 0,
            player: None,
            colliders: TeamColliders::new(),
            hostility: Hostility::new(),
            effects: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Spawn an entity from its definition.
    ///
    /// Registers the definition's animation slots on the animator and fills
    /// and shuffles its deck. Animations or cards the resolver does not know
    /// are skipped.
    pub fn spawn_entity(
        &mut self,
        assets: &dyn AssetResolver,
        definition_id: &str,
        team: TeamId,
        position: Vec2,
    ) -> Result<EntityId, CommandError> {
        self.ensure_active()?;
        let definition = assets
            .entity(definition_id)
            .ok_or_else(|| CommandError::UnknownDefinition(definition_id.to_string()))?;

        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let mut entity = Entity::new(id, &definition, team, position);

        for (slot, animation_id) in &definition.animations {
            match assets.animation(animation_id) {
                Some(animation) => {
                    entity.animator.add_animation(slot.clone(), animation);
                }
                None => warn!(entity = %id, slot = %slot, animation = %animation_id, "unknown animation"),
            }
        }

        for card_id in &definition.cards {
            match assets.card(card_id) {
                Some(card) => entity.deck.add_card(card),
                None => warn!(entity = %id, card = %card_id, "unknown card in deck"),
            }
        }
        entity.deck.shuffle(&mut self.rng);

        debug!(entity = %id, definition = definition_id, team, "Entity spawned");
        self.push_event(GameEvent::entity_spawned(self.step, id, definition_id, team, position));
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Spawn the player-controlled entity on the player team.
    pub fn spawn_player(
        &mut self,
        assets: &dyn AssetResolver,
        definition_id: &str,
        position: Vec2,
    ) -> Result<EntityId, CommandError> {
        let id = self.spawn_entity(assets, definition_id, PLAYER_TEAM, position)?;
        self.player = Some(id);
        Ok(id)
    }

    /// Queue a cast of `card_id` by `entity`.
    pub fn queue_card(
        &mut self,
        assets: &dyn AssetResolver,
        entity: EntityId,
        card_id: &str,
        target: CastTarget,
    ) -> Result<(), CommandError> {
        let card = assets
            .card(card_id)
            .ok_or_else(|| CommandError::UnknownCard(card_id.to_string()))?;
        self.enqueue_cast(entity, card, target)
    }

    /// Queue a cast of the card at `index` in the entity's hand.
    pub fn play_card_from_hand(
        &mut self,
        entity: EntityId,
        index: usize,
        target: CastTarget,
    ) -> Result<Arc<Card>, CommandError> {
        self.ensure_active()?;
        let card = self
            .entity_mut(entity)?
            .deck
            .play_from_hand(index)
            .ok_or(CommandError::EmptyHandSlot { entity, index })?;
        self.enqueue_cast(entity, Arc::clone(&card), target)?;
        Ok(card)
    }

    fn enqueue_cast(&mut self, entity: EntityId, card: Arc<Card>, target: CastTarget) -> Result<(), CommandError> {
        self.ensure_active()?;
        let step = self.step;
        let caster = self.entity_mut(entity)?;
        let card_id = card.id.clone();
        queue_cast(caster, card, target);
        self.push_event(GameEvent::card_queued(step, entity, card_id));
        Ok(())
    }

    /// Draw up to `amount` cards into the entity's hand.
    pub fn draw_cards(&mut self, entity: EntityId, amount: usize) -> Result<usize, CommandError> {
        self.ensure_active()?;
        let caster = self
            .entities
            .get_mut(&entity)
            .ok_or(CommandError::UnknownEntity(entity))?;
        Ok(caster.deck.draw(amount, &mut self.rng))
    }

    /// Replace the entity's planned path.
    pub fn set_planned_path(
        &mut self,
        entity: EntityId,
        points: impl IntoIterator<Item = Vec2>,
    ) -> Result<(), CommandError> {
        self.ensure_active()?;
        self.entity_mut(entity)?.path = Path::from_points(points);
        Ok(())
    }

    /// Plan paths and casts for every entity not on the player team.
    ///
    /// Each enemy keeps its current target while it lives, otherwise it
    /// targets the player. Returns how many cards were queued.
    pub fn plan_enemy_turns(&mut self) -> usize {
        if self.phase == EncounterPhase::Ended {
            return 0;
        }
        let positions = self.entity_positions();
        let mut planner = TurnPlanner::new();
        let mut queued = 0;

        let enemy_ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.team != PLAYER_TEAM)
            .map(|entity| entity.id)
            .collect();

        for id in enemy_ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let target = entity
                .target_entity
                .filter(|target| positions.contains_key(target))
                .or(self.player);
            let Some((target, &target_position)) =
                target.and_then(|target| positions.get(&target).map(|p| (target, p)))
            else {
                continue;
            };

            if let Some(card) = planner.plan_turn(entity, target, target_position, &mut self.rng) {
                self.pending_events
                    .push(GameEvent::card_queued(self.step, id, card.id.clone()));
                queued += 1;
            }
        }
        queued
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Get an entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get an entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, CommandError> {
        self.entities.get_mut(&id).ok_or(CommandError::UnknownEntity(id))
    }

    /// The player-controlled entity, while it is registered.
    pub fn player_entity(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(&id))
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the encounter is over.
    pub fn is_ended(&self) -> bool {
        self.phase == EncounterPhase::Ended
    }

    /// Position of every registered entity.
    pub fn entity_positions(&self) -> BTreeMap<EntityId, Vec2> {
        self.entities
            .iter()
            .map(|(&id, entity)| (id, entity.position))
            .collect()
    }

    /// Export positions, facings and poses for rendering.
    pub fn render_frame(&self) -> RenderFrame {
        let entities = self
            .entities
            .values()
            .map(|entity| EntitySnapshot {
                id: entity.id,
                definition_id: entity.definition_id.clone(),
                team: entity.team,
                position: entity.position,
                facing: entity.facing,
                radius: entity.radius,
                health: entity.health,
                max_health: entity.max_health,
                item: entity.item.clone(),
                animation: entity.animator.playing().to_string(),
                pose: entity.animator.pose().clone(),
            })
            .collect();

        RenderFrame {
            step: self.step,
            entities,
            effects: self.effects.clone(),
        }
    }

    fn ensure_active(&self) -> Result<(), CommandError> {
        match self.phase {
            EncounterPhase::Active => Ok(()),
            EncounterPhase::Ended => Err(CommandError::EncounterEnded),
        }
    }

    // =========================================================================
    // VERIFICATION
    // =========================================================================

    /// Compute deterministic state hash.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.step, self.rng.state(), |hasher| {
            hasher.update_u64(self.seed);
            hasher.update_u8(self.phase as u8);
            hasher.update_u32(self.next_entity_id);

            // Hash all entities in sorted order (BTreeMap guarantees this)
            hasher.update_u32(self.entities.len() as u32);
            for entity in self.entities.values() {
                entity.hash_into(hasher);
            }

            self.colliders.hash_into(hasher);

            hasher.update_u32(self.effects.len() as u32);
            for effect in &self.effects {
                effect.hash_into(hasher);
            }
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

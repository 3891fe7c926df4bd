//! Simulation Step
//!
//! The fixed-timestep loop. One call to [`tick`] is an atomic transition
//! over the whole encounter, made of six passes that must run in this
//! order:
//!
//! 1. motion mode, card promotion and action countdown
//! 2. motion, collision and damage
//! 3. animation, facing and stun countdown
//! 4. visual effect aging
//! 5. hit collider aging
//! 6. death removal, or encounter end when the player died

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::animation::AnimState;
use crate::core::rng::DeterministicRng;
use crate::game::action::{promote_pending_cast, run_action, take_ready_actions, ActionContext};
use crate::game::assets::AssetResolver;
use crate::game::card::CastTarget;
use crate::game::collision::{gather_candidates, resolve_collisions, Motion, PathCollisionResult};
use crate::game::effect::{age_effects, spawn_effect, VisualEffect};
use crate::game::entity::{Entity, EntityId, MoveMode, TeamId};
use crate::game::events::GameEvent;
use crate::game::state::{CommandError, EncounterPhase, EncounterState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Step counter after the tick
    pub step: u32,
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the encounter is over
    pub encounter_ended: bool,
}

/// Configuration for stepping an encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Seconds per step
    pub delta: f32,
    /// Steps simulated per turn
    pub steps_per_turn: u32,
    /// Velocity at or below which a velocity-driven entity is at rest
    pub rest_threshold: f32,
    /// Effect spawned on every hit
    pub hit_effect_id: String,
    /// Hit effect distance from the entity, in radii along the knockback
    pub hit_effect_distance: f32,
    /// Sound variants played once per step an entity is hit
    pub hit_sound_ids: Vec<String>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            delta: 1.0 / 30.0,
            steps_per_turn: 60,
            rest_threshold: 0.01,
            hit_effect_id: "sparks".to_string(),
            hit_effect_distance: 2.5,
            hit_sound_ids: vec!["hit1".to_string(), "hit2".to_string()],
        }
    }
}

impl StepConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            delta: env_or("CONDEMNED_STEP_DELTA", defaults.delta),
            steps_per_turn: env_or("CONDEMNED_STEPS_PER_TURN", defaults.steps_per_turn),
            rest_threshold: env_or("CONDEMNED_REST_THRESHOLD", defaults.rest_threshold),
            ..defaults
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Run one simulation step.
///
/// Stepping an encounter with no entities, or one that already ended, is a
/// no-op. The step never fails: unknown targets, missing clips and missing
/// effects are traced and skipped.
pub fn tick(state: &mut EncounterState, assets: &dyn AssetResolver, config: &StepConfig) -> TickResult {
    if state.phase == EncounterPhase::Ended {
        return TickResult {
            step: state.step,
            events: Vec::new(),
            encounter_ended: true,
        };
    }
    if state.entities.is_empty() {
        return TickResult {
            step: state.step,
            ..TickResult::default()
        };
    }

    // 0. Advance step counter
    state.step += 1;

    // 1. Motion mode, card promotion, action countdown
    update_actions(state, assets);

    // 2. Motion, collision, damage
    update_motion(state, assets, config);

    // 3. Animation, facing, stun
    for entity in state.entities.values_mut() {
        entity.animator.step();
        entity.update_facing(config.delta);
        entity.remove_stun(1);
    }

    // 4. Visual effects
    let finished = age_effects(&mut state.effects);

    // 5. Hit colliders
    let expired = state.colliders.age_all();
    trace!(step = state.step, finished, expired, "aged effects and colliders");

    // 6. Death pass
    let encounter_ended = remove_dead(state);

    #[cfg(feature = "debug-tracing")]
    trace!(step = state.step, hash = %hex::encode(state.compute_hash()), "step hash");

    TickResult {
        step: state.step,
        events: state.take_events(),
        encounter_ended,
    }
}

/// Pass 1.
fn update_actions(state: &mut EncounterState, assets: &dyn AssetResolver) {
    let positions = state.entity_positions();
    let mut ctx = ActionContext {
        step: state.step,
        assets,
        colliders: &mut state.colliders,
        effects: &mut state.effects,
        events: &mut state.pending_events,
        positions: &positions,
    };

    for entity in state.entities.values_mut() {
        if entity.stun > 0 || entity.action_delay > 0 {
            entity.move_mode = MoveMode::MoveVelocity;
        } else {
            entity.velocity = Vec2::ZERO;
            entity.move_mode = MoveMode::MovePath;
            entity.animator.set_state(if entity.path.is_empty() {
                AnimState::Idle
            } else {
                AnimState::Walk
            });
        }

        if entity.path.is_empty() {
            if let Some(card) = promote_pending_cast(entity) {
                debug!(entity = %entity.id, card = %card.id, "Cast started");
                ctx.events
                    .push(GameEvent::card_started(ctx.step, entity.id, card.id.clone()));
            }
        }

        for queued in take_ready_actions(entity) {
            run_action(entity, &queued, &mut ctx);
        }
    }
}

/// Pass 2.
fn update_motion(state: &mut EncounterState, assets: &dyn AssetResolver, config: &StepConfig) {
    let step = state.step;

    for entity in state.entities.values_mut() {
        let start = entity.position;
        let points: Vec<Vec2> = match entity.move_mode {
            MoveMode::MoveVelocity => {
                if entity.velocity.length() <= config.rest_threshold {
                    entity.velocity = Vec2::ZERO;
                    Vec::new()
                } else {
                    let next = start + entity.velocity * config.delta;
                    let friction = (entity.friction * config.delta).clamp(0.0, 1.0);
                    entity.velocity -= entity.velocity * friction;
                    vec![next]
                }
            }
            MoveMode::MovePath => {
                let travel = entity.speed * config.delta;
                entity.path.take_motion_path(start, travel).points().to_vec()
            }
        };
        let motion = if points.is_empty() {
            Motion::Point(start)
        } else {
            Motion::Path { start, points: &points }
        };

        let hostile = state.colliders.hostile_to(entity.team, &state.hostility);
        let candidates = gather_candidates(
            entity.id,
            motion,
            entity.radius,
            entity.facing,
            &mut state.colliders,
            &hostile,
        );

        match resolve_collisions(candidates, entity.radius, &state.colliders) {
            Some(resolution) => {
                entity.move_to(resolution.position);
                let mut feedback = HitFeedback {
                    step,
                    assets,
                    config,
                    effects: &mut state.effects,
                    events: &mut state.pending_events,
                };
                feedback.apply(entity, &resolution.hits, &mut state.rng);
            }
            None => {
                // Only walking turns the entity; knockback slides keep the facing
                if entity.stun == 0 && entity.move_mode == MoveMode::MovePath {
                    entity.move_facing(motion.end());
                } else {
                    entity.move_to(motion.end());
                }
            }
        }

        entity.action_delay = entity.action_delay.saturating_sub(1);
    }
}

/// Damage application plus its effects and sound.
struct HitFeedback<'a> {
    step: u32,
    assets: &'a dyn AssetResolver,
    config: &'a StepConfig,
    effects: &'a mut Vec<VisualEffect>,
    events: &'a mut Vec<GameEvent>,
}

impl HitFeedback<'_> {
    fn apply(
        &mut self,
        entity: &mut Entity,
        hits: &[PathCollisionResult],
        rng: &mut DeterministicRng,
    ) {
        if hits.is_empty() {
            return;
        }
        let config = self.config;
        for hit in hits {
            entity.hit_with_collision(hit);
            debug!(entity = %entity.id, damage = hit.damage, stun = hit.stun, health = entity.health, "Entity hit");
            self.events.push(GameEvent::entity_hit(
                self.step,
                entity.id,
                hit.damage,
                hit.stun,
                entity.health,
            ));

            let direction = hit.knockback_direction;
            let position = entity.position + direction * entity.radius * config.hit_effect_distance;
            self.spawn(&config.hit_effect_id, position, direction);
            for effect_id in &hit.effects {
                self.spawn(effect_id, entity.position, direction);
            }
        }

        if let Some(sound) = rng.choose(&config.hit_sound_ids) {
            self.events
                .push(GameEvent::sound_played(self.step, sound.clone(), entity.position));
        }
    }

    fn spawn(&mut self, effect_id: &str, position: Vec2, direction: Vec2) {
        if spawn_effect(self.assets, self.effects, effect_id, position, direction) {
            self.events
                .push(GameEvent::effect_spawned(self.step, effect_id, position, direction));
        }
    }
}

/// Pass 6. Returns `true` if the player died.
fn remove_dead(state: &mut EncounterState) -> bool {
    let dead: Vec<EntityId> = state
        .entities
        .values()
        .filter(|entity| !entity.is_alive())
        .map(|entity| entity.id)
        .collect();

    if let Some(player) = state.player.filter(|player| dead.contains(player)) {
        if let Some(entity) = state.entities.get_mut(&player) {
            entity.deck.discard_hand();
        }
        state.phase = EncounterPhase::Ended;
        info!(step = state.step, player = %player, "Player died, encounter ended");
        state.push_event(GameEvent::encounter_ended(state.step, player));
        return true;
    }

    for id in dead {
        state.entities.remove(&id);
        debug!(entity = %id, "Entity removed");
        state.push_event(GameEvent::entity_removed(state.step, id));
    }
    false
}

/// Run up to `steps` steps, stopping early if the encounter ends.
pub fn advance(
    state: &mut EncounterState,
    assets: &dyn AssetResolver,
    config: &StepConfig,
    steps: u32,
) -> TickResult {
    let mut result = TickResult {
        step: state.step,
        events: Vec::new(),
        encounter_ended: state.is_ended(),
    };
    for _ in 0..steps {
        let tick_result = tick(state, assets, config);
        result.step = tick_result.step;
        result.events.extend(tick_result.events);
        if tick_result.encounter_ended {
            result.encounter_ended = true;
            break;
        }
    }
    result
}

/// Run one turn of `config.steps_per_turn` steps.
pub fn run_turn(state: &mut EncounterState, assets: &dyn AssetResolver, config: &StepConfig) -> TickResult {
    advance(state, assets, config, config.steps_per_turn)
}

// =============================================================================
// REPLAY
// =============================================================================

/// A recorded caller command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Spawn the player entity
    SpawnPlayer { definition_id: String, position: Vec2 },
    /// Spawn an entity on a team
    SpawnEntity {
        definition_id: String,
        team: TeamId,
        position: Vec2,
    },
    /// Queue a cast by card id
    QueueCard {
        entity: EntityId,
        card_id: String,
        target: CastTarget,
    },
    /// Queue a cast from hand
    PlayCardFromHand {
        entity: EntityId,
        index: usize,
        target: CastTarget,
    },
    /// Draw cards into hand
    DrawCards { entity: EntityId, amount: usize },
    /// Replace a planned path
    SetPlannedPath { entity: EntityId, points: Vec<Vec2> },
    /// Plan every enemy's turn
    PlanEnemyTurns,
    /// Run one turn
    RunTurn,
    /// Run a number of steps
    Advance(u32),
}

/// Apply one command. Returns the events it produced.
pub fn apply_command(
    state: &mut EncounterState,
    assets: &dyn AssetResolver,
    config: &StepConfig,
    command: &Command,
) -> Result<Vec<GameEvent>, CommandError> {
    match command {
        Command::SpawnPlayer { definition_id, position } => {
            state.spawn_player(assets, definition_id, *position)?;
        }
        Command::SpawnEntity {
            definition_id,
            team,
            position,
        } => {
            state.spawn_entity(assets, definition_id, *team, *position)?;
        }
        Command::QueueCard { entity, card_id, target } => {
            state.queue_card(assets, *entity, card_id, *target)?;
        }
        Command::PlayCardFromHand { entity, index, target } => {
            state.play_card_from_hand(*entity, *index, *target)?;
        }
        Command::DrawCards { entity, amount } => {
            state.draw_cards(*entity, *amount)?;
        }
        Command::SetPlannedPath { entity, points } => {
            state.set_planned_path(*entity, points.iter().copied())?;
        }
        Command::PlanEnemyTurns => {
            state.plan_enemy_turns();
        }
        Command::RunTurn => {
            let mut events = state.take_events();
            events.extend(run_turn(state, assets, config).events);
            return Ok(events);
        }
        Command::Advance(steps) => {
            let mut events = state.take_events();
            events.extend(advance(state, assets, config, *steps).events);
            return Ok(events);
        }
    }
    Ok(state.take_events())
}

/// Replay an encounter from a seed and a recorded command script.
///
/// Returns the final state and every event produced.
pub fn replay_encounter(
    seed: u64,
    assets: &dyn AssetResolver,
    config: &StepConfig,
    commands: &[Command],
) -> Result<(EncounterState, Vec<GameEvent>), CommandError> {
    let mut state = EncounterState::new(seed);
    let mut all_events = Vec::new();
    for command in commands {
        all_events.extend(apply_command(&mut state, assets, config, command)?);
        if state.is_ended() {
            break;
        }
    }
    Ok((state, all_events))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use proptest::prelude::*;

    use super::*;
    use crate::game::assets::AssetLibrary;
    use crate::game::card::{Card, CardAction};
    use crate::game::collider::{CardCollider, ColliderShape, HitCollider, SubCollider};
    use crate::game::effect::EffectDefinition;
    use crate::game::entity::{EntityDefinition, PLAYER_TEAM};
    use crate::game::events::GameEventData;

    fn definition(id: &str, max_health: i32, speed: f32) -> EntityDefinition {
        EntityDefinition {
            id: id.into(),
            max_health,
            speed,
            radius: 0.5,
            friction: 3.0,
            animations: BTreeMap::new(),
            cards: vec!["slash".into()],
            item: None,
        }
    }

    fn library() -> AssetLibrary {
        let mut library = AssetLibrary::new();
        library.insert_entity(definition("runner", 10, 15.0));
        library.insert_entity(definition("ghoul", 10, 4.0));
        library.insert_entity(definition("frail", 1, 4.0));
        library.insert_effect(EffectDefinition {
            id: "sparks".into(),
            frame_count: 3,
            frame_step: 2,
            kind: Default::default(),
            size: 1.0,
        });
        library.insert_card(Card {
            id: "slash".into(),
            delay: 6,
            actions: vec![CardAction {
                face_target: true,
                colliders: vec![CardCollider {
                    duration: 5,
                    shapes: vec![ColliderShape {
                        offset: Vec2::new(0.0, 1.0),
                        radius: 1.0,
                        knockback: 4.0,
                        damage: 3,
                        knockback_direction: Vec2::Y,
                    }],
                    effects: Vec::new(),
                    stun: 10,
                }],
                sound_id: Some("swing".into()),
                ..CardAction::default()
            }],
        });
        library.insert_card(Card {
            id: "combo".into(),
            delay: 0,
            actions: vec![
                CardAction {
                    sound_id: Some("first".into()),
                    ..CardAction::default()
                },
                CardAction {
                    delay: 3,
                    sound_id: Some("second".into()),
                    ..CardAction::default()
                },
            ],
        });
        library
    }

    fn hazard(team: TeamId, position: Vec2, radius: f32, damage: i32, stun: u32) -> HitCollider {
        HitCollider {
            duration: 10,
            shapes: vec![SubCollider {
                position,
                radius,
                knockback: 2.0,
                damage,
                knockback_direction: Vec2::X,
            }],
            effects: Vec::new(),
            stun,
            team,
            struck: BTreeSet::new(),
        }
    }

    fn sounds(events: &[GameEvent]) -> Vec<(u32, String)> {
        events
            .iter()
            .filter_map(|event| match &event.data {
                GameEventData::SoundPlayed { sound_id, .. } => Some((event.step, sound_id.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_swept_hit_snaps_damages_and_knocks_back() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let runner = state.spawn_entity(&library, "runner", 1, Vec2::ZERO).unwrap();
        state.set_planned_path(runner, [Vec2::new(3.0, 0.0)]).unwrap();
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::new(1.0, 0.0), 0.5, 5, 0));
        state.take_events();

        let result = tick(&mut state, &library, &config);

        let entity = state.entity(runner).unwrap();
        assert!((entity.position - Vec2::new(0.5, 0.0)).length() < 1e-5);
        assert_eq!(entity.health, 5);
        assert_eq!(entity.velocity, Vec2::new(2.0, 0.0));
        assert!(entity.path.is_empty());
        assert_eq!(entity.move_mode, MoveMode::MoveVelocity);

        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::EntityHit { damage: 5, health: 5, .. })));
        let hit_sounds = sounds(&result.events);
        assert_eq!(hit_sounds.len(), 1);
        assert!(hit_sounds[0].1 == "hit1" || hit_sounds[0].1 == "hit2");
        // Sparks spawned along the knockback, 2.5 radii out
        assert_eq!(state.effects.len(), 1);
        assert!((state.effects[0].position - Vec2::new(1.75, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_hazard_strikes_once_across_steps() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let ghoul = state.spawn_entity(&library, "ghoul", 1, Vec2::ZERO).unwrap();
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::ZERO, 1.0, 2, 0));

        advance(&mut state, &library, &config, 5);
        assert_eq!(state.entity(ghoul).unwrap().health, 8);
    }

    #[test]
    fn test_allied_hazard_is_ignored() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let ghoul = state.spawn_entity(&library, "ghoul", 1, Vec2::ZERO).unwrap();
        state.colliders.add(hazard(2, Vec2::ZERO, 1.0, 2, 0));
        state.hostility.ally(1, 2);

        tick(&mut state, &library, &config);
        assert_eq!(state.entity(ghoul).unwrap().health, 10);
    }

    #[test]
    fn test_simultaneous_hits_take_max_stun() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let ghoul = state.spawn_entity(&library, "ghoul", 1, Vec2::ZERO).unwrap();
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::ZERO, 1.0, 1, 4));
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::new(0.2, 0.0), 1.0, 1, 9));
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::new(-0.2, 0.0), 1.0, 1, 6));

        tick(&mut state, &library, &config);
        let entity = state.entity(ghoul).unwrap();
        assert_eq!(entity.health, 7);
        // Max of 4, 9, 6, minus the pass 3 countdown
        assert_eq!(entity.stun, 8);
    }

    #[test]
    fn test_card_actions_fire_on_their_delays() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let player = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        state
            .queue_card(&library, player, "combo", CastTarget::Direction(Vec2::X))
            .unwrap();

        let result = advance(&mut state, &library, &config, 6);
        assert_eq!(
            sounds(&result.events),
            vec![(1, "first".to_string()), (4, "second".to_string())]
        );
    }

    #[test]
    fn test_cast_waits_for_path_to_finish() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let player = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        // 4 units/s at 1/30 s per step: 0.35 takes three steps
        state.set_planned_path(player, [Vec2::new(0.35, 0.0)]).unwrap();
        state
            .queue_card(&library, player, "combo", CastTarget::Direction(Vec2::X))
            .unwrap();

        let result = advance(&mut state, &library, &config, 5);
        assert_eq!(sounds(&result.events)[0], (4, "first".to_string()));
    }

    #[test]
    fn test_enemy_card_hits_player() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(5);
        let player = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        let enemy = state.spawn_entity(&library, "ghoul", 1, Vec2::new(1.5, 0.0)).unwrap();
        state
            .queue_card(&library, enemy, "slash", CastTarget::Entity(player))
            .unwrap();

        let result = tick(&mut state, &library, &config);

        // The enemy turned to face the player and its collider landed on it
        let caster = state.entity(enemy).unwrap();
        assert!((caster.facing.abs() - 180.0).abs() < 1e-3);
        let target = state.entity(player).unwrap();
        assert_eq!(target.health, 7);
        assert_eq!(target.stun, 9);
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::ColliderSpawned { team: 1, .. })));
        assert_eq!(caster.action_delay, 5);
    }

    #[test]
    fn test_velocity_mode_applies_friction() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let player = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        {
            let entity = state.entities.get_mut(&player).unwrap();
            entity.set_stun(3);
            entity.velocity = Vec2::new(3.0, 0.0);
        }

        tick(&mut state, &library, &config);
        let entity = state.entity(player).unwrap();
        assert!((entity.position.x - 0.1).abs() < 1e-5);
        // friction 3 * 1/30 = 10% per step
        assert!((entity.velocity.x - 2.7).abs() < 1e-5);
        assert_eq!(entity.stun, 2);
    }

    #[test]
    fn test_knockback_slide_strikes_next_hazard_once() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let ghoul = state.spawn_entity(&library, "ghoul", 1, Vec2::ZERO).unwrap();

        let mut launcher = hazard(PLAYER_TEAM, Vec2::ZERO, 0.6, 1, 10);
        launcher.shapes[0].knockback = 6.0;
        state.colliders.add(launcher);
        // Out of reach until the slide covers 0.3
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::new(1.3, 0.0), 0.5, 2, 4));

        let result = advance(&mut state, &library, &config, 9);

        let hits: Vec<(u32, i32)> = result
            .events
            .iter()
            .filter_map(|event| match event.data {
                GameEventData::EntityHit { entity_id, damage, .. } if entity_id == ghoul => {
                    Some((event.step, damage))
                }
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![(1, 1), (3, 2)]);

        let entity = state.entity(ghoul).unwrap();
        assert_eq!(entity.health, 7);
        assert!(entity.position.x > 0.3);
        assert_eq!(entity.position.y, 0.0);
    }

    #[test]
    fn test_only_walking_turns_the_entity() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let slider = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        let walker = state.spawn_entity(&library, "ghoul", 1, Vec2::new(5.0, 0.0)).unwrap();
        {
            let entity = state.entities.get_mut(&slider).unwrap();
            entity.set_stun(3);
            entity.velocity = Vec2::new(0.0, -3.0);
        }
        state.set_planned_path(walker, [Vec2::new(5.0, -1.0)]).unwrap();

        tick(&mut state, &library, &config);

        let slid = state.entity(slider).unwrap();
        assert!(slid.position.y < 0.0);
        assert_eq!(slid.target_facing, 0.0);
        let walked = state.entity(walker).unwrap();
        assert!((walked.target_facing - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_resting_velocity_snaps_to_zero() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let player = state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        {
            let entity = state.entities.get_mut(&player).unwrap();
            entity.set_stun(3);
            entity.velocity = Vec2::new(0.005, 0.0);
        }
        tick(&mut state, &library, &config);
        let entity = state.entity(player).unwrap();
        assert_eq!(entity.velocity, Vec2::ZERO);
        assert_eq!(entity.position, Vec2::ZERO);
    }

    #[test]
    fn test_dead_enemy_is_removed() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        let frail = state.spawn_entity(&library, "frail", 1, Vec2::ZERO).unwrap();
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::ZERO, 1.0, 3, 0));

        let result = tick(&mut state, &library, &config);
        assert!(state.entity(frail).is_none());
        assert!(!result.encounter_ended);
        assert!(result
            .events
            .iter()
            .any(|e| e.data == GameEventData::EntityRemoved { entity_id: frail }));
    }

    #[test]
    fn test_player_death_ends_encounter() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        let player = state.spawn_player(&library, "frail", Vec2::ZERO).unwrap();
        let frail = state.spawn_entity(&library, "frail", 1, Vec2::new(0.5, 0.0)).unwrap();
        state.colliders.add(hazard(1, Vec2::ZERO, 1.0, 3, 0));
        state.colliders.add(hazard(PLAYER_TEAM, Vec2::new(0.5, 0.0), 1.0, 3, 0));

        let result = tick(&mut state, &library, &config);
        assert!(result.encounter_ended);
        assert!(state.is_ended());
        // Remaining passes are skipped: the dead enemy is still registered
        assert!(state.entity(frail).is_some());
        assert!(state.entity(player).is_some());

        // Stepping an ended encounter is a no-op
        let step = state.step;
        let again = tick(&mut state, &library, &config);
        assert!(again.encounter_ended);
        assert_eq!(state.step, step);
    }

    #[test]
    fn test_empty_encounter_is_noop() {
        let library = library();
        let mut state = EncounterState::new(1);
        let result = tick(&mut state, &library, &StepConfig::default());
        assert_eq!(result.step, 0);
        assert!(!result.encounter_ended);
        assert!(result.events.is_empty());
    }

    #[test]
    fn test_colliders_expire() {
        let library = library();
        let config = StepConfig::default();
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::new(0.0, 20.0)).unwrap();
        state.colliders.add(hazard(1, Vec2::new(9.0, 9.0), 0.5, 1, 0));

        advance(&mut state, &library, &config, 9);
        assert_eq!(state.colliders.len(), 1);
        tick(&mut state, &library, &config);
        assert!(state.colliders.is_empty());
    }

    #[test]
    fn test_run_turn_length() {
        let library = library();
        let config = StepConfig {
            steps_per_turn: 12,
            ..StepConfig::default()
        };
        let mut state = EncounterState::new(1);
        state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
        let result = run_turn(&mut state, &library, &config);
        assert_eq!(result.step, 12);
        assert_eq!(state.step, 12);
    }

    #[test]
    fn test_step_config_defaults() {
        let config = StepConfig::default();
        assert_eq!(config.delta, 1.0 / 30.0);
        assert_eq!(config.steps_per_turn, 60);
        assert_eq!(config.hit_effect_id, "sparks");
        assert_eq!(config.hit_sound_ids, vec!["hit1".to_string(), "hit2".to_string()]);
        assert_eq!(env_or("CONDEMNED_TEST_UNSET_KEY", 7u32), 7);
    }

    fn script() -> Vec<Command> {
        vec![
            Command::SpawnPlayer {
                definition_id: "ghoul".into(),
                position: Vec2::ZERO,
            },
            Command::SpawnEntity {
                definition_id: "ghoul".into(),
                team: 1,
                position: Vec2::new(6.0, 1.0),
            },
            Command::SpawnEntity {
                definition_id: "ghoul".into(),
                team: 1,
                position: Vec2::new(-4.0, 3.0),
            },
            Command::DrawCards {
                entity: EntityId(0),
                amount: 1,
            },
            Command::PlayCardFromHand {
                entity: EntityId(0),
                index: 0,
                target: CastTarget::Entity(EntityId(1)),
            },
            Command::PlanEnemyTurns,
            Command::RunTurn,
            Command::SetPlannedPath {
                entity: EntityId(0),
                points: vec![Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)],
            },
            Command::PlanEnemyTurns,
            Command::RunTurn,
        ]
    }

    #[test]
    fn test_replay_determinism() {
        let library = library();
        let config = StepConfig::default();

        let (first, events1) = replay_encounter(99, &library, &config, &script()).unwrap();
        let (second, events2) = replay_encounter(99, &library, &config, &script()).unwrap();

        assert_eq!(first.compute_hash(), second.compute_hash());
        assert_eq!(events1.len(), events2.len());
        for (a, b) in events1.iter().zip(&events2) {
            assert_eq!(a.data, b.data);
        }
        assert!(first.step > 0);
    }

    #[test]
    fn test_replay_rejects_bad_command() {
        let library = library();
        let commands = vec![Command::QueueCard {
            entity: EntityId(3),
            card_id: "slash".into(),
            target: CastTarget::Direction(Vec2::X),
        }];
        assert_eq!(
            replay_encounter(1, &library, &StepConfig::default(), &commands).unwrap_err(),
            CommandError::UnknownEntity(EntityId(3))
        );
    }

    proptest! {
        #[test]
        fn prop_health_never_exceeds_max(
            seed in any::<u64>(),
            enemies in prop::collection::vec((-6i32..6, -6i32..6), 1..5),
            turns in 1usize..4,
        ) {
            let library = library();
            let config = StepConfig { steps_per_turn: 20, ..StepConfig::default() };
            let mut state = EncounterState::new(seed);
            state.spawn_player(&library, "ghoul", Vec2::ZERO).unwrap();
            for (x, y) in enemies {
                state
                    .spawn_entity(&library, "ghoul", 1, Vec2::new(x as f32 + 0.5, y as f32))
                    .unwrap();
            }

            for _ in 0..turns {
                state.plan_enemy_turns();
                run_turn(&mut state, &library, &config);
                for entity in state.entities.values() {
                    prop_assert!(entity.health <= entity.max_health);
                    prop_assert!(entity.stun <= 10);
                }
                if state.is_ended() {
                    break;
                }
            }
        }
    }
}

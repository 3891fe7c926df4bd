//! Condemned Simulator
//!
//! Headless runner for the combat core. Loads an asset manifest (the
//! first argument, or a built-in demo set), plays a short scripted
//! encounter and verifies it replays to the same state hash.

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use condemned::{
    game::{
        card::CastTarget,
        events::GameEventData,
        tick::{apply_command, replay_encounter, Command},
    },
    AssetLibrary, EncounterState, StepConfig, STEP_RATE, VERSION,
};

const DEMO_SEED: u64 = 12345;
const DEMO_TURNS: usize = 4;

const DEMO_ASSETS: &str = r#"{
    "animations": {
        "husk_idle": "2/Spine+Head/1#0_0_0_1+0_0_0?2#0_0_0_1+0_0.1_0/2"
    },
    "effects": [
        { "id": "sparks", "frame_count": 4, "frame_step": 2, "kind": "Directional" }
    ],
    "cards": [
        {
            "id": "cleave",
            "delay": 20,
            "actions": [
                { "face_target": true, "sound_id": "swing" },
                {
                    "delay": 6,
                    "colliders": [{
                        "duration": 8,
                        "stun": 12,
                        "shapes": [
                            { "offset": [0.0, 1.0], "radius": 0.8, "knockback": 6.0, "damage": 3 },
                            { "offset": [0.6, 0.7], "radius": 0.5, "knockback": 4.0, "damage": 2, "knockback_direction": [1.0, 0.0] }
                        ]
                    }]
                }
            ]
        },
        {
            "id": "lunge",
            "delay": 15,
            "actions": [
                { "face_target": true, "velocity": [0.0, 9.0] },
                {
                    "delay": 4,
                    "colliders": [{
                        "duration": 4,
                        "stun": 6,
                        "shapes": [{ "offset": [0.0, 0.8], "radius": 0.6, "knockback": 3.0, "damage": 2 }]
                    }]
                }
            ]
        }
    ],
    "entities": [
        {
            "id": "warden",
            "max_health": 20,
            "speed": 5.0,
            "radius": 0.5,
            "friction": 4.0,
            "animations": { "idle": "husk_idle" },
            "cards": ["cleave", "cleave", "lunge", "lunge"],
            "item": "halberd"
        },
        {
            "id": "husk",
            "max_health": 6,
            "speed": 4.0,
            "radius": 0.45,
            "friction": 3.0,
            "animations": { "idle": "husk_idle" },
            "cards": ["lunge"]
        }
    ]
}"#;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Condemned Simulator v{}", VERSION);
    info!("Step Rate: {} Hz", STEP_RATE);

    let assets = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading assets from {}", path);
            AssetLibrary::load_manifest(&path).with_context(|| format!("loading {path}"))?
        }
        None => AssetLibrary::from_json(DEMO_ASSETS).context("parsing demo assets")?,
    };

    demo_encounter(&assets)
}

/// Build the scripted opening and the per-turn commands.
fn demo_script() -> Vec<Command> {
    let player = condemned::game::EntityId(0);
    let mut script = vec![
        Command::SpawnPlayer {
            definition_id: "warden".into(),
            position: Vec2::ZERO,
        },
        Command::SpawnEntity {
            definition_id: "husk".into(),
            team: 1,
            position: Vec2::new(7.0, 2.0),
        },
        Command::SpawnEntity {
            definition_id: "husk".into(),
            team: 1,
            position: Vec2::new(-6.0, -3.0),
        },
        Command::SpawnEntity {
            definition_id: "husk".into(),
            team: 1,
            position: Vec2::new(1.0, 8.0),
        },
    ];

    for turn in 0..DEMO_TURNS {
        let target = condemned::game::EntityId(1 + (turn as u32 % 3));
        script.push(Command::DrawCards {
            entity: player,
            amount: 1,
        });
        script.push(Command::PlayCardFromHand {
            entity: player,
            index: 0,
            target: CastTarget::Entity(target),
        });
        script.push(Command::PlanEnemyTurns);
        script.push(Command::RunTurn);
    }
    script
}

/// Play the demo encounter, then replay it from the script.
fn demo_encounter(assets: &AssetLibrary) -> Result<()> {
    info!("=== Starting Demo Encounter ===");
    info!("RNG Seed: {}", DEMO_SEED);

    let config = StepConfig::from_env();
    let script = demo_script();
    let mut state = EncounterState::new(DEMO_SEED);
    let mut executed = Vec::new();
    let mut total_events = 0;

    for command in &script {
        let events = match apply_command(&mut state, assets, &config, command) {
            Ok(events) => events,
            // An empty hand just skips the player's card for this turn
            Err(err) => {
                info!("Command {:?} rejected: {}", command, err);
                continue;
            }
        };
        executed.push(command.clone());
        total_events += events.len();

        // Log important events
        for event in &events {
            match &event.data {
                GameEventData::EntityHit {
                    entity_id,
                    damage,
                    health,
                    ..
                } => {
                    info!("Step {}: {} hit for {} ({} left)", event.step, entity_id, damage, health);
                }
                GameEventData::EntityRemoved { entity_id } => {
                    info!("Step {}: {} destroyed", event.step, entity_id);
                }
                GameEventData::EncounterEnded { player_id, steps } => {
                    info!("Encounter ended: {} fell after {} steps", player_id, steps);
                }
                _ => {}
            }
        }

        if matches!(command, Command::RunTurn) {
            info!(
                "Turn done at step {}: {} entities, {} colliders, {} effects",
                state.step,
                state.entity_count(),
                state.colliders.len(),
                state.effects.len()
            );
        }
        if state.is_ended() {
            break;
        }
    }

    // Print final results
    info!("=== Encounter Results ===");
    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    for snapshot in state.render_frame().entities {
        info!(
            "{} {:<8} team {} at ({:.2}, {:.2}) health {}/{}",
            snapshot.id,
            snapshot.definition_id,
            snapshot.team,
            snapshot.position.x,
            snapshot.position.y,
            snapshot.health,
            snapshot.max_health
        );
    }
    info!("Total events: {}", total_events);

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let (replayed, _) = replay_encounter(DEMO_SEED, assets, &config, &executed).context("replaying demo")?;
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        anyhow::bail!("DETERMINISM FAILURE: Hashes differ!")
    }
}

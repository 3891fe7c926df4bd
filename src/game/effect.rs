//! Visual Effects
//!
//! Flipbook effects spawned by card actions and hits. The simulation only
//! tracks their placement, the current flipbook frame and their lifetime;
//! drawing them is the renderer's job.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::hash::StateHasher;
use crate::game::assets::AssetResolver;

/// How the renderer orients an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectKind {
    /// Billboard facing the camera
    #[default]
    FaceCamera,
    /// Oriented along the spawn direction
    Directional,
    /// Flat on the ground
    Grounded,
}

/// Static effect data, resolved by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Effect id
    pub id: String,
    /// Flipbook frames
    pub frame_count: u32,
    /// Simulation steps per flipbook frame
    pub frame_step: u32,
    /// Orientation mode
    #[serde(default)]
    pub kind: EffectKind,
    /// Render size
    #[serde(default = "default_size")]
    pub size: f32,
}

fn default_size() -> f32 {
    1.0
}

/// A live effect instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualEffect {
    /// Effect definition id
    pub effect_id: String,
    /// Orientation mode
    pub kind: EffectKind,
    /// World position
    pub position: Vec2,
    /// Spawn direction
    pub direction: Vec2,
    /// Render size
    pub size: f32,
    /// Current flipbook frame
    pub current_frame: u32,
    frame_count: u32,
    frame_step: u32,
    elapsed_frames: u32,
    total_played_frames: u32,
    duration: u32,
}

impl VisualEffect {
    /// Spawn an effect living for one full flipbook pass.
    pub fn new(definition: &EffectDefinition, position: Vec2, direction: Vec2) -> Self {
        Self {
            effect_id: definition.id.clone(),
            kind: definition.kind,
            position,
            direction,
            size: definition.size,
            current_frame: 0,
            frame_count: definition.frame_count,
            frame_step: definition.frame_step,
            elapsed_frames: 0,
            total_played_frames: 0,
            duration: definition.frame_count.saturating_mul(definition.frame_step),
        }
    }

    /// Advance one simulation step.
    pub fn step(&mut self) {
        if self.elapsed_frames >= self.frame_step {
            self.current_frame += 1;
            self.elapsed_frames = 0;
        }
        if self.current_frame >= self.frame_count {
            self.current_frame = 0;
        }
        self.elapsed_frames += 1;
        self.total_played_frames += 1;
    }

    /// Lifetime in steps.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Check if the effect outlived its duration.
    pub fn is_finished(&self) -> bool {
        self.total_played_frames > self.duration
    }

    /// Feed into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(&self.effect_id);
        hasher.update_vec2(self.position);
        hasher.update_u32(self.current_frame);
        hasher.update_u32(self.total_played_frames);
    }
}

/// Spawn an effect by id. Unknown ids are skipped.
///
/// Returns `true` if the effect was spawned.
pub fn spawn_effect(
    assets: &dyn AssetResolver,
    effects: &mut Vec<VisualEffect>,
    effect_id: &str,
    position: Vec2,
    direction: Vec2,
) -> bool {
    match assets.effect(effect_id) {
        Some(definition) => {
            effects.push(VisualEffect::new(&definition, position, direction));
            true
        }
        None => {
            debug!(effect = effect_id, "unknown effect");
            false
        }
    }
}

/// Step every effect and drop the finished ones. Returns how many ended.
pub fn age_effects(effects: &mut Vec<VisualEffect>) -> usize {
    let before = effects.len();
    effects.retain_mut(|effect| {
        effect.step();
        !effect.is_finished()
    });
    before - effects.len()
}

// =============================================================================
// TESTS
// =============================================================================

//! Animation Player
//!
//! Per-entity keyframe playback. The animator advances one frame per
//! simulation step and recomputes the bone pose only when the keyframe
//! assigned to the current frame changes (or a different clip starts).
//!
//! Two intents drive it:
//! - a persistent **state animation** (idle / walk / run), and
//! - a **one-shot** (attack, hit reaction) that plays once from frame 0
//!   and then hands back to the state animation.
//!
//! The pose is exported as plain data; whatever renders the entity copies
//! it onto its own rig.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::codec::{AnimationKeyframe, EntityAnimation};

/// Clip played when an entity is struck.
pub const HIT_ANIMATION: &str = "hit";

/// Persistent locomotion state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimState {
    /// Standing still
    #[default]
    Idle = 0,
    /// Moving along a path
    Walk = 1,
    /// Moving fast
    Run = 2,
}

impl AnimState {
    /// Clip id for this state.
    pub fn animation_id(self) -> &'static str {
        match self {
            AnimState::Idle => "idle",
            AnimState::Walk => "walk",
            AnimState::Run => "run",
        }
    }
}

/// Bind pose of a rig.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Local bind rotation per bone
    pub bind_rotations: Vec<Quat>,
    /// Local bind translation per bone
    pub bind_translations: Vec<Vec3>,
}

impl Skeleton {
    /// Skeleton with every bone at the origin, unrotated.
    pub fn identity(bone_count: usize) -> Self {
        Self {
            bind_rotations: vec![Quat::IDENTITY; bone_count],
            bind_translations: vec![Vec3::ZERO; bone_count],
        }
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.bind_rotations.len()
    }

    /// Grow to at least `bone_count` bones, new bones at identity.
    fn ensure_bones(&mut self, bone_count: usize) {
        if bone_count > self.bone_count() {
            self.bind_rotations.resize(bone_count, Quat::IDENTITY);
            self.bind_translations.resize(bone_count, Vec3::ZERO);
        }
    }

    /// Bind pose as a [`Pose`].
    fn bind_pose(&self) -> Pose {
        Pose {
            rotations: self.bind_rotations.clone(),
            translations: self.bind_translations.clone(),
        }
    }
}

/// Final local transform of every bone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Local rotation per bone
    pub rotations: Vec<Quat>,
    /// Local translation per bone
    pub translations: Vec<Vec3>,
}

/// Keyframe animation player for one entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityAnimator {
    animations: BTreeMap<String, Arc<EntityAnimation>>,
    skeleton: Skeleton,
    pose: Pose,
    playing: String,
    state_animation: String,
    last_posed: Option<String>,
    /// `None` until the playing clip shows its first frame
    current_frame: Option<usize>,
    active_keyframe: Option<usize>,
    state: AnimState,
}

impl Default for EntityAnimator {
    fn default() -> Self {
        Self::new(Skeleton::default())
    }
}

impl EntityAnimator {
    /// Create an animator idling on the given rig.
    pub fn new(skeleton: Skeleton) -> Self {
        let idle = AnimState::Idle.animation_id().to_string();
        Self {
            animations: BTreeMap::new(),
            pose: skeleton.bind_pose(),
            skeleton,
            playing: idle.clone(),
            state_animation: idle,
            last_posed: None,
            current_frame: None,
            active_keyframe: None,
            state: AnimState::Idle,
        }
    }

    /// Register a clip. Registering an id twice keeps the first clip.
    ///
    /// Returns `true` if the clip was newly added.
    pub fn add_animation(&mut self, id: impl Into<String>, animation: Arc<EntityAnimation>) -> bool {
        let id = id.into();
        if self.animations.contains_key(&id) {
            return false;
        }
        let bone_count = animation.bones.len();
        if bone_count > self.skeleton.bone_count() {
            self.skeleton.ensure_bones(bone_count);
            self.pose.rotations.resize(bone_count, Quat::IDENTITY);
            self.pose.translations.resize(bone_count, Vec3::ZERO);
        }
        self.animations.insert(id, animation);
        true
    }

    /// Check if a clip is registered.
    pub fn has_animation(&self, id: &str) -> bool {
        self.animations.contains_key(id)
    }

    /// Play a one-shot clip, then return to the state animation.
    ///
    /// Does nothing if the clip is already playing.
    pub fn play_animation(&mut self, id: &str) {
        if self.playing != id {
            self.force_play_animation(id);
        }
    }

    /// Restart a one-shot clip from frame 0 even if it is already playing.
    pub fn force_play_animation(&mut self, id: &str) {
        self.playing = id.to_string();
        self.restart();
    }

    /// Make `id` the persistent state animation and switch to it.
    pub fn play_state_animation(&mut self, id: &str) {
        self.state_animation = id.to_string();
        if self.playing != id {
            self.force_play_animation(id);
        }
    }

    /// Set the locomotion state. No-op if unchanged.
    pub fn set_state(&mut self, state: AnimState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.play_state_animation(state.animation_id());
    }

    /// Play the hit reaction, but only over idle or walk.
    pub fn play_hit(&mut self) {
        if self.playing == AnimState::Idle.animation_id()
            || self.playing == AnimState::Walk.animation_id()
        {
            self.force_play_animation(HIT_ANIMATION);
        }
    }

    fn restart(&mut self) {
        self.current_frame = None;
        self.active_keyframe = None;
    }

    /// Advance one frame.
    pub fn step(&mut self) {
        let Some(animation) = self.animations.get(&self.playing).cloned() else {
            trace!(animation = %self.playing, "clip not registered");
            // A missing one-shot must not trap the animator
            if self.playing != self.state_animation {
                let state_animation = self.state_animation.clone();
                self.force_play_animation(&state_animation);
            }
            return;
        };
        if animation.duration == 0 {
            return;
        }

        let mut frame = self.current_frame.map_or(0, |frame| frame + 1);
        if frame >= animation.duration {
            frame = 0;
            if self.playing != self.state_animation {
                let state_animation = self.state_animation.clone();
                self.force_play_animation(&state_animation);
                return;
            }
        }
        self.current_frame = Some(frame);

        let Some((index, keyframe)) = animation.keyframe_at(frame) else {
            return;
        };
        if self.active_keyframe != Some(index) || self.last_posed.as_deref() != Some(self.playing.as_str()) {
            self.active_keyframe = Some(index);
            self.last_posed = Some(self.playing.clone());
            self.apply_keyframe(keyframe);
        }
    }

    /// Compose the keyframe's delta pose onto the bind pose.
    ///
    /// Bones the keyframe does not cover stay at bind pose.
    fn apply_keyframe(&mut self, keyframe: &AnimationKeyframe) {
        let mut pose = self.skeleton.bind_pose();
        let deltas = keyframe.rotations.iter().zip(&keyframe.translations);
        for (bone, (delta_rotation, delta_translation)) in deltas.enumerate().take(self.skeleton.bone_count()) {
            let bind_rotation = self.skeleton.bind_rotations[bone];
            pose.rotations[bone] = bind_rotation * *delta_rotation;
            pose.translations[bone] =
                self.skeleton.bind_translations[bone] + bind_rotation * *delta_translation;
        }
        self.pose = pose;
    }

    /// Clip currently playing.
    pub fn playing(&self) -> &str {
        &self.playing
    }

    /// Persistent state clip.
    pub fn state_animation(&self) -> &str {
        &self.state_animation
    }

    /// Locomotion state.
    pub fn state(&self) -> AnimState {
        self.state
    }

    /// Frame shown by the playing clip, if it has started.
    pub fn current_frame(&self) -> Option<usize> {
        self.current_frame
    }

    /// Keyframe index the pose was computed from.
    pub fn active_keyframe(&self) -> Option<usize> {
        self.active_keyframe
    }

    /// Current bone pose.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Rig bind pose.
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::codec::{AnimationDocument, RawBonePose, RawKeyframe};

    /// One-bone clip whose keyframe `i` translates the bone by `-i` cm on X
    /// (so `+i/100` after conversion).
    fn clip(duration: u32, frames: &[u32]) -> Arc<EntityAnimation> {
        let document = AnimationDocument {
            duration,
            bones: vec!["Root".into()],
            keyframes: frames
                .iter()
                .enumerate()
                .map(|(i, &frame)| RawKeyframe {
                    frame,
                    bones: vec![RawBonePose {
                        translation: [-(i as f32), 0.0, 0.0],
                        ..RawBonePose::IDENTITY
                    }],
                })
                .collect(),
        };
        Arc::new(document.to_animation())
    }

    fn make_animator() -> EntityAnimator {
        let mut animator = EntityAnimator::default();
        animator.add_animation("idle", clip(4, &[1]));
        animator.add_animation("walk", clip(4, &[1, 3]));
        animator.add_animation("hit", clip(3, &[1, 2]));
        animator
    }

    #[test]
    fn test_starts_idle_with_bind_pose() {
        let animator = make_animator();
        assert_eq!(animator.playing(), "idle");
        assert_eq!(animator.state(), AnimState::Idle);
        assert_eq!(animator.pose().translations, vec![Vec3::ZERO]);
        assert_eq!(animator.current_frame(), None);
    }

    #[test]
    fn test_state_animation_loops() {
        let mut animator = make_animator();
        animator.set_state(AnimState::Walk);

        let frames: Vec<_> = (0..6)
            .map(|_| {
                animator.step();
                (animator.current_frame(), animator.active_keyframe())
            })
            .collect();

        assert_eq!(
            frames,
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(0)),
                (Some(2), Some(1)),
                (Some(3), Some(1)),
                (Some(0), Some(0)),
                (Some(1), Some(0)),
            ]
        );
        assert_eq!(animator.playing(), "walk");
    }

    #[test]
    fn test_pose_follows_keyframe() {
        let mut animator = make_animator();
        animator.set_state(AnimState::Walk);
        animator.step();
        assert_eq!(animator.pose().translations[0], Vec3::ZERO);
        animator.step();
        animator.step();
        assert!((animator.pose().translations[0] - Vec3::new(0.01, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_one_shot_returns_to_state_animation() {
        let mut animator = make_animator();
        animator.step();
        animator.play_animation("hit");
        assert_eq!(animator.playing(), "hit");

        // Frames 0, 1, 2 of the hit clip
        for expected in 0..3 {
            animator.step();
            assert_eq!(animator.current_frame(), Some(expected));
            assert_eq!(animator.playing(), "hit");
        }

        animator.step();
        assert_eq!(animator.playing(), "idle");
        animator.step();
        assert_eq!(animator.current_frame(), Some(0));
    }

    #[test]
    fn test_play_hit_only_over_idle_or_walk() {
        let mut animator = make_animator();
        animator.play_hit();
        assert_eq!(animator.playing(), "hit");

        let mut attacking = make_animator();
        attacking.add_animation("slash", clip(5, &[1]));
        attacking.play_animation("slash");
        attacking.play_hit();
        assert_eq!(attacking.playing(), "slash");
    }

    #[test]
    fn test_play_hit_restarts_from_frame_zero() {
        let mut animator = make_animator();
        animator.play_hit();
        animator.step();
        animator.step();
        assert_eq!(animator.current_frame(), Some(1));

        // Hit over walk restarts
        animator.set_state(AnimState::Walk);
        animator.play_hit();
        animator.step();
        assert_eq!(animator.current_frame(), Some(0));
    }

    #[test]
    fn test_set_state_same_state_is_noop() {
        let mut animator = make_animator();
        animator.set_state(AnimState::Walk);
        animator.step();
        animator.step();
        animator.set_state(AnimState::Walk);
        assert_eq!(animator.current_frame(), Some(1));
    }

    #[test]
    fn test_unregistered_clip_is_noop() {
        let mut animator = EntityAnimator::default();
        animator.play_animation("missing");
        animator.step();
        assert_eq!(animator.playing(), "idle");
        animator.step();
        assert_eq!(animator.current_frame(), None);
        assert!(animator.pose().rotations.is_empty());
    }

    #[test]
    fn test_add_animation_is_idempotent() {
        let mut animator = make_animator();
        assert!(!animator.add_animation("idle", clip(9, &[1])));
        assert!(animator.has_animation("idle"));
        for _ in 0..4 {
            animator.step();
        }
        // Still the 4-frame clip: wrapped back to 0
        assert_eq!(animator.current_frame(), Some(3));
        animator.step();
        assert_eq!(animator.current_frame(), Some(0));
    }

    #[test]
    fn test_pose_composes_with_bind_pose() {
        let bind = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let skeleton = Skeleton {
            bind_rotations: vec![bind],
            bind_translations: vec![Vec3::new(0.0, 0.0, 1.0)],
        };
        let mut animator = EntityAnimator::new(skeleton);
        // -100 cm on X decodes to +1 m on X
        let animation = EntityAnimation::decode("1/Root/1#0_0_0_1+-100_0_0/1").unwrap();
        animator.add_animation("idle", Arc::new(animation));
        animator.step();

        let pose = animator.pose();
        assert!((pose.translations[0] - Vec3::new(0.0, 1.0, 1.0)).length() < 1e-5);
        assert!(pose.rotations[0].abs_diff_eq(bind, 1e-6));
    }

    #[test]
    fn test_bones_missing_from_keyframe_stay_at_bind() {
        let skeleton = Skeleton {
            bind_rotations: vec![Quat::IDENTITY; 3],
            bind_translations: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        };
        let mut animator = EntityAnimator::new(skeleton);
        let animation = EntityAnimation::decode("1/A+B/1#0_0_0_1+-100_0_0/1").unwrap();
        animator.add_animation("idle", Arc::new(animation));
        animator.step();

        let pose = animator.pose();
        assert_eq!(pose.translations.len(), 3);
        assert_eq!(pose.translations[1], Vec3::X);
        assert_eq!(pose.translations[2], Vec3::Y);
    }
}

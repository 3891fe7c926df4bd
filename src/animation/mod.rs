//! Skeletal animation: compact text codec and per-entity playback.

pub mod codec;
pub mod player;

pub use codec::{AnimationDocument, AnimationError, AnimationKeyframe, EntityAnimation};
pub use player::{AnimState, EntityAnimator, Pose, Skeleton};

//! Animation Codec
//!
//! Compact text encoding for skeletal keyframe animations:
//!
//! ```text
//! duration / bone+bone+... / keyframe?keyframe?... / keyframeCount
//!
//! keyframe = frame # rx_ry_rz_rw+tx_ty_tz # rx_ry_rz_rw+tx_ty_tz ...
//! ```
//!
//! Frames are 1-based in the text and 0-based once decoded. Each keyframe
//! holds from its own frame until the next keyframe's frame; the last one
//! holds until the end of the clip.
//!
//! [`AnimationDocument`] is the lossless textual form (parse with `FromStr`,
//! encode with `Display`). [`EntityAnimation`] is the decoded, playable form
//! with handedness and units converted for the simulation.

use std::fmt;
use std::str::FromStr;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Units in the source text are centimetres.
const TRANSLATION_SCALE: f32 = 100.0;

/// Longest clip accepted, in frames.
pub const MAX_ANIMATION_FRAMES: u32 = 1 << 16;

// =============================================================================
// ERRORS
// =============================================================================

/// Malformed animation data.
///
/// Fatal to that asset only; the step loop never sees these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationError {
    #[error("expected 4 '/'-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("invalid {field} {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("declared {declared} keyframes but listed {listed}")]
    KeyframeCountMismatch { declared: usize, listed: usize },

    #[error("keyframe {keyframe} lists {entries} bone entries for {bones} bones")]
    TooManyBoneEntries {
        keyframe: usize,
        entries: usize,
        bones: usize,
    },

    #[error("keyframe {keyframe} bone {bone}: expected 'rotation+translation'")]
    MalformedBoneEntry { keyframe: usize, bone: usize },

    #[error("keyframe {keyframe} bone {bone}: {kind} needs {expected} components, found {found}")]
    ComponentCount {
        keyframe: usize,
        bone: usize,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("keyframe {keyframe}: frame {frame} outside 1..={duration}")]
    FrameOutOfRange {
        keyframe: usize,
        frame: u32,
        duration: u32,
    },

    #[error("keyframe {keyframe}: frame {frame} comes before previous frame {previous}")]
    FrameOrder {
        keyframe: usize,
        frame: u32,
        previous: u32,
    },

    #[error("animation lasts {0} frames but has no keyframes")]
    NoKeyframes(u32),

    #[error("duration {duration} exceeds the {max} frame limit")]
    DurationTooLong { duration: u32, max: u32 },
}

// =============================================================================
// TEXTUAL FORM
// =============================================================================

/// One bone entry exactly as written in the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBonePose {
    /// `x, y, z, w` as written
    pub rotation: [f32; 4],
    /// `x, y, z` as written (centimetres)
    pub translation: [f32; 3],
}

impl RawBonePose {
    /// Identity rotation, zero translation.
    pub const IDENTITY: Self = Self {
        rotation: [0.0, 0.0, 0.0, 1.0],
        translation: [0.0, 0.0, 0.0],
    };
}

/// One keyframe exactly as written in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeyframe {
    /// 1-based frame index
    pub frame: u32,
    /// Bone entries; may be shorter than the bone list
    pub bones: Vec<RawBonePose>,
}

/// Validated, lossless textual form of an animation.
///
/// `doc.to_string().parse::<AnimationDocument>() == Ok(doc)` for every
/// document the parser accepts, and re-encoding a parsed string reproduces
/// it byte for byte when it was produced by this encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDocument {
    /// Clip length in frames
    pub duration: u32,
    /// Bone names, in rig order
    pub bones: Vec<String>,
    /// Keyframes in non-decreasing frame order
    pub keyframes: Vec<RawKeyframe>,
}

impl AnimationDocument {
    /// Check the structural rules the parser enforces.
    ///
    /// Documents built in code (tooling) should be validated before encoding.
    pub fn validate(&self) -> Result<(), AnimationError> {
        if self.duration > MAX_ANIMATION_FRAMES {
            return Err(AnimationError::DurationTooLong {
                duration: self.duration,
                max: MAX_ANIMATION_FRAMES,
            });
        }
        if self.duration > 0 && self.keyframes.is_empty() {
            return Err(AnimationError::NoKeyframes(self.duration));
        }

        let mut previous = 1;
        for (index, keyframe) in self.keyframes.iter().enumerate() {
            if keyframe.frame < 1 || keyframe.frame > self.duration {
                return Err(AnimationError::FrameOutOfRange {
                    keyframe: index,
                    frame: keyframe.frame,
                    duration: self.duration,
                });
            }
            if keyframe.frame < previous {
                return Err(AnimationError::FrameOrder {
                    keyframe: index,
                    frame: keyframe.frame,
                    previous,
                });
            }
            if keyframe.bones.len() > self.bones.len() {
                return Err(AnimationError::TooManyBoneEntries {
                    keyframe: index,
                    entries: keyframe.bones.len(),
                    bones: self.bones.len(),
                });
            }
            previous = keyframe.frame;
        }
        Ok(())
    }

    /// Convert to the playable form.
    pub fn to_animation(&self) -> EntityAnimation {
        let bone_count = self.bones.len();
        let keyframes = self
            .keyframes
            .iter()
            .map(|raw| {
                let mut keyframe = AnimationKeyframe::identity(bone_count);
                for (bone, pose) in raw.bones.iter().take(bone_count).enumerate() {
                    keyframe.rotations[bone] = convert_rotation(pose.rotation);
                    keyframe.translations[bone] = convert_translation(pose.translation);
                }
                keyframe
            })
            .collect::<Vec<_>>();

        let duration = self.duration.min(MAX_ANIMATION_FRAMES) as usize;
        let mut assigned_keyframes = vec![0; duration];
        let mut last_frame = 0;
        for (index, raw) in self.keyframes.iter().enumerate() {
            let frame = (raw.frame as usize)
                .saturating_sub(1)
                .clamp(last_frame, duration);
            // Frames before the first keyframe hold keyframe 0
            let held = index.saturating_sub(1);
            for slot in &mut assigned_keyframes[last_frame..frame] {
                *slot = held;
            }
            last_frame = frame;
        }
        let last = keyframes.len().saturating_sub(1);
        for slot in &mut assigned_keyframes[last_frame..] {
            *slot = last;
        }

        EntityAnimation {
            bones: self.bones.clone(),
            keyframes,
            assigned_keyframes,
            duration,
        }
    }
}

/// Source rotations use the opposite handedness on Y and Z.
fn convert_rotation([x, y, z, w]: [f32; 4]) -> Quat {
    Quat::from_xyzw(x, -y, -z, w)
}

/// Source translations flip X and Y and are in centimetres.
fn convert_translation([x, y, z]: [f32; 3]) -> Vec3 {
    Vec3::new(
        -x / TRANSLATION_SCALE,
        -y / TRANSLATION_SCALE,
        z / TRANSLATION_SCALE,
    )
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, AnimationError> {
    value.parse().map_err(|_| AnimationError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_components<const N: usize>(
    text: &str,
    kind: &'static str,
    keyframe: usize,
    bone: usize,
) -> Result<[f32; N], AnimationError> {
    let parts: Vec<&str> = text.split('_').collect();
    if parts.len() != N {
        return Err(AnimationError::ComponentCount {
            keyframe,
            bone,
            kind,
            expected: N,
            found: parts.len(),
        });
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|_| AnimationError::InvalidNumber {
            field: kind,
            value: part.to_string(),
        })?;
    }
    Ok(out)
}

/// Split a list segment; an empty segment is an empty list.
fn split_list(segment: &str, separator: char) -> Vec<&str> {
    if segment.is_empty() {
        Vec::new()
    } else {
        segment.split(separator).collect()
    }
}

fn parse_keyframe(text: &str, index: usize) -> Result<RawKeyframe, AnimationError> {
    let mut parts = text.split('#');
    // split always yields at least one item
    let frame = parse_u32("frame index", parts.next().unwrap_or_default())?;

    let bones = parts
        .enumerate()
        .map(|(bone, entry)| {
            let (rotation, translation) = entry
                .split_once('+')
                .ok_or(AnimationError::MalformedBoneEntry {
                    keyframe: index,
                    bone,
                })?;
            Ok(RawBonePose {
                rotation: parse_components::<4>(rotation, "rotation", index, bone)?,
                translation: parse_components::<3>(translation, "translation", index, bone)?,
            })
        })
        .collect::<Result<Vec<_>, AnimationError>>()?;

    Ok(RawKeyframe { frame, bones })
}

impl FromStr for AnimationDocument {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim().split('/').collect();
        let &[duration, bones, keyframes, count] = segments.as_slice() else {
            return Err(AnimationError::SegmentCount(segments.len()));
        };

        let duration = parse_u32("duration", duration)?;
        let declared = parse_u32("keyframe count", count)? as usize;
        let bones = split_list(bones, '+')
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let listed = split_list(keyframes, '?');
        if listed.len() != declared {
            return Err(AnimationError::KeyframeCountMismatch {
                declared,
                listed: listed.len(),
            });
        }
        let keyframes = listed
            .into_iter()
            .enumerate()
            .map(|(index, text)| parse_keyframe(text, index))
            .collect::<Result<Vec<_>, _>>()?;

        let document = Self {
            duration,
            bones,
            keyframes,
        };
        document.validate()?;
        Ok(document)
    }
}

fn write_joined<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: char,
    mut write_item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

impl fmt::Display for AnimationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.duration)?;
        write_joined(f, &self.bones, '+', |f, bone| write!(f, "{bone}"))?;
        write!(f, "/")?;
        write_joined(f, &self.keyframes, '?', |f, keyframe| {
            write!(f, "{}", keyframe.frame)?;
            for pose in &keyframe.bones {
                write!(f, "#")?;
                write_joined(f, &pose.rotation, '_', |f, v| write!(f, "{v}"))?;
                write!(f, "+")?;
                write_joined(f, &pose.translation, '_', |f, v| write!(f, "{v}"))?;
            }
            Ok(())
        })?;
        write!(f, "/{}", self.keyframes.len())
    }
}

// =============================================================================
// PLAYABLE FORM
// =============================================================================

/// Per-bone delta pose for one keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationKeyframe {
    /// Delta rotation per bone
    pub rotations: Vec<Quat>,
    /// Delta translation per bone (metres)
    pub translations: Vec<Vec3>,
}

impl AnimationKeyframe {
    /// Keyframe that leaves every bone at its bind pose.
    pub fn identity(bone_count: usize) -> Self {
        Self {
            rotations: vec![Quat::IDENTITY; bone_count],
            translations: vec![Vec3::ZERO; bone_count],
        }
    }

    /// Number of bones posed by this keyframe.
    pub fn bone_count(&self) -> usize {
        self.rotations.len()
    }
}

/// Decoded animation clip.
///
/// Invariant: `assigned_keyframes.len() == duration` and every entry is a
/// valid index into `keyframes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnimation {
    /// Bone names, in rig order
    pub bones: Vec<String>,
    /// Keyframe poses
    pub keyframes: Vec<AnimationKeyframe>,
    /// Frame index -> keyframe index
    pub assigned_keyframes: Vec<usize>,
    /// Clip length in frames
    pub duration: usize,
}

impl EntityAnimation {
    /// Decode an encoded animation string.
    pub fn decode(encoded: &str) -> Result<Self, AnimationError> {
        Ok(encoded.parse::<AnimationDocument>()?.to_animation())
    }

    /// Keyframe shown at `frame`, if the frame is inside the clip.
    pub fn keyframe_at(&self, frame: usize) -> Option<(usize, &AnimationKeyframe)> {
        let index = *self.assigned_keyframes.get(frame)?;
        self.keyframes.get(index).map(|keyframe| (index, keyframe))
    }
}

impl From<&AnimationDocument> for EntityAnimation {
    fn from(document: &AnimationDocument) -> Self {
        document.to_animation()
    }
}

// =============================================================================
// TESTS
// =============================================================================

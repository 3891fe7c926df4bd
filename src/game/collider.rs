//! Hit Colliders
//!
//! Time-limited hazards spawned by card actions. A card carries collider
//! templates in the caster's local frame; executing the action lays them out
//! in world space from the caster's position and aim direction.
//!
//! Colliders live in per-team containers. Which teams' colliders an entity
//! collides with is decided by the [`Hostility`] matrix.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::geometry::{offset_direction, offset_position};
use crate::core::hash::StateHasher;
use crate::game::entity::{EntityId, TeamId};

// =============================================================================
// TEMPLATES
// =============================================================================

/// One circle of a collider template, in the caster's local frame.
///
/// `offset.y` is forward along the aim direction, `offset.x` is lateral.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColliderShape {
    /// Local offset from the caster
    pub offset: Vec2,
    /// Circle radius
    pub radius: f32,
    /// Knockback speed applied on hit
    #[serde(default)]
    pub knockback: f32,
    /// Health removed on hit
    #[serde(default)]
    pub damage: i32,
    /// Local knockback direction
    #[serde(default = "default_knockback_direction")]
    pub knockback_direction: Vec2,
}

fn default_knockback_direction() -> Vec2 {
    Vec2::Y
}

/// Collider template carried by a card action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardCollider {
    /// Lifetime in frames
    pub duration: u32,
    /// Circles sharing one effect list and stun value
    pub shapes: Vec<ColliderShape>,
    /// Effect ids reported on hit
    #[serde(default)]
    pub effects: Vec<String>,
    /// Stun frames applied on hit
    #[serde(default)]
    pub stun: u32,
}

// =============================================================================
// WORLD COLLIDERS
// =============================================================================

/// One circle of a live collider, in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubCollider {
    /// World position
    pub position: Vec2,
    /// Circle radius
    pub radius: f32,
    /// Knockback speed
    pub knockback: f32,
    /// Health removed
    pub damage: i32,
    /// World knockback direction (unit or zero)
    pub knockback_direction: Vec2,
}

/// A live hazard.
///
/// Strikes each entity at most once over its lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitCollider {
    /// Frames remaining
    pub duration: u32,
    /// World-space circles
    pub shapes: Vec<SubCollider>,
    /// Effect ids reported on hit
    pub effects: Vec<String>,
    /// Stun frames applied on hit
    pub stun: u32,
    /// Team that spawned it
    pub team: TeamId,
    /// Entities already struck
    pub struck: BTreeSet<EntityId>,
}

impl HitCollider {
    /// Lay a template out in world space.
    pub fn from_template(template: &CardCollider, origin: Vec2, direction: Vec2, team: TeamId) -> Self {
        let shapes = template
            .shapes
            .iter()
            .map(|shape| SubCollider {
                position: offset_position(origin, direction, shape.offset),
                radius: shape.radius,
                knockback: shape.knockback,
                damage: shape.damage,
                knockback_direction: offset_direction(direction, shape.knockback_direction),
            })
            .collect();

        Self {
            duration: template.duration,
            shapes,
            effects: template.effects.clone(),
            stun: template.stun,
            team,
            struck: BTreeSet::new(),
        }
    }

    /// Check if this collider already struck `entity`.
    pub fn has_struck(&self, entity: EntityId) -> bool {
        self.struck.contains(&entity)
    }

    /// Record a strike on `entity`.
    pub fn mark_struck(&mut self, entity: EntityId) {
        self.struck.insert(entity);
    }

    /// Count down one frame. Returns `false` once expired.
    pub fn age(&mut self) -> bool {
        self.duration = self.duration.saturating_sub(1);
        self.duration > 0
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.duration);
        hasher.update_u32(self.stun);
        hasher.update_u8(self.team);
        for shape in &self.shapes {
            hasher.update_vec2(shape.position);
            hasher.update_f32(shape.radius);
            hasher.update_i32(shape.damage);
        }
        hasher.update_u32(self.struck.len() as u32);
        for id in &self.struck {
            hasher.update_u32(id.0);
        }
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

/// Address of a collider across all team containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ColliderRef {
    /// Owning team
    pub team: TeamId,
    /// Index in the team's container
    pub index: usize,
}

/// Live colliders of every team.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TeamColliders {
    teams: BTreeMap<TeamId, Vec<HitCollider>>,
}

impl TeamColliders {
    /// Create empty containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collider to its team's container.
    pub fn add(&mut self, collider: HitCollider) {
        self.teams.entry(collider.team).or_default().push(collider);
    }

    /// Colliders spawned by `team`.
    pub fn team(&self, team: TeamId) -> &[HitCollider] {
        self.teams.get(&team).map_or(&[], Vec::as_slice)
    }

    /// Look a collider up by address.
    pub fn get(&self, at: ColliderRef) -> Option<&HitCollider> {
        self.teams.get(&at.team)?.get(at.index)
    }

    /// Look a collider up by address, mutably.
    pub fn get_mut(&mut self, at: ColliderRef) -> Option<&mut HitCollider> {
        self.teams.get_mut(&at.team)?.get_mut(at.index)
    }

    /// Teams that currently own colliders.
    pub fn teams(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.teams.keys().copied()
    }

    /// Addresses of every collider owned by a team hostile to `team`.
    pub fn hostile_to(&self, team: TeamId, hostility: &Hostility) -> Vec<ColliderRef> {
        self.teams
            .iter()
            .filter(|(&owner, _)| hostility.is_hostile(team, owner))
            .flat_map(|(&owner, colliders)| {
                (0..colliders.len()).map(move |index| ColliderRef { team: owner, index })
            })
            .collect()
    }

    /// Total live colliders.
    pub fn len(&self) -> usize {
        self.teams.values().map(Vec::len).sum()
    }

    /// Check if no colliders are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Age every collider by one frame and drop the expired ones.
    ///
    /// Returns how many were removed.
    pub fn age_all(&mut self) -> usize {
        let mut removed = 0;
        for colliders in self.teams.values_mut() {
            let before = colliders.len();
            colliders.retain_mut(HitCollider::age);
            removed += before - colliders.len();
        }
        removed
    }

    /// Feed every collider into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for (team, colliders) in &self.teams {
            hasher.update_u8(*team);
            hasher.update_u32(colliders.len() as u32);
            for collider in colliders {
                collider.hash_into(hasher);
            }
        }
    }
}

// =============================================================================
// HOSTILITY
// =============================================================================

/// Which teams' colliders hurt which teams.
///
/// Symmetric. Unless overridden, teams are hostile to every team but
/// themselves.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Hostility {
    overrides: BTreeMap<(TeamId, TeamId), bool>,
}

impl Hostility {
    /// Default matrix: every other team is hostile.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
        (a.min(b), a.max(b))
    }

    /// Set whether two teams are hostile.
    pub fn set(&mut self, a: TeamId, b: TeamId, hostile: bool) {
        self.overrides.insert(Self::key(a, b), hostile);
    }

    /// Mark two teams as allies.
    pub fn ally(&mut self, a: TeamId, b: TeamId) {
        self.set(a, b, false);
    }

    /// Check if colliders of `b` hurt `a` (and vice versa).
    pub fn is_hostile(&self, a: TeamId, b: TeamId) -> bool {
        self.overrides
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(a != b)
    }
}

// =============================================================================
// TESTS
// =============================================================================

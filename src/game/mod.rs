//! Game Logic Module
//!
//! All encounter simulation code. Deterministic for a given seed and
//! command script.
//!
//! ## Module Structure
//!
//! - `entity`: Combatants, their definitions and per-entity state
//! - `path`: Planned paths and per-step motion extraction
//! - `card`, `deck`: Card data and draw/hand/discard piles
//! - `action`: Cast promotion and timed action execution
//! - `collider`: Hit colliders, team containers and hostility
//! - `collision`: Point and swept collision, nearest-hit resolution
//! - `effect`: Flipbook visual effects
//! - `ai`: Enemy turn planning
//! - `assets`: Id-to-definition resolution
//! - `state`: Encounter state and caller commands
//! - `tick`: Fixed-step simulation loop and replay
//! - `events`: Game events for presentation and replay

pub mod action;
pub mod ai;
pub mod assets;
pub mod card;
pub mod collider;
pub mod collision;
pub mod deck;
pub mod effect;
pub mod entity;
pub mod events;
pub mod path;
pub mod state;
pub mod tick;

// Re-export key types
pub use assets::{AssetError, AssetLibrary, AssetResolver};
pub use card::{Card, CardAction, CastTarget};
pub use entity::{Entity, EntityDefinition, EntityId, TeamId, PLAYER_TEAM};
pub use events::{GameEvent, GameEventData};
pub use state::{CommandError, EncounterPhase, EncounterState, RenderFrame};
pub use tick::{Command, StepConfig, TickResult};

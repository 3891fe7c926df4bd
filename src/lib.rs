//! # Condemned Core
//!
//! Deterministic combat simulation for Condemned, a turn-planned tactics
//! game played out in fixed real-time steps.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CONDEMNED CORE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── geometry.rs - Angles, segments, local frames            │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  animation/      - Skeletal keyframe animation               │
//! │  ├── codec.rs    - Compact animation text format             │
//! │  └── player.rs   - Per-entity animation state machine        │
//! │                                                              │
//! │  game/           - Encounter logic                           │
//! │  ├── entity.rs   - Combatants                                │
//! │  ├── action.rs   - Card casts and timed actions              │
//! │  ├── collision.rs- Swept collision and hit resolution        │
//! │  ├── ai.rs       - Enemy turn planning                       │
//! │  ├── state.rs    - Encounter state and commands              │
//! │  └── tick.rs     - Fixed-step simulation loop                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from the encounter's seeded Xorshift128+
//!
//! Given the same seed, assets and command script, an encounter replays to
//! the same state hash on the same build.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod animation;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use animation::{EntityAnimation, EntityAnimator};
pub use core::rng::DeterministicRng;
pub use game::assets::{AssetLibrary, AssetResolver};
pub use game::state::{EncounterState, CommandError};
pub use game::tick::{advance, replay_encounter, run_turn, tick, StepConfig, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation rate (Hz)
pub const STEP_RATE: u32 = 30;

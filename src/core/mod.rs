//! Core deterministic primitives.
//!
//! Geometry helpers, the seeded RNG and state hashing. Nothing in here
//! owns encounter state; the game layer threads these through explicitly.

pub mod geometry;
pub mod hash;
pub mod rng;

// Re-export core types
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use rng::DeterministicRng;

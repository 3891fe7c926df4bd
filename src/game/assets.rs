//! Asset Resolution
//!
//! The simulation never owns asset storage. It looks definitions up by id
//! through an injected [`AssetResolver`]; [`AssetLibrary`] is the in-memory
//! implementation used by tools, tests and the demo binary.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::animation::{AnimationError, EntityAnimation};
use crate::game::card::Card;
use crate::game::effect::EffectDefinition;
use crate::game::entity::EntityDefinition;

/// Lookup-by-id for every definition the simulation consumes.
pub trait AssetResolver {
    /// Decoded animation clip.
    fn animation(&self, id: &str) -> Option<Arc<EntityAnimation>>;
    /// Card definition.
    fn card(&self, id: &str) -> Option<Arc<Card>>;
    /// Entity definition.
    fn entity(&self, id: &str) -> Option<Arc<EntityDefinition>>;
    /// Visual effect definition.
    fn effect(&self, id: &str) -> Option<Arc<EffectDefinition>>;
}

/// Errors while building an asset library.
#[derive(Debug, Error)]
pub enum AssetError {
    /// An encoded animation failed to decode.
    #[error("animation {id}: {source}")]
    Animation {
        /// Animation id
        id: String,
        /// Decode failure
        source: AnimationError,
    },

    /// Manifest is not valid JSON for the expected shape.
    #[error("manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest file could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialized form of an asset library.
///
/// Animations are stored in their compact encoded form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    /// Animation id to encoded animation
    pub animations: BTreeMap<String, String>,
    /// Card definitions
    pub cards: Vec<Card>,
    /// Entity definitions
    pub entities: Vec<EntityDefinition>,
    /// Effect definitions
    pub effects: Vec<EffectDefinition>,
}

/// In-memory asset store.
#[derive(Clone, Debug, Default)]
pub struct AssetLibrary {
    animations: BTreeMap<String, Arc<EntityAnimation>>,
    cards: BTreeMap<String, Arc<Card>>,
    entities: BTreeMap<String, Arc<EntityDefinition>>,
    effects: BTreeMap<String, Arc<EffectDefinition>>,
}

impl AssetLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from a manifest, decoding every animation.
    pub fn from_manifest(manifest: AssetManifest) -> Result<Self, AssetError> {
        let mut library = Self::new();
        for (id, encoded) in &manifest.animations {
            library.insert_encoded_animation(id.clone(), encoded)?;
        }
        for card in manifest.cards {
            library.insert_card(card);
        }
        for entity in manifest.entities {
            library.insert_entity(entity);
        }
        for effect in manifest.effects {
            library.insert_effect(effect);
        }
        debug!(
            animations = library.animations.len(),
            cards = library.cards.len(),
            entities = library.entities.len(),
            effects = library.effects.len(),
            "Asset library built"
        );
        Ok(library)
    }

    /// Parse a JSON manifest and build a library from it.
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Self::from_manifest(serde_json::from_str(json)?)
    }

    /// Read a JSON manifest file and build a library from it.
    pub fn load_manifest(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add a decoded animation.
    pub fn insert_animation(&mut self, id: impl Into<String>, animation: EntityAnimation) {
        self.animations.insert(id.into(), Arc::new(animation));
    }

    /// Decode and add an encoded animation.
    pub fn insert_encoded_animation(&mut self, id: impl Into<String>, encoded: &str) -> Result<(), AssetError> {
        let id = id.into();
        match EntityAnimation::decode(encoded) {
            Ok(animation) => {
                self.insert_animation(id, animation);
                Ok(())
            }
            Err(source) => Err(AssetError::Animation { id, source }),
        }
    }

    /// Add a card.
    pub fn insert_card(&mut self, card: Card) {
        self.cards.insert(card.id.clone(), Arc::new(card));
    }

    /// Add an entity definition.
    pub fn insert_entity(&mut self, entity: EntityDefinition) {
        self.entities.insert(entity.id.clone(), Arc::new(entity));
    }

    /// Add an effect definition.
    pub fn insert_effect(&mut self, effect: EffectDefinition) {
        self.effects.insert(effect.id.clone(), Arc::new(effect));
    }
}

impl AssetResolver for AssetLibrary {
    fn animation(&self, id: &str) -> Option<Arc<EntityAnimation>> {
        self.animations.get(id).cloned()
    }

    fn card(&self, id: &str) -> Option<Arc<Card>> {
        self.cards.get(id).cloned()
    }

    fn entity(&self, id: &str) -> Option<Arc<EntityDefinition>> {
        self.entities.get(id).cloned()
    }

    fn effect(&self, id: &str) -> Option<Arc<EffectDefinition>> {
        self.effects.get(id).cloned()
    }
}

// =============================================================================
// TESTS
// =============================================================================

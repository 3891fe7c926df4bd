//! Decks
//!
//! Draw pile, hand and discard pile of one entity. All randomness comes
//! from the encounter's [`DeterministicRng`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;
use crate::game::card::Card;

/// An entity's cards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Deck {
    /// Cards waiting to be drawn, top first
    pub draw_pile: Vec<Arc<Card>>,
    /// Cards in hand
    pub hand: Vec<Arc<Card>>,
    /// Played and discarded cards
    pub discard: Vec<Arc<Card>>,
}

impl Deck {
    /// Create an empty deck.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a card to the bottom of the draw pile.
    pub fn add_card(&mut self, card: Arc<Card>) {
        self.draw_pile.push(card);
    }

    /// Shuffle the draw pile.
    pub fn shuffle(&mut self, rng: &mut DeterministicRng) {
        rng.shuffle(&mut self.draw_pile);
    }

    /// Draw up to `amount` cards into the hand.
    ///
    /// An empty draw pile is refilled from the shuffled discard pile. Stops
    /// early when both are empty. Returns how many cards were drawn.
    pub fn draw(&mut self, amount: usize, rng: &mut DeterministicRng) -> usize {
        for drawn in 0..amount {
            if self.draw_pile.is_empty() {
                if self.discard.is_empty() {
                    return drawn;
                }
                rng.shuffle(&mut self.discard);
                self.draw_pile.append(&mut self.discard);
            }
            let card = self.draw_pile.remove(0);
            self.hand.push(card);
        }
        amount
    }

    /// Play the card at `index` in hand, moving it to the discard pile.
    pub fn play_from_hand(&mut self, index: usize) -> Option<Arc<Card>> {
        if index >= self.hand.len() {
            return None;
        }
        let card = self.hand.remove(index);
        self.discard.push(Arc::clone(&card));
        Some(card)
    }

    /// Move the whole hand to the discard pile.
    pub fn discard_hand(&mut self) {
        self.discard.append(&mut self.hand);
    }

    /// Pick a random card from the draw pile without drawing it.
    pub fn random_card(&self, rng: &mut DeterministicRng) -> Option<Arc<Card>> {
        rng.choose(&self.draw_pile).cloned()
    }

    /// Total cards across all piles.
    pub fn len(&self) -> usize {
        self.draw_pile.len() + self.hand.len() + self.discard.len()
    }

    /// Check if the deck holds no cards.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feed pile contents into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for pile in [&self.draw_pile, &self.hand, &self.discard] {
            hasher.update_u32(pile.len() as u32);
            for card in pile {
                hasher.update_str(&card.id);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

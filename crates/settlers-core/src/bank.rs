//! The bank: finite resource supply plus the development card deck.

use crate::board::Resource;
use crate::player::{DevelopmentCard, ResourceHand};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cards of each resource in a full supply
pub const RESOURCE_SUPPLY: u32 = 19;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub resources: ResourceHand,
    development_deck: Vec<DevelopmentCard>,
}

impl Bank {
    /// Full supply with a freshly shuffled development deck
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let mut deck = DevelopmentCard::standard_deck();
        deck.shuffle(rng);
        Self {
            resources: ResourceHand::with_amounts(
                RESOURCE_SUPPLY,
                RESOURCE_SUPPLY,
                RESOURCE_SUPPLY,
                RESOURCE_SUPPLY,
                RESOURCE_SUPPLY,
            ),
            development_deck: deck,
        }
    }

    /// Replace the deck; the last card is drawn first
    pub fn with_deck(mut self, deck: Vec<DevelopmentCard>) -> Self {
        self.development_deck = deck;
        self
    }

    pub fn receive(&mut self, cards: &ResourceHand) {
        self.resources.add_hand(cards);
    }

    /// Hand out cards if the supply covers all of them
    pub fn dispense(&mut self, cards: &ResourceHand) -> bool {
        self.resources.try_subtract(cards)
    }

    /// Hand out what the supply has, ignoring any shortfall
    pub fn dispense_unlimited(&mut self, cards: &ResourceHand) {
        for r in Resource::ALL {
            let have = self.resources.get(r);
            self.resources.set(r, have.saturating_sub(cards.get(r)));
        }
    }

    pub fn peek_development_card(&self) -> Option<DevelopmentCard> {
        self.development_deck.last().copied()
    }

    pub fn draw_development_card(&mut self) -> Option<DevelopmentCard> {
        self.development_deck.pop()
    }

    pub fn development_cards_left(&self) -> usize {
        self.development_deck.len()
    }
}

//! Hands, development cards, building costs and per-player state.
//!
//! Victory points are never stored. [`Player::victory_points`] derives them
//! from the ownership sets, held VP cards and the two bonus flags.

use crate::board::{PlayerId, Resource};
use crate::topology::{PointRef, RoadSpan};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const MAX_SETTLEMENTS: usize = 5;
pub const MAX_CITIES: usize = 4;
pub const MAX_ROADS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevelopmentCard {
    /// Moves the robber; counts toward Largest Army once revealed
    Knight,
    /// Kept secret, worth a point while held
    VictoryPoint,
    RoadBuilding,
    YearOfPlenty,
    Monopoly,
}

/// How many of each card the unshuffled deck holds
const DECK_COMPOSITION: [(DevelopmentCard, usize); 5] = [
    (DevelopmentCard::Knight, 14),
    (DevelopmentCard::VictoryPoint, 5),
    (DevelopmentCard::RoadBuilding, 2),
    (DevelopmentCard::YearOfPlenty, 2),
    (DevelopmentCard::Monopoly, 2),
];

impl DevelopmentCard {
    /// The 25 cards in a fixed order; the bank shuffles them
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        DECK_COMPOSITION
            .iter()
            .flat_map(|&(card, count)| std::iter::repeat(card).take(count))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            DevelopmentCard::Knight => "knight",
            DevelopmentCard::VictoryPoint => "victory_point",
            DevelopmentCard::RoadBuilding => "road_building",
            DevelopmentCard::YearOfPlenty => "year_of_plenty",
            DevelopmentCard::Monopoly => "monopoly",
        }
    }
}

impl fmt::Display for DevelopmentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts any casing and separator: "Year of Plenty", "year_of_plenty", "VP"
impl FromStr for DevelopmentCard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "knight" => Ok(DevelopmentCard::Knight),
            "victorypoint" | "vp" => Ok(DevelopmentCard::VictoryPoint),
            "roadbuilding" => Ok(DevelopmentCard::RoadBuilding),
            "yearofplenty" => Ok(DevelopmentCard::YearOfPlenty),
            "monopoly" => Ok(DevelopmentCard::Monopoly),
            _ => Err(s.to_string()),
        }
    }
}

/// Resource cards by kind. Used for player hands, the bank, costs and
/// trade sides alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub brick: u32,
    pub lumber: u32,
    pub ore: u32,
    pub grain: u32,
    pub wool: u32,
}

impl ResourceHand {
    pub const EMPTY: ResourceHand = ResourceHand {
        brick: 0,
        lumber: 0,
        ore: 0,
        grain: 0,
        wool: 0,
    };

    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Counts in `Resource::ALL` order
    pub const fn with_amounts(brick: u32, lumber: u32, ore: u32, grain: u32, wool: u32) -> Self {
        Self {
            brick,
            lumber,
            ore,
            grain,
            wool,
        }
    }

    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::EMPTY;
        *hand.slot_mut(resource) = amount;
        hand
    }

    fn slot_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Brick => &mut self.brick,
            Resource::Lumber => &mut self.lumber,
            Resource::Ore => &mut self.ore,
            Resource::Grain => &mut self.grain,
            Resource::Wool => &mut self.wool,
        }
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Brick => self.brick,
            Resource::Lumber => self.lumber,
            Resource::Ore => self.ore,
            Resource::Grain => self.grain,
            Resource::Wool => self.wool,
        }
    }

    pub fn set(&mut self, resource: Resource, count: u32) {
        *self.slot_mut(resource) = count;
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot_mut(resource) += amount;
    }

    pub fn add_hand(&mut self, other: &ResourceHand) {
        for (resource, n) in other.entries() {
            self.add(resource, n);
        }
    }

    pub fn total(&self) -> u32 {
        Resource::ALL.iter().map(|&r| self.get(r)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// At least as many of every kind as `cost`
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        self.checked_sub(cost).is_some()
    }

    /// The hand left after paying `cost`, or None if it cannot be paid
    pub fn checked_sub(&self, cost: &ResourceHand) -> Option<ResourceHand> {
        let mut rest = *self;
        for r in Resource::ALL {
            *rest.slot_mut(r) = self.get(r).checked_sub(cost.get(r))?;
        }
        Some(rest)
    }

    /// Pay `cost` if possible; an unpayable cost leaves the hand alone
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        match self.checked_sub(cost) {
            Some(rest) => {
                *self = rest;
                true
            }
            None => false,
        }
    }

    /// Empty one kind, returning how many there were
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(self.slot_mut(resource))
    }

    /// One entry per card
    fn cards(&self) -> Vec<Resource> {
        self.entries()
            .into_iter()
            .flat_map(|(r, n)| std::iter::repeat(r).take(n as usize))
            .collect()
    }

    /// Remove one card picked uniformly among those held
    pub fn steal_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let resource = *self.cards().choose(rng)?;
        *self.slot_mut(resource) -= 1;
        Some(resource)
    }

    /// Remove up to `count` cards, one uniform pick at a time
    pub fn discard_random<R: Rng>(&mut self, count: u32, rng: &mut R) -> ResourceHand {
        let mut removed = ResourceHand::EMPTY;
        for _ in 0..count {
            let Some(r) = self.steal_random(rng) else {
                break;
            };
            removed.add(r, 1);
        }
        removed
    }

    /// Non-zero entries, in resource order
    pub fn entries(&self) -> Vec<(Resource, u32)> {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

impl fmt::Display for ResourceHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries();
        if entries.is_empty() {
            return f.write_str("nothing");
        }
        for (i, (r, n)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{n} {r}")?;
        }
        Ok(())
    }
}

pub mod costs {
    use super::ResourceHand;

    const ROAD: ResourceHand = ResourceHand::with_amounts(1, 1, 0, 0, 0);
    const SETTLEMENT: ResourceHand = ResourceHand::with_amounts(1, 1, 0, 1, 1);
    const CITY: ResourceHand = ResourceHand::with_amounts(0, 0, 3, 2, 0);
    const DEVELOPMENT_CARD: ResourceHand = ResourceHand::with_amounts(0, 0, 1, 1, 1);

    pub fn road() -> ResourceHand {
        ROAD
    }

    pub fn settlement() -> ResourceHand {
        SETTLEMENT
    }

    /// Upgrade price; the settlement piece goes back to the player
    pub fn city() -> ResourceHand {
        CITY
    }

    pub fn development_card() -> ResourceHand {
        DEVELOPMENT_CARD
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub resources: ResourceHand,
    /// Playable now; VP cards sit here too once their turn has passed
    pub dev_cards: Vec<DevelopmentCard>,
    /// Locked until the owner's turn ends
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    pub played_knights: u32,
    pub settlements: BTreeSet<PointRef>,
    pub cities: BTreeSet<PointRef>,
    pub roads: BTreeSet<RoadSpan>,
    /// Refreshed from the board after every placement
    pub longest_road_length: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resources: ResourceHand::EMPTY,
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            played_knights: 0,
            settlements: BTreeSet::new(),
            cities: BTreeSet::new(),
            roads: BTreeSet::new(),
            longest_road_length: 0,
            has_longest_road: false,
            has_largest_army: false,
        }
    }

    /// VP cards in either pile
    pub fn hidden_vp(&self) -> u32 {
        self.dev_cards
            .iter()
            .chain(&self.dev_cards_bought_this_turn)
            .filter(|&&card| card == DevelopmentCard::VictoryPoint)
            .count() as u32
    }

    pub fn public_victory_points(&self) -> u32 {
        let bonuses = [self.has_longest_road, self.has_largest_army]
            .into_iter()
            .filter(|&held| held)
            .count() as u32;
        self.settlements.len() as u32 + 2 * self.cities.len() as u32 + 2 * bonuses
    }

    pub fn victory_points(&self) -> u32 {
        self.public_victory_points() + self.hidden_vp()
    }

    pub fn settlements_remaining(&self) -> usize {
        MAX_SETTLEMENTS.saturating_sub(self.settlements.len())
    }

    pub fn cities_remaining(&self) -> usize {
        MAX_CITIES.saturating_sub(self.cities.len())
    }

    pub fn roads_remaining(&self) -> usize {
        MAX_ROADS.saturating_sub(self.roads.len())
    }

    /// Cards and a piece in stock
    pub fn can_afford_road(&self) -> bool {
        self.roads_remaining() > 0 && self.resources.can_afford(&costs::road())
    }

    pub fn can_afford_settlement(&self) -> bool {
        self.settlements_remaining() > 0 && self.resources.can_afford(&costs::settlement())
    }

    pub fn can_afford_city(&self) -> bool {
        self.cities_remaining() > 0 && self.resources.can_afford(&costs::city())
    }

    pub fn can_afford_dev_card(&self) -> bool {
        self.resources.can_afford(&costs::development_card())
    }

    /// Unlock this turn's purchases
    pub fn end_turn(&mut self) {
        let bought = std::mem::take(&mut self.dev_cards_bought_this_turn);
        self.dev_cards.extend(bought);
    }

    pub fn has_playable_dev_card(&self, card: DevelopmentCard) -> bool {
        self.dev_cards.contains(&card)
    }

    /// Reveal a playable card. Knights are counted for Largest Army.
    pub fn play_dev_card(&mut self, card: DevelopmentCard) -> bool {
        let Some(pos) = self.dev_cards.iter().position(|&c| c == card) else {
            return false;
        };
        self.dev_cards.swap_remove(pos);
        if card == DevelopmentCard::Knight {
            self.played_knights += 1;
        }
        true
    }
}

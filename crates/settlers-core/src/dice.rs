//! Dice sources. The engine takes any [`DiceRoller`] so games can be
//! replayed from a seed or driven with fixed rolls in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait DiceRoller {
    /// Roll two six-sided dice
    fn roll(&mut self) -> (u8, u8);
}

/// Fair dice from a seeded generator
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl DiceRoller for SeededDice {
    fn roll(&mut self) -> (u8, u8) {
        (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6))
    }
}

/// Replays a fixed list of rolls, then falls back to (3, 4) forever
#[derive(Debug, Clone, Default)]
pub struct LoadedDice {
    rolls: VecDeque<(u8, u8)>,
}

impl LoadedDice {
    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    /// Rolls summing to each total, split as evenly as the faces allow
    pub fn totals(totals: impl IntoIterator<Item = u8>) -> Self {
        Self::new(totals.into_iter().map(|t| {
            let t = t.clamp(2, 12);
            let first = (t / 2).clamp(t.saturating_sub(6).max(1), 6);
            (first, t - first)
        }))
    }

    pub fn push(&mut self, roll: (u8, u8)) {
        self.rolls.push_back(roll);
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl DiceRoller for LoadedDice {
    fn roll(&mut self) -> (u8, u8) {
        self.rolls.pop_front().unwrap_or((3, 4))
    }
}

//! Game configuration and the game state snapshot.
//!
//! [`GameState`] is the one value the rest of the world reads: it is what
//! observers receive after every action and what gets exported for
//! visualization. Only the engine mutates it.

use crate::bank::{Bank, RESOURCE_SUPPLY};
use crate::board::{Board, BoardLayout, PlayerId};
use crate::error::EngineError;
use crate::phase::{GamePhase, SetupProgress, TurnPhase};
use crate::player::Player;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
pub const VICTORY_POINTS_TO_WIN: u32 = 10;
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;
/// Hand size above which a 7 forces a discard
pub const DISCARD_LIMIT: u32 = 7;
/// Total resource cards in a full game
pub const TOTAL_RESOURCE_CARDS: u32 = RESOURCE_SUPPLY * 5;

/// Settings for a single game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player_names: Vec<String>,
    /// Seeds dice, the deck shuffle, the board shuffle and steals
    pub seed: Option<u64>,
    pub victory_points_to_win: u32,
    /// Failed actions in one turn before that turn is forced to end
    pub max_consecutive_errors: u32,
    /// Stop an unattended game after this many turns
    pub max_turns: Option<u32>,
    pub shuffle_board: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_names: vec!["Player 1".into(), "Player 2".into(), "Player 3".into()],
            seed: None,
            victory_points_to_win: VICTORY_POINTS_TO_WIN,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            max_turns: None,
            shuffle_board: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("A game needs 2 to 4 players, got {0}")]
    PlayerCount(usize),

    #[error("Player {0} has a blank name")]
    BlankName(usize),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl GameConfig {
    pub fn with_players<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            player_names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.player_names.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&n) {
            return Err(ConfigError::PlayerCount(n));
        }
        if let Some(i) = self.player_names.iter().position(|p| p.trim().is_empty()) {
            return Err(ConfigError::BlankName(i));
        }
        if self.victory_points_to_win == 0 {
            return Err(ConfigError::Zero("victory_points_to_win"));
        }
        if self.max_consecutive_errors == 0 {
            return Err(ConfigError::Zero("max_consecutive_errors"));
        }
        if self.max_turns == Some(0) {
            return Err(ConfigError::Zero("max_turns"));
        }
        Ok(())
    }
}

/// Complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: Uuid,
    /// Counts every completed turn, setup turns included
    pub turn_number: u32,
    pub current_player: PlayerId,
    pub game_phase: GamePhase,
    pub turn_phase: TurnPhase,
    /// This turn's roll, cleared when the turn passes
    pub dice_roll: Option<(u8, u8)>,
    /// Players still owing a discard, with the exact count
    pub players_must_discard: BTreeMap<PlayerId, u32>,
    pub robber_moved: bool,
    pub steal_pending: bool,
    /// Eligible victims while a steal is pending
    pub steal_candidates: Vec<PlayerId>,
    pub setup_progress: SetupProgress,
    pub dev_card_played_this_turn: bool,
    pub victory_points_to_win: u32,
    pub board: Board,
    pub players: Vec<Player>,
    pub bank: Bank,
}

impl GameState {
    /// Create a fresh game in the first setup round
    pub fn new<R: Rng>(config: &GameConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;

        let layout = if config.shuffle_board {
            BoardLayout::shuffled(rng)
        } else {
            BoardLayout::standard()
        };
        let players = config
            .player_names
            .iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name.trim()))
            .collect();

        Ok(Self {
            game_id: uuid::Builder::from_random_bytes(rng.gen()).into_uuid(),
            turn_number: 0,
            current_player: 0,
            game_phase: GamePhase::SetupFirstRound,
            turn_phase: TurnPhase::RollDice,
            dice_roll: None,
            players_must_discard: BTreeMap::new(),
            robber_moved: false,
            steal_pending: false,
            steal_candidates: Vec::new(),
            setup_progress: SetupProgress::default(),
            dev_card_played_this_turn: false,
            victory_points_to_win: config.victory_points_to_win,
            board: Board::new(layout),
            players,
            bank: Bank::new(rng),
        })
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, EngineError> {
        self.players
            .get(id as usize)
            .ok_or(EngineError::UnknownPlayer(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, EngineError> {
        self.players
            .get_mut(id as usize)
            .ok_or(EngineError::UnknownPlayer(id))
    }

    /// The player expected to act next; during discards that is the
    /// lowest-numbered player still owing cards
    pub fn active_player(&self) -> PlayerId {
        if self.turn_phase == TurnPhase::DiscardPhase {
            if let Some(&id) = self.players_must_discard.keys().next() {
                return id;
            }
        }
        self.current_player
    }

    pub fn is_over(&self) -> bool {
        matches!(self.game_phase, GamePhase::Ended { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.game_phase {
            GamePhase::Ended { winner } => winner,
            _ => None,
        }
    }

    pub fn victory_points(&self, id: PlayerId) -> u32 {
        self.players
            .get(id as usize)
            .map(Player::victory_points)
            .unwrap_or(0)
    }

    /// Resource cards held by all players
    pub fn cards_in_hands(&self) -> u32 {
        self.players.iter().map(|p| p.resources.total()).sum()
    }

    /// Cards in hands plus the bank; constant except for Year of Plenty
    /// drawn from an empty supply
    pub fn cards_in_play(&self) -> u32 {
        self.cards_in_hands() + self.bank.resources.total()
    }

    /// Snapshot for visualization and AI collaborators
    pub fn to_json(&self) -> serde_json::Value {
        let scores: Vec<serde_json::Value> = self
            .players
            .iter()
            .map(|p| {
                serde_json::json!({
                    "player": p.id,
                    "name": p.name,
                    "victory_points": p.victory_points(),
                    "public_victory_points": p.public_victory_points(),
                    "longest_road": p.longest_road_length,
                    "knights": p.played_knights,
                })
            })
            .collect();
        serde_json::json!({
            "state": self,
            "scores": scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_config_validation() {
        assert_eq!(
            GameConfig::with_players(["solo"]).validate(),
            Err(ConfigError::PlayerCount(1))
        );
        assert_eq!(
            GameConfig::with_players(["a", "b", "c", "d", "e"]).validate(),
            Err(ConfigError::PlayerCount(5))
        );
        assert_eq!(
            GameConfig::with_players(["a", " "]).validate(),
            Err(ConfigError::BlankName(1))
        );
        let mut config = GameConfig::with_players(["a", "b"]);
        config.max_consecutive_errors = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("max_consecutive_errors"))
        );
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_new_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = GameState::new(&GameConfig::default(), &mut rng).unwrap();
        assert_eq!(state.player_count(), 3);
        assert_eq!(state.turn_number, 0);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.game_phase, GamePhase::SetupFirstRound);
        assert_eq!(state.cards_in_play(), TOTAL_RESOURCE_CARDS);
        assert!(state.player(3).is_err());
    }

    #[test]
    fn test_same_seed_same_game_id() {
        let config = GameConfig::default();
        let a = GameState::new(&config, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = GameState::new(&config, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a.game_id, b.game_id);
    }

    #[test]
    fn test_to_json_includes_scores() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = GameState::new(&GameConfig::default(), &mut rng).unwrap();
        let json = state.to_json();
        assert_eq!(json["scores"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["state"]["turn_number"], 0);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: GameConfig =
            serde_json::from_str(r#"{"player_names": ["Ann", "Bo"], "seed": 9}"#).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.victory_points_to_win, 10);
        assert!(config.validate().is_ok());
    }
}

//! Game and turn phases, setup order, and the legal actions each allows.

use crate::actions::ActionType;
use crate::board::PlayerId;
use crate::state::GameState;
use crate::topology::PointRef;
use serde::{Deserialize, Serialize};

/// Overall game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Round one of placement, players 0..N-1
    SetupFirstRound,
    /// Round two of placement, players N-1..0
    SetupSecondRound,
    NormalPlay,
    /// `winner` is None when the game was stopped explicitly
    Ended { winner: Option<PlayerId> },
}

impl GamePhase {
    pub fn is_setup(&self) -> bool {
        matches!(self, GamePhase::SetupFirstRound | GamePhase::SetupSecondRound)
    }
}

/// Step within a normal-play turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    RollDice,
    /// Over-limit players discard, lowest id first
    DiscardPhase,
    RobberMove,
    /// Two or more players could be robbed; the roller picks one
    RobberSteal,
    PlayerActions,
}

/// What the current player has placed during this setup turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupProgress {
    pub settlement: Option<PointRef>,
    pub road_placed: bool,
}

impl SetupProgress {
    pub fn is_complete(&self) -> bool {
        self.settlement.is_some() && self.road_placed
    }
}

/// Who places during setup turn `turn_number` with `players` players.
///
/// Round one runs forward, round two runs backward, so the last player of
/// round one also opens round two.
pub fn setup_player_for_turn(turn_number: u32, players: usize) -> PlayerId {
    let n = players as u32;
    let last = (2 * n).saturating_sub(1);
    let turn = turn_number.min(last);
    let player = if turn < n { turn } else { last - turn };
    player as PlayerId
}

/// Action kinds the active player may attempt right now
pub fn legal_action_types(state: &GameState) -> Vec<ActionType> {
    match state.game_phase {
        GamePhase::Ended { .. } => Vec::new(),
        GamePhase::SetupFirstRound | GamePhase::SetupSecondRound => {
            if state.setup_progress.settlement.is_none() {
                vec![ActionType::BuildSettlement]
            } else if !state.setup_progress.road_placed {
                vec![ActionType::BuildRoad]
            } else {
                vec![ActionType::EndTurn]
            }
        }
        GamePhase::NormalPlay => match state.turn_phase {
            TurnPhase::DiscardPhase => vec![ActionType::DiscardCards],
            TurnPhase::RobberMove => vec![ActionType::MoveRobber],
            TurnPhase::RobberSteal => vec![ActionType::StealCard],
            TurnPhase::RollDice => vec![ActionType::RollDice, ActionType::PlayDevCard],
            TurnPhase::PlayerActions => vec![
                ActionType::BuildSettlement,
                ActionType::BuildCity,
                ActionType::BuildRoad,
                ActionType::ProposeTrade,
                ActionType::BankTrade,
                ActionType::BuyDevCard,
                ActionType::PlayDevCard,
                ActionType::EndTurn,
            ],
        },
    }
}

/// One-line instruction shown alongside a solicitation
pub fn prompt_message(state: &GameState) -> String {
    match state.game_phase {
        GamePhase::Ended { .. } => "The game is over".to_string(),
        GamePhase::SetupFirstRound | GamePhase::SetupSecondRound => {
            let round = if state.game_phase == GamePhase::SetupFirstRound {
                1
            } else {
                2
            };
            if state.setup_progress.settlement.is_none() {
                format!("Setup round {round}: place a starting settlement")
            } else {
                format!("Setup round {round}: place a road next to your new settlement")
            }
        }
        GamePhase::NormalPlay => match state.turn_phase {
            TurnPhase::RollDice => "Roll the dice (or play a development card first)".to_string(),
            TurnPhase::DiscardPhase => {
                let count = state
                    .players_must_discard
                    .values()
                    .next()
                    .copied()
                    .unwrap_or_default();
                format!("A 7 was rolled: discard {count} cards")
            }
            TurnPhase::RobberMove => "Move the robber to a different tile".to_string(),
            TurnPhase::RobberSteal => format!(
                "Choose a player to rob: {:?}",
                state.steal_candidates
            ),
            TurnPhase::PlayerActions => {
                "Build, trade, buy or play a card, or end your turn".to_string()
            }
        },
    }
}

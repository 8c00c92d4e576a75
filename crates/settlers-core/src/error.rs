//! Engine error types.
//!
//! [`EngineError`] carries the detail of a rejected or failed action;
//! [`ErrorKind`] is the coarse category callers branch on.

use crate::actions::ActionType;
use crate::board::{PlayerId, Resource};
use crate::player::DevelopmentCard;
use crate::topology::{PointRef, RoadSpan, TileRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories reported with every rejected action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidPhase,
    NotYourTurn,
    MissingParameters,
    InsufficientResources,
    LocationBlocked,
    NotAdjacent,
    Disconnected,
    TradeRejected,
    UnknownCard,
    /// Unexpected internal fault
    ExecutionError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors that can occur while validating or executing an action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Game is over")]
    GameOver,

    #[error("Not your turn (waiting on player {expected})")]
    NotYourTurn { expected: PlayerId },

    #[error("{action:?} is not allowed {context}")]
    InvalidPhase {
        action: ActionType,
        context: &'static str,
    },

    #[error("{action:?} is missing '{field}'")]
    MissingParameters {
        action: ActionType,
        field: &'static str,
    },

    #[error("No player with id {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {player} cannot afford this")]
    InsufficientResources { player: PlayerId },

    #[error("Player {player} must discard exactly {required} cards, not {offered}")]
    DiscardCountMismatch {
        player: PlayerId,
        required: u32,
        offered: u32,
    },

    #[error("No {0} pieces remaining")]
    NoPiecesRemaining(&'static str),

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("The bank has run out of {0}")]
    BankDepleted(Resource),

    #[error("Cannot trade {offered} for {requested}: {reason}")]
    InvalidTrade {
        offered: String,
        requested: String,
        reason: &'static str,
    },

    #[error("{0} is occupied or too close to another building")]
    LocationBlocked(PointRef),

    #[error("{0} already has a road")]
    RoadOccupied(RoadSpan),

    #[error("No settlement of yours at {0}")]
    NoSettlement(PointRef),

    #[error("The robber is already on {0}")]
    RobberUnchanged(TileRef),

    #[error("{0} is not a valid road edge")]
    NotAdjacent(RoadSpan),

    #[error("{0} is not on the board")]
    UnknownPoint(PointRef),

    #[error("{0} is not on the board")]
    UnknownTile(TileRef),

    #[error("Player {victim} is not a valid steal target")]
    InvalidVictim { victim: PlayerId },

    #[error("{0} does not connect to your network")]
    Disconnected(RoadSpan),

    #[error("None of your roads reach {0}")]
    SiteNotConnected(PointRef),

    #[error("Player {target} rejected the trade")]
    TradeRejected { target: PlayerId },

    #[error("Unknown development card '{0}'")]
    UnknownCardName(String),

    #[error("You don't have a playable {0}")]
    NoSuchCard(DevelopmentCard),

    #[error("{0} cannot be played")]
    CardNotPlayable(DevelopmentCard),

    #[error("Only one development card may be played per turn")]
    CardAlreadyPlayed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::GameOver | EngineError::InvalidPhase { .. } => ErrorKind::InvalidPhase,
            EngineError::NotYourTurn { .. } => ErrorKind::NotYourTurn,
            EngineError::MissingParameters { .. } | EngineError::UnknownPlayer(_) => {
                ErrorKind::MissingParameters
            }
            EngineError::InsufficientResources { .. }
            | EngineError::DiscardCountMismatch { .. }
            | EngineError::NoPiecesRemaining(_)
            | EngineError::EmptyDeck
            | EngineError::BankDepleted(_)
            | EngineError::InvalidTrade { .. } => ErrorKind::InsufficientResources,
            EngineError::LocationBlocked(_)
            | EngineError::RoadOccupied(_)
            | EngineError::NoSettlement(_)
            | EngineError::RobberUnchanged(_) => ErrorKind::LocationBlocked,
            EngineError::NotAdjacent(_)
            | EngineError::UnknownPoint(_)
            | EngineError::UnknownTile(_)
            | EngineError::InvalidVictim { .. } => ErrorKind::NotAdjacent,
            EngineError::Disconnected(_) | EngineError::SiteNotConnected(_) => {
                ErrorKind::Disconnected
            }
            EngineError::TradeRejected { .. } => ErrorKind::TradeRejected,
            EngineError::UnknownCardName(_)
            | EngineError::NoSuchCard(_)
            | EngineError::CardNotPlayable(_)
            | EngineError::CardAlreadyPlayed => ErrorKind::UnknownCard,
            EngineError::Internal(_) => ErrorKind::ExecutionError,
        }
    }

    /// Whether the same player may reasonably try again this turn
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::TradeRejected | ErrorKind::ExecutionError
        ) && *self != EngineError::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            EngineError::DiscardCountMismatch {
                player: 0,
                required: 4,
                offered: 3
            }
            .kind(),
            ErrorKind::InsufficientResources
        );
        assert_eq!(
            EngineError::TradeRejected { target: 1 }.kind(),
            ErrorKind::TradeRejected
        );
        assert_eq!(
            EngineError::Internal("boom".into()).kind(),
            ErrorKind::ExecutionError
        );
        assert_eq!(
            EngineError::NoSuchCard(DevelopmentCard::Knight).kind(),
            ErrorKind::UnknownCard
        );
    }

    #[test]
    fn test_rejected_trade_is_not_retryable() {
        assert!(!EngineError::TradeRejected { target: 2 }.is_retryable());
        assert!(EngineError::InsufficientResources { player: 0 }.is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = EngineError::MissingParameters {
            action: ActionType::BuildSettlement,
            field: "point",
        };
        assert_eq!(err.to_string(), "BuildSettlement is missing 'point'");
    }
}

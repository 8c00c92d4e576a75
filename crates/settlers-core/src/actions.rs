//! Game actions that players can take.
//!
//! This module defines all possible actions in the game, the loose
//! parameter bag external sources fill in before an action is built, and
//! the events that result from executing an action.

use crate::board::{PlayerId, Resource};
use crate::error::EngineError;
use crate::player::{DevelopmentCard, ResourceHand};
use crate::topology::{PointRef, RoadSpan, TileRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Action tags, without payload. Used for legal-action lists and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    RollDice,
    EndTurn,
    BuildSettlement,
    BuildCity,
    BuildRoad,
    BankTrade,
    ProposeTrade,
    AcceptTrade,
    RejectTrade,
    BuyDevCard,
    PlayDevCard,
    DiscardCards,
    MoveRobber,
    StealCard,
}

/// A player trade proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player being asked
    pub target: PlayerId,
    /// What the proposer gives
    pub offer: ResourceHand,
    /// What the proposer wants in return
    pub request: ResourceHand,
}

/// A development card play and its card-specific arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevCardPlay {
    Knight {
        tile: TileRef,
        /// Who to rob; the lowest eligible id when omitted
        victim: Option<PlayerId>,
    },
    RoadBuilding {
        first: RoadSpan,
        second: RoadSpan,
    },
    Monopoly {
        resource: Resource,
    },
    YearOfPlenty {
        first: Resource,
        second: Resource,
    },
}

impl DevCardPlay {
    pub fn card(&self) -> DevelopmentCard {
        match self {
            DevCardPlay::Knight { .. } => DevelopmentCard::Knight,
            DevCardPlay::RoadBuilding { .. } => DevelopmentCard::RoadBuilding,
            DevCardPlay::Monopoly { .. } => DevelopmentCard::Monopoly,
            DevCardPlay::YearOfPlenty { .. } => DevelopmentCard::YearOfPlenty,
        }
    }
}

/// What the action does, carrying only the fields that kind needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    // ==================== Turn Management ====================
    RollDice,
    EndTurn,

    // ==================== Building ====================
    /// During setup this is a free starting settlement
    BuildSettlement { point: PointRef },
    BuildCity { point: PointRef },
    /// During setup this is a free starting road
    BuildRoad { road: RoadSpan },

    // ==================== Trading ====================
    BankTrade {
        offer: ResourceHand,
        request: ResourceHand,
    },
    ProposeTrade(TradeOffer),
    /// Only valid as a response to a trade solicitation
    AcceptTrade,
    /// Only valid as a response to a trade solicitation
    RejectTrade,

    // ==================== Development Cards ====================
    BuyDevCard,
    PlayDevCard(DevCardPlay),

    // ==================== Robber ====================
    DiscardCards { cards: ResourceHand },
    MoveRobber { tile: TileRef },
    StealCard { victim: PlayerId },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::RollDice => ActionType::RollDice,
            ActionKind::EndTurn => ActionType::EndTurn,
            ActionKind::BuildSettlement { .. } => ActionType::BuildSettlement,
            ActionKind::BuildCity { .. } => ActionType::BuildCity,
            ActionKind::BuildRoad { .. } => ActionType::BuildRoad,
            ActionKind::BankTrade { .. } => ActionType::BankTrade,
            ActionKind::ProposeTrade(_) => ActionType::ProposeTrade,
            ActionKind::AcceptTrade => ActionType::AcceptTrade,
            ActionKind::RejectTrade => ActionType::RejectTrade,
            ActionKind::BuyDevCard => ActionType::BuyDevCard,
            ActionKind::PlayDevCard(_) => ActionType::PlayDevCard,
            ActionKind::DiscardCards { .. } => ActionType::DiscardCards,
            ActionKind::MoveRobber { .. } => ActionType::MoveRobber,
            ActionKind::StealCard { .. } => ActionType::StealCard,
        }
    }
}

/// A command from one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub player: PlayerId,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(player: PlayerId, kind: ActionKind) -> Self {
        Self { player, kind }
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    /// Build an action from an untyped parameter bag, failing on the first
    /// missing field.
    pub fn from_parts(
        action: ActionType,
        player: PlayerId,
        params: &ActionParams,
    ) -> Result<Self, ActionError> {
        let need = |field: &'static str| ActionError::MissingParameter { action, field };

        let kind = match action {
            ActionType::RollDice => ActionKind::RollDice,
            ActionType::EndTurn => ActionKind::EndTurn,
            ActionType::AcceptTrade => ActionKind::AcceptTrade,
            ActionType::RejectTrade => ActionKind::RejectTrade,
            ActionType::BuyDevCard => ActionKind::BuyDevCard,
            ActionType::BuildSettlement => ActionKind::BuildSettlement {
                point: params.point.ok_or_else(|| need("point"))?,
            },
            ActionType::BuildCity => ActionKind::BuildCity {
                point: params.point.ok_or_else(|| need("point"))?,
            },
            ActionType::BuildRoad => ActionKind::BuildRoad {
                road: params.road().ok_or_else(|| need("road"))?,
            },
            ActionType::BankTrade => ActionKind::BankTrade {
                offer: params.offer.ok_or_else(|| need("offer"))?,
                request: params.request.ok_or_else(|| need("request"))?,
            },
            ActionType::ProposeTrade => ActionKind::ProposeTrade(TradeOffer {
                target: params.target.ok_or_else(|| need("target"))?,
                offer: params.offer.ok_or_else(|| need("offer"))?,
                request: params.request.ok_or_else(|| need("request"))?,
            }),
            ActionType::DiscardCards => ActionKind::DiscardCards {
                cards: params.offer.ok_or_else(|| need("offer"))?,
            },
            ActionType::MoveRobber => ActionKind::MoveRobber {
                tile: params.tile.ok_or_else(|| need("tile"))?,
            },
            ActionType::StealCard => ActionKind::StealCard {
                victim: params.victim.ok_or_else(|| need("victim"))?,
            },
            ActionType::PlayDevCard => {
                let name = params.card.as_deref().ok_or_else(|| need("card"))?;
                let card: DevelopmentCard = name
                    .parse()
                    .map_err(|_| ActionError::UnknownCard(name.to_string()))?;
                let play = match card {
                    DevelopmentCard::Knight => DevCardPlay::Knight {
                        tile: params.tile.ok_or_else(|| need("tile"))?,
                        victim: params.victim,
                    },
                    DevelopmentCard::RoadBuilding => DevCardPlay::RoadBuilding {
                        first: params.road().ok_or_else(|| need("road"))?,
                        second: params.second_road().ok_or_else(|| need("second_road"))?,
                    },
                    DevelopmentCard::Monopoly => DevCardPlay::Monopoly {
                        resource: params.resource.ok_or_else(|| need("resource"))?,
                    },
                    DevelopmentCard::YearOfPlenty => DevCardPlay::YearOfPlenty {
                        first: params.resource.ok_or_else(|| need("resource"))?,
                        second: params
                            .second_resource
                            .ok_or_else(|| need("second_resource"))?,
                    },
                    DevelopmentCard::VictoryPoint => return Err(ActionError::NotPlayable(card)),
                };
                ActionKind::PlayDevCard(play)
            }
        };

        Ok(Self { player, kind })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {} ", self.player)?;
        match &self.kind {
            ActionKind::BuildSettlement { point } => write!(f, "builds settlement at {point}"),
            ActionKind::BuildCity { point } => write!(f, "builds city at {point}"),
            ActionKind::BuildRoad { road } => write!(f, "builds {road}"),
            ActionKind::BankTrade { offer, request } => {
                write!(f, "trades {offer} with the bank for {request}")
            }
            ActionKind::ProposeTrade(t) => write!(
                f,
                "offers {} to player {} for {}",
                t.offer, t.target, t.request
            ),
            ActionKind::PlayDevCard(play) => write!(f, "plays {}", play.card()),
            ActionKind::DiscardCards { cards } => write!(f, "discards {cards}"),
            ActionKind::MoveRobber { tile } => write!(f, "moves the robber to {tile}"),
            ActionKind::StealCard { victim } => write!(f, "steals from player {victim}"),
            other => write!(f, "{:?}", other.action_type()),
        }
    }
}

/// Untyped action parameters, as filled in by external player sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    pub point: Option<PointRef>,
    pub road: Option<[PointRef; 2]>,
    pub second_road: Option<[PointRef; 2]>,
    pub tile: Option<TileRef>,
    pub victim: Option<PlayerId>,
    pub target: Option<PlayerId>,
    pub offer: Option<ResourceHand>,
    pub request: Option<ResourceHand>,
    pub card: Option<String>,
    pub resource: Option<Resource>,
    pub second_resource: Option<Resource>,
}

impl ActionParams {
    fn road(&self) -> Option<RoadSpan> {
        self.road.map(|[a, b]| RoadSpan::new(a, b))
    }

    fn second_road(&self) -> Option<RoadSpan> {
        self.second_road.map(|[a, b]| RoadSpan::new(a, b))
    }
}

/// Errors raised while building an action, before the engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{action:?} is missing '{field}'")]
    MissingParameter {
        action: ActionType,
        field: &'static str,
    },

    #[error("Unknown development card '{0}'")]
    UnknownCard(String),

    #[error("{0} cannot be played")]
    NotPlayable(DevelopmentCard),
}

impl From<ActionError> for EngineError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::MissingParameter { action, field } => {
                EngineError::MissingParameters { action, field }
            }
            ActionError::UnknownCard(name) => EngineError::UnknownCardName(name),
            ActionError::NotPlayable(card) => EngineError::CardNotPlayable(card),
        }
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },

    /// Resources were produced after a dice roll
    ResourcesDistributed {
        distributions: Vec<(PlayerId, Resource, u32)>,
    },

    /// A resource could not be paid out because the bank ran short
    ProductionBlocked { resource: Resource },

    /// Starting resources for a second-round settlement
    StartingResources {
        player: PlayerId,
        resources: ResourceHand,
    },

    SettlementBuilt {
        player: PlayerId,
        point: PointRef,
    },

    CityBuilt {
        player: PlayerId,
        point: PointRef,
    },

    RoadBuilt {
        player: PlayerId,
        road: RoadSpan,
    },

    /// The card is only visible to the buyer
    DevelopmentCardPurchased {
        player: PlayerId,
        card: Option<DevelopmentCard>,
    },

    KnightPlayed { player: PlayerId },

    RoadBuildingPlayed { player: PlayerId },

    YearOfPlentyPlayed {
        player: PlayerId,
        resources: (Resource, Resource),
    },

    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_stolen: u32,
    },

    /// Players who must discard after a 7, with the required counts
    DiscardRequired { players: Vec<(PlayerId, u32)> },

    CardsDiscarded {
        player: PlayerId,
        cards: ResourceHand,
    },

    RobberMoved {
        player: PlayerId,
        from: TileRef,
        to: TileRef,
    },

    /// The resource is hidden from everyone but the thief
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    BankTradeCompleted {
        player: PlayerId,
        gave: ResourceHand,
        received: ResourceHand,
    },

    TradeCompleted {
        proposer: PlayerId,
        target: PlayerId,
        offer: ResourceHand,
        request: ResourceHand,
    },

    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },

    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

impl GameEvent {
    /// The event as `viewer` is allowed to see it; `None` is the public view
    pub fn redacted_for(&self, viewer: Option<PlayerId>) -> GameEvent {
        match self {
            GameEvent::ResourceStolen { thief, victim, .. } if viewer != Some(*thief) => {
                GameEvent::ResourceStolen {
                    thief: *thief,
                    victim: *victim,
                    resource: None,
                }
            }
            GameEvent::DevelopmentCardPurchased { player, .. } if viewer != Some(*player) => {
                GameEvent::DevelopmentCardPurchased {
                    player: *player,
                    card: None,
                }
            }
            other => other.clone(),
        }
    }
}

//! Buying and playing development cards.

use super::Outcome;
use crate::actions::{DevCardPlay, GameEvent};
use crate::board::{PlayerId, Resource};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::player::{costs, DevelopmentCard, ResourceHand};
use crate::topology::{RoadSpan, TileRef};
use tracing::debug;

impl Engine {
    pub(crate) fn buy_dev_card(&mut self, actor: PlayerId) -> Result<Outcome, EngineError> {
        if !self.state.player(actor)?.can_afford_dev_card() {
            return Err(EngineError::InsufficientResources { player: actor });
        }
        if self.state.bank.development_cards_left() == 0 {
            return Err(EngineError::EmptyDeck);
        }

        self.pay(actor, &costs::development_card())?;
        let card = self
            .state
            .bank
            .draw_development_card()
            .ok_or(EngineError::EmptyDeck)?;
        self.state
            .player_mut(actor)?
            .dev_cards_bought_this_turn
            .push(card);
        debug!(player = actor, %card, "development card bought");

        Ok(Outcome::event(GameEvent::DevelopmentCardPurchased {
            player: actor,
            card: Some(card),
        }))
    }

    pub(crate) fn play_dev_card(
        &mut self,
        actor: PlayerId,
        play: &DevCardPlay,
    ) -> Result<Outcome, EngineError> {
        if self.state.dev_card_played_this_turn {
            return Err(EngineError::CardAlreadyPlayed);
        }
        let card = play.card();
        if !self.state.player(actor)?.has_playable_dev_card(card) {
            return Err(EngineError::NoSuchCard(card));
        }

        let mut outcome = match play {
            DevCardPlay::Knight { tile, victim } => self.play_knight(actor, *tile, *victim)?,
            DevCardPlay::RoadBuilding { first, second } => {
                self.play_road_building(actor, *first, *second)?
            }
            DevCardPlay::Monopoly { resource } => self.play_monopoly(actor, *resource),
            DevCardPlay::YearOfPlenty { first, second } => {
                self.play_year_of_plenty(actor, *first, *second)
            }
        };

        self.state.player_mut(actor)?.play_dev_card(card);
        self.state.dev_card_played_this_turn = true;

        if card == DevelopmentCard::Knight {
            self.update_largest_army(&mut outcome);
        }
        Ok(outcome)
    }

    fn play_knight(
        &mut self,
        actor: PlayerId,
        tile: TileRef,
        victim: Option<PlayerId>,
    ) -> Result<Outcome, EngineError> {
        self.check_robber_target(tile)?;
        let eligible = self.eligible_victims(tile, actor);
        let victim = match victim {
            Some(v) if eligible.contains(&v) => Some(v),
            Some(v) => return Err(EngineError::InvalidVictim { victim: v }),
            None => eligible.first().copied(),
        };

        let mut outcome = Outcome::event(GameEvent::KnightPlayed { player: actor });
        self.relocate_robber(actor, tile, &mut outcome);
        if let Some(victim) = victim {
            self.rob(actor, victim, &mut outcome);
        }
        Ok(outcome)
    }

    /// Both roads or neither. The second may hang off the first, in either
    /// order.
    fn play_road_building(
        &mut self,
        actor: PlayerId,
        first: RoadSpan,
        second: RoadSpan,
    ) -> Result<Outcome, EngineError> {
        self.check_road_site(first)?;
        self.check_road_site(second)?;
        if first == second {
            return Err(EngineError::RoadOccupied(second));
        }
        if self.state.player(actor)?.roads_remaining() < 2 {
            return Err(EngineError::NoPiecesRemaining("road"));
        }

        let board = &self.state.board;
        let extends = |from: RoadSpan, to: RoadSpan| {
            board.road_connects(to, actor)
                || from.endpoints().into_iter().any(|p| {
                    to.touches(p) && board.building_at(p).map_or(true, |b| b.owner == actor)
                })
        };
        let order = if board.road_connects(first, actor) && extends(first, second) {
            [first, second]
        } else if board.road_connects(second, actor) && extends(second, first) {
            [second, first]
        } else if !board.road_connects(first, actor) && !board.road_connects(second, actor) {
            return Err(EngineError::Disconnected(first));
        } else {
            let stray = if board.road_connects(first, actor) {
                second
            } else {
                first
            };
            return Err(EngineError::Disconnected(stray));
        };

        let mut outcome = Outcome::event(GameEvent::RoadBuildingPlayed { player: actor });
        for road in order {
            self.lay_road(actor, road, &mut outcome);
        }
        Ok(outcome)
    }

    fn play_monopoly(&mut self, actor: PlayerId, resource: Resource) -> Outcome {
        let mut outcome = Outcome::default();
        let mut total_stolen = 0;
        for other in &mut self.state.players {
            if other.id == actor {
                continue;
            }
            let taken = other.resources.take_all(resource);
            if taken > 0 {
                outcome.affected.insert(other.id);
            }
            total_stolen += taken;
        }
        if let Ok(player) = self.state.player_mut(actor) {
            player.resources.add(resource, total_stolen);
        }
        outcome.events.push(GameEvent::MonopolyPlayed {
            player: actor,
            resource,
            total_stolen,
        });
        outcome
    }

    fn play_year_of_plenty(&mut self, actor: PlayerId, first: Resource, second: Resource) -> Outcome {
        let mut hand = ResourceHand::single(first, 1);
        hand.add(second, 1);
        self.state.bank.dispense_unlimited(&hand);
        if let Ok(player) = self.state.player_mut(actor) {
            player.resources.add_hand(&hand);
        }
        Outcome::event(GameEvent::YearOfPlentyPlayed {
            player: actor,
            resources: (first, second),
        })
    }
}

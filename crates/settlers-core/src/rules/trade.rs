//! Bank (maritime) trades and player-to-player trades.

use super::Outcome;
use crate::actions::{Action, ActionKind, GameEvent, TradeOffer};
use crate::board::{Harbor, PlayerId, Resource};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::player::ResourceHand;
use crate::state::GameState;
use tracing::debug;

/// Answers a trade proposal on behalf of its target.
///
/// The engine calls this while the proposer's action is still being
/// executed; the answer is only an acceptance if it is an `AcceptTrade`
/// from the target.
pub trait TradeNegotiator {
    fn solicit(&mut self, proposer: PlayerId, offer: &TradeOffer, state: &GameState) -> Option<Action>;
}

impl<F> TradeNegotiator for F
where
    F: FnMut(PlayerId, &TradeOffer, &GameState) -> Option<Action>,
{
    fn solicit(&mut self, proposer: PlayerId, offer: &TradeOffer, state: &GameState) -> Option<Action> {
        self(proposer, offer, state)
    }
}

/// Rejects every proposal
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineTrades;

impl TradeNegotiator for DeclineTrades {
    fn solicit(&mut self, _proposer: PlayerId, offer: &TradeOffer, _state: &GameState) -> Option<Action> {
        Some(Action::new(offer.target, ActionKind::RejectTrade))
    }
}

fn invalid_trade(offer: &ResourceHand, request: &ResourceHand, reason: &'static str) -> EngineError {
    EngineError::InvalidTrade {
        offered: offer.to_string(),
        requested: request.to_string(),
        reason,
    }
}

impl Engine {
    /// Best rate `player` gets when giving away `resource`
    pub fn maritime_rate(&self, player: PlayerId, resource: Resource) -> u32 {
        let harbors = self.state.board.player_harbors(player);
        if harbors.contains(&Harbor::Specific(resource)) {
            2
        } else if harbors.contains(&Harbor::Generic) {
            3
        } else {
            4
        }
    }

    pub(crate) fn bank_trade(
        &mut self,
        actor: PlayerId,
        offer: &ResourceHand,
        request: &ResourceHand,
    ) -> Result<Outcome, EngineError> {
        if offer.is_empty() || request.is_empty() {
            return Err(invalid_trade(offer, request, "both sides must be non-empty"));
        }
        let given = offer.entries();
        let [(resource, count)] = given.as_slice() else {
            return Err(invalid_trade(offer, request, "offer a single resource kind"));
        };
        if request.get(*resource) > 0 {
            return Err(invalid_trade(offer, request, "cannot receive the resource you give"));
        }
        let rate = self.maritime_rate(actor, *resource);
        if *count != rate * request.total() {
            return Err(invalid_trade(offer, request, "offer does not match your trade rate"));
        }
        if !self.state.player(actor)?.resources.can_afford(offer) {
            return Err(EngineError::InsufficientResources { player: actor });
        }
        if let Some((short, _)) = request
            .entries()
            .into_iter()
            .find(|&(r, n)| self.state.bank.resources.get(r) < n)
        {
            return Err(EngineError::BankDepleted(short));
        }

        self.pay(actor, offer)?;
        self.state.bank.dispense(request);
        self.state.player_mut(actor)?.resources.add_hand(request);
        debug!(player = actor, rate, %offer, %request, "bank trade");

        Ok(Outcome::event(GameEvent::BankTradeCompleted {
            player: actor,
            gave: *offer,
            received: *request,
        }))
    }

    pub(crate) fn propose_trade(
        &mut self,
        actor: PlayerId,
        trade: &TradeOffer,
        negotiator: &mut dyn TradeNegotiator,
    ) -> Result<Outcome, EngineError> {
        let target = trade.target;
        if target == actor {
            return Err(invalid_trade(&trade.offer, &trade.request, "cannot trade with yourself"));
        }
        self.state.player(target)?;
        if trade.offer.is_empty() || trade.request.is_empty() {
            return Err(invalid_trade(
                &trade.offer,
                &trade.request,
                "both sides must be non-empty",
            ));
        }
        if !self.state.player(actor)?.resources.can_afford(&trade.offer) {
            return Err(EngineError::InsufficientResources { player: actor });
        }
        if !self.state.player(target)?.resources.can_afford(&trade.request) {
            return Err(EngineError::InsufficientResources { player: target });
        }

        let answer = negotiator.solicit(actor, trade, &self.state);
        let accepted = matches!(
            &answer,
            Some(Action { player, kind: ActionKind::AcceptTrade }) if *player == target
        );
        if !accepted {
            debug!(proposer = actor, target, ?answer, "trade declined");
            return Err(EngineError::TradeRejected { target });
        }

        // Hands are re-read: the negotiator only saw a shared borrow
        let proposer = self.state.player_mut(actor)?;
        proposer.resources.try_subtract(&trade.offer);
        proposer.resources.add_hand(&trade.request);
        let partner = self.state.player_mut(target)?;
        partner.resources.try_subtract(&trade.request);
        partner.resources.add_hand(&trade.offer);

        let mut outcome = Outcome::event(GameEvent::TradeCompleted {
            proposer: actor,
            target,
            offer: trade.offer,
            request: trade.request,
        });
        outcome.affected.insert(target);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Building, BuildingKind};
    use crate::error::ErrorKind;
    use crate::phase::{GamePhase, TurnPhase};
    use crate::state::GameConfig;
    use crate::topology::PointRef;
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        let mut state = Engine::new(&GameConfig::with_players(["A", "B", "C"]).with_seed(2))
            .unwrap()
            .into_state();
        state.game_phase = GamePhase::NormalPlay;
        state.turn_phase = TurnPhase::PlayerActions;
        state.turn_number = 6;
        Engine::from_state(state, 2)
    }

    fn give(engine: &mut Engine, player: PlayerId, hand: ResourceHand) {
        engine.state.players[player as usize].resources = hand;
    }

    fn bank_trade(offer: ResourceHand, request: ResourceHand) -> Action {
        Action::new(0, ActionKind::BankTrade { offer, request })
    }

    fn propose(target: PlayerId, offer: ResourceHand, request: ResourceHand) -> Action {
        Action::new(
            0,
            ActionKind::ProposeTrade(TradeOffer {
                target,
                offer,
                request,
            }),
        )
    }

    #[test]
    fn test_four_to_one() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(4, 0, 0, 0, 0));
        let before = engine.state().cards_in_play();

        engine
            .apply(&bank_trade(
                ResourceHand::with_amounts(4, 0, 0, 0, 0),
                ResourceHand::with_amounts(0, 0, 1, 0, 0),
            ))
            .unwrap();
        assert_eq!(
            engine.state().players[0].resources,
            ResourceHand::with_amounts(0, 0, 1, 0, 0)
        );
        assert_eq!(engine.state().bank.resources.brick, 23);
        assert_eq!(engine.state().cards_in_play(), before);
    }

    #[test]
    fn test_rate_must_match() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(5, 0, 0, 0, 0));
        let before = engine.state().clone();

        for (offer, request) in [
            (ResourceHand::with_amounts(3, 0, 0, 0, 0), ResourceHand::with_amounts(0, 1, 0, 0, 0)),
            (ResourceHand::with_amounts(4, 0, 0, 0, 0), ResourceHand::with_amounts(1, 0, 0, 0, 0)),
            (ResourceHand::with_amounts(2, 2, 0, 0, 0), ResourceHand::with_amounts(0, 0, 1, 0, 0)),
            (ResourceHand::new(), ResourceHand::with_amounts(0, 0, 1, 0, 0)),
        ] {
            let err = engine.apply(&bank_trade(offer, request)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InsufficientResources, "{offer} for {request}");
            assert_eq!(engine.state(), &before);
        }
    }

    #[test]
    fn test_harbor_rates() {
        let mut engine = engine();
        assert_eq!(engine.maritime_rate(0, Resource::Grain), 4);

        // 1-2 is a generic harbor, 4-5 a grain harbor
        for point in [PointRef(1), PointRef(4)] {
            engine.state.board.place_building(Building {
                kind: BuildingKind::Settlement,
                owner: 0,
                location: point,
            });
        }
        assert_eq!(engine.maritime_rate(0, Resource::Grain), 2);
        assert_eq!(engine.maritime_rate(0, Resource::Ore), 3);
        assert_eq!(engine.maritime_rate(1, Resource::Ore), 4);

        give(&mut engine, 0, ResourceHand::with_amounts(0, 0, 0, 4, 0));
        engine
            .apply(&bank_trade(
                ResourceHand::with_amounts(0, 0, 0, 4, 0),
                ResourceHand::with_amounts(1, 1, 0, 0, 0),
            ))
            .unwrap();
        assert_eq!(
            engine.state().players[0].resources,
            ResourceHand::with_amounts(1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_bank_out_of_stock() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(4, 0, 0, 0, 0));
        engine.state.bank.resources.ore = 0;
        let err = engine
            .apply(&bank_trade(
                ResourceHand::with_amounts(4, 0, 0, 0, 0),
                ResourceHand::with_amounts(0, 0, 1, 0, 0),
            ))
            .unwrap_err();
        assert_eq!(err, EngineError::BankDepleted(Resource::Ore));
    }

    #[test]
    fn test_player_trade_accepted() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(2, 0, 0, 0, 0));
        give(&mut engine, 2, ResourceHand::with_amounts(0, 0, 0, 1, 3));
        let total = engine.state().cards_in_hands();

        let mut asked = Vec::new();
        let mut accept = |proposer: PlayerId, offer: &TradeOffer, _: &GameState| {
            asked.push(proposer);
            Some(Action::new(offer.target, ActionKind::AcceptTrade))
        };
        let result = engine
            .execute(
                &propose(
                    2,
                    ResourceHand::with_amounts(2, 0, 0, 0, 0),
                    ResourceHand::with_amounts(0, 0, 0, 1, 0),
                ),
                &mut accept,
            )
            .unwrap();

        assert_eq!(asked, vec![0]);
        assert_eq!(result.affected_players, vec![0, 2]);
        assert_eq!(
            engine.state().players[0].resources,
            ResourceHand::with_amounts(0, 0, 0, 1, 0)
        );
        assert_eq!(
            engine.state().players[2].resources,
            ResourceHand::with_amounts(2, 0, 0, 0, 3)
        );
        assert_eq!(engine.state().cards_in_hands(), total);
    }

    #[test]
    fn test_player_trade_rejected() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(1, 0, 0, 0, 0));
        give(&mut engine, 1, ResourceHand::with_amounts(0, 1, 0, 0, 0));
        let before = engine.state().clone();

        let action = propose(
            1,
            ResourceHand::with_amounts(1, 0, 0, 0, 0),
            ResourceHand::with_amounts(0, 1, 0, 0, 0),
        );
        let err = engine.apply(&action).unwrap_err();
        assert_eq!(err, EngineError::TradeRejected { target: 1 });
        assert!(!err.is_retryable());
        assert_eq!(engine.state(), &before);

        // Accepting on someone else's behalf does not count
        let mut impostor =
            |_: PlayerId, _: &TradeOffer, _: &GameState| Some(Action::new(2, ActionKind::AcceptTrade));
        let err = engine.execute(&action, &mut impostor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TradeRejected);
    }

    #[test]
    fn test_target_must_hold_request() {
        let mut engine = engine();
        give(&mut engine, 0, ResourceHand::with_amounts(1, 0, 0, 0, 0));
        let mut never = |_: PlayerId, _: &TradeOffer, _: &GameState| -> Option<Action> {
            panic!("target should not be asked")
        };
        let err = engine
            .execute(
                &propose(
                    1,
                    ResourceHand::with_amounts(1, 0, 0, 0, 0),
                    ResourceHand::with_amounts(0, 1, 0, 0, 0),
                ),
                &mut never,
            )
            .unwrap_err();
        assert_eq!(err, EngineError::InsufficientResources { player: 1 });
    }
}

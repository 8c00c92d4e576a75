//! Dice, production, and the 7 sequence: discard, move the robber, steal.

use super::Outcome;
use crate::actions::GameEvent;
use crate::board::{PlayerId, Resource};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::phase::TurnPhase;
use crate::player::ResourceHand;
use crate::state::DISCARD_LIMIT;
use crate::topology::TileRef;
use std::collections::BTreeMap;
use tracing::debug;

impl Engine {
    pub(crate) fn roll_dice(&mut self, actor: PlayerId) -> Result<Outcome, EngineError> {
        let (die1, die2) = self.dice.roll();
        let total = die1 + die2;
        self.state.dice_roll = Some((die1, die2));

        let mut outcome = Outcome::event(GameEvent::DiceRolled {
            player: actor,
            roll: (die1, die2),
            total,
        });

        if total == 7 {
            let must_discard: BTreeMap<PlayerId, u32> = self
                .state
                .players
                .iter()
                .filter(|p| p.resources.total() > DISCARD_LIMIT)
                .map(|p| (p.id, p.resources.total() / 2))
                .collect();

            if must_discard.is_empty() {
                self.state.turn_phase = TurnPhase::RobberMove;
            } else {
                outcome.events.push(GameEvent::DiscardRequired {
                    players: must_discard.iter().map(|(&p, &n)| (p, n)).collect(),
                });
                outcome.affected.extend(must_discard.keys().copied());
                self.state.players_must_discard = must_discard;
                self.state.turn_phase = TurnPhase::DiscardPhase;
            }
        } else {
            self.produce(total, &mut outcome);
            self.state.turn_phase = TurnPhase::PlayerActions;
        }

        Ok(outcome)
    }

    /// Pay out a roll from the bank. A resource the bank cannot cover for
    /// every claimant is paid to nobody.
    fn produce(&mut self, roll: u8, outcome: &mut Outcome) {
        let owed = self
            .state
            .board
            .production(roll, self.topology.as_ref());

        let mut demand = ResourceHand::new();
        for hand in owed.values() {
            demand.add_hand(hand);
        }

        let mut distributions = Vec::new();
        for resource in Resource::ALL {
            let wanted = demand.get(resource);
            if wanted == 0 {
                continue;
            }
            if self.state.bank.resources.get(resource) < wanted {
                debug!(%resource, wanted, "bank short, production blocked");
                outcome
                    .events
                    .push(GameEvent::ProductionBlocked { resource });
                continue;
            }
            for (&player, hand) in &owed {
                let amount = hand.get(resource);
                if amount == 0 {
                    continue;
                }
                let Ok(p) = self.state.player_mut(player) else {
                    continue;
                };
                p.resources.add(resource, amount);
                self.state
                    .bank
                    .dispense(&ResourceHand::single(resource, amount));
                distributions.push((player, resource, amount));
                outcome.affected.insert(player);
            }
        }

        if !distributions.is_empty() {
            outcome
                .events
                .push(GameEvent::ResourcesDistributed { distributions });
        }
    }

    pub(crate) fn discard(
        &mut self,
        actor: PlayerId,
        cards: &ResourceHand,
    ) -> Result<Outcome, EngineError> {
        let required = self
            .state
            .players_must_discard
            .get(&actor)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("player {actor} owes no discard")))?;
        if cards.total() != required {
            return Err(EngineError::DiscardCountMismatch {
                player: actor,
                required,
                offered: cards.total(),
            });
        }
        if !self.state.player(actor)?.resources.can_afford(cards) {
            return Err(EngineError::InsufficientResources { player: actor });
        }

        self.state.player_mut(actor)?.resources.try_subtract(cards);
        Ok(self.finish_discard(actor, *cards))
    }

    /// Return discarded cards to the bank and move on once nobody owes any
    pub(crate) fn finish_discard(&mut self, player: PlayerId, cards: ResourceHand) -> Outcome {
        self.state.bank.receive(&cards);
        self.state.players_must_discard.remove(&player);
        if self.state.players_must_discard.is_empty() {
            self.state.turn_phase = TurnPhase::RobberMove;
        }
        let mut outcome = Outcome::event(GameEvent::CardsDiscarded { player, cards });
        outcome.affected.insert(player);
        outcome
    }

    pub(crate) fn move_robber(
        &mut self,
        actor: PlayerId,
        tile: TileRef,
    ) -> Result<Outcome, EngineError> {
        self.check_robber_target(tile)?;
        let victims = self.eligible_victims(tile, actor);

        let mut outcome = Outcome::default();
        self.relocate_robber(actor, tile, &mut outcome);

        match victims.as_slice() {
            [] => self.state.turn_phase = TurnPhase::PlayerActions,
            [only] => {
                self.rob(actor, *only, &mut outcome);
                self.state.turn_phase = TurnPhase::PlayerActions;
            }
            _ => {
                self.state.steal_pending = true;
                self.state.steal_candidates = victims;
                self.state.turn_phase = TurnPhase::RobberSteal;
            }
        }
        Ok(outcome)
    }

    pub(crate) fn steal(&mut self, actor: PlayerId, victim: PlayerId) -> Result<Outcome, EngineError> {
        if victim == actor || !self.state.steal_candidates.contains(&victim) {
            return Err(EngineError::InvalidVictim { victim });
        }
        self.state.player(victim)?;

        let mut outcome = Outcome::default();
        self.rob(actor, victim, &mut outcome);
        self.state.steal_pending = false;
        self.state.steal_candidates.clear();
        self.state.turn_phase = TurnPhase::PlayerActions;
        Ok(outcome)
    }

    /// Tiles the robber may move to
    pub fn legal_robber_tiles(&self) -> Vec<TileRef> {
        let current = self.state.board.robber();
        self.topology
            .tiles()
            .into_iter()
            .filter(|&t| t != current && self.state.board.tile(t).is_some())
            .collect()
    }

    /// The robber must land on a real tile other than its current one
    pub(crate) fn check_robber_target(&self, tile: TileRef) -> Result<(), EngineError> {
        if !self.topology.contains_tile(tile) || self.state.board.tile(tile).is_none() {
            return Err(EngineError::UnknownTile(tile));
        }
        if tile == self.state.board.robber() {
            return Err(EngineError::RobberUnchanged(tile));
        }
        Ok(())
    }

    pub(crate) fn relocate_robber(&mut self, actor: PlayerId, tile: TileRef, outcome: &mut Outcome) {
        let from = self.state.board.robber();
        self.state.board.move_robber(tile);
        self.state.robber_moved = true;
        outcome.events.push(GameEvent::RobberMoved {
            player: actor,
            from,
            to: tile,
        });
    }

    /// Move one uniformly random card from `victim` to `thief`
    pub(crate) fn rob(&mut self, thief: PlayerId, victim: PlayerId, outcome: &mut Outcome) {
        let stolen = self
            .state
            .player_mut(victim)
            .ok()
            .and_then(|p| p.resources.steal_random(&mut self.rng));

        if let Some(resource) = stolen {
            if let Ok(p) = self.state.player_mut(thief) {
                p.resources.add(resource, 1);
            }
        }
        outcome.affected.insert(victim);
        outcome.events.push(GameEvent::ResourceStolen {
            thief,
            victim,
            resource: stolen,
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::{Action, ActionKind, GameEvent};
    use crate::board::{Building, BuildingKind};
    use crate::dice::LoadedDice;
    use crate::engine::Engine;
    use crate::error::{EngineError, ErrorKind};
    use crate::phase::{GamePhase, TurnPhase};
    use crate::player::ResourceHand;
    use crate::state::{GameConfig, GameState};
    use crate::topology::{PointRef, TileRef};
    use pretty_assertions::assert_eq;

    /// Three players in normal play, player 0 to roll
    fn state() -> GameState {
        let engine =
            Engine::new(&GameConfig::with_players(["A", "B", "C"]).with_seed(8)).unwrap();
        let mut state = engine.into_state();
        state.game_phase = GamePhase::NormalPlay;
        state.turn_phase = TurnPhase::RollDice;
        state.turn_number = 6;
        state
    }

    fn settle(state: &mut GameState, owner: u8, point: u16) {
        state.board.place_building(Building {
            kind: BuildingKind::Settlement,
            owner,
            location: PointRef(point),
        });
        state.players[owner as usize].settlements.insert(PointRef(point));
    }

    fn discard(player: u8, cards: ResourceHand) -> Action {
        Action::new(player, ActionKind::DiscardCards { cards })
    }

    #[test]
    fn test_seven_with_nobody_over_limit_goes_to_robber() {
        let mut engine = Engine::from_state(state(), 1).with_dice(LoadedDice::totals([7]));
        engine.apply(&Action::new(0, ActionKind::RollDice)).unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::RobberMove);
        assert_eq!(engine.state().dice_roll, Some((3, 4)));
    }

    #[test]
    fn test_discard_math_and_order() {
        let mut state = state();
        state.players[1].resources = ResourceHand::with_amounts(2, 2, 2, 2, 1);
        state.players[2].resources = ResourceHand::with_amounts(8, 0, 0, 0, 0);
        let mut engine = Engine::from_state(state, 1).with_dice(LoadedDice::totals([7]));

        engine.apply(&Action::new(0, ActionKind::RollDice)).unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::DiscardPhase);
        assert_eq!(engine.state().players_must_discard.get(&1), Some(&4));
        assert_eq!(engine.state().players_must_discard.get(&2), Some(&4));
        assert_eq!(engine.state().active_player(), 1);

        // Player 2 must wait for player 1
        let err = engine
            .apply(&discard(2, ResourceHand::with_amounts(4, 0, 0, 0, 0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotYourTurn);

        let before = engine.state().clone();
        for wrong in [
            ResourceHand::with_amounts(1, 1, 1, 0, 0),
            ResourceHand::with_amounts(1, 1, 1, 1, 1),
        ] {
            let err = engine.apply(&discard(1, wrong)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InsufficientResources);
            assert_eq!(engine.state(), &before);
        }
        let err = engine
            .apply(&discard(1, ResourceHand::with_amounts(0, 0, 0, 0, 4)))
            .unwrap_err();
        assert_eq!(err, EngineError::InsufficientResources { player: 1 });

        engine
            .apply(&discard(1, ResourceHand::with_amounts(1, 1, 1, 1, 0)))
            .unwrap();
        assert_eq!(engine.state().players[1].resources.total(), 5);
        assert_eq!(engine.state().turn_phase, TurnPhase::DiscardPhase);

        engine
            .apply(&discard(2, ResourceHand::with_amounts(4, 0, 0, 0, 0)))
            .unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::RobberMove);
        assert_eq!(engine.state().active_player(), 0);
    }

    #[test]
    fn test_robber_must_move() {
        let mut state = state();
        state.turn_phase = TurnPhase::RobberMove;
        let robber = state.board.robber();
        let mut engine = Engine::from_state(state, 1);

        let err = engine
            .apply(&Action::new(0, ActionKind::MoveRobber { tile: robber }))
            .unwrap_err();
        assert_eq!(err, EngineError::RobberUnchanged(robber));

        let err = engine
            .apply(&Action::new(0, ActionKind::MoveRobber { tile: TileRef(42) }))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownTile(TileRef(42)));
    }

    #[test]
    fn test_single_victim_is_robbed_automatically() {
        let mut state = state();
        state.turn_phase = TurnPhase::RobberMove;
        // Point 1 sits only on tile 1
        settle(&mut state, 1, 1);
        state.players[1].resources = ResourceHand::with_amounts(0, 0, 2, 0, 0);
        let mut engine = Engine::from_state(state, 1);

        let result = engine
            .apply(&Action::new(0, ActionKind::MoveRobber { tile: TileRef(1) }))
            .unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::PlayerActions);
        assert_eq!(engine.state().players[0].resources.ore, 1);
        assert_eq!(engine.state().players[1].resources.ore, 1);
        assert!(result.events.contains(&GameEvent::ResourceStolen {
            thief: 0,
            victim: 1,
            resource: Some(crate::board::Resource::Ore)
        }));
        assert_eq!(result.affected_players, vec![0, 1]);
    }

    #[test]
    fn test_two_victims_need_a_choice() {
        let mut state = state();
        state.turn_phase = TurnPhase::RobberMove;
        // Points 1 and 3 both touch tile 1
        settle(&mut state, 1, 1);
        settle(&mut state, 2, 3);
        state.players[1].resources = ResourceHand::with_amounts(1, 0, 0, 0, 0);
        state.players[2].resources = ResourceHand::with_amounts(0, 1, 0, 0, 0);
        let mut engine = Engine::from_state(state, 1);

        engine
            .apply(&Action::new(0, ActionKind::MoveRobber { tile: TileRef(1) }))
            .unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::RobberSteal);
        assert_eq!(engine.state().steal_candidates, vec![1, 2]);
        assert!(engine.state().steal_pending);

        let err = engine
            .apply(&Action::new(0, ActionKind::StealCard { victim: 0 }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAdjacent);

        engine
            .apply(&Action::new(0, ActionKind::StealCard { victim: 2 }))
            .unwrap();
        assert_eq!(
            engine.state().players[0].resources,
            ResourceHand::with_amounts(0, 1, 0, 0, 0)
        );
        assert!(!engine.state().steal_pending);
        assert_eq!(engine.state().turn_phase, TurnPhase::PlayerActions);
    }

    #[test]
    fn test_victim_without_cards_is_skipped() {
        let mut state = state();
        state.turn_phase = TurnPhase::RobberMove;
        settle(&mut state, 1, 1);
        let mut engine = Engine::from_state(state, 1);

        let result = engine
            .apply(&Action::new(0, ActionKind::MoveRobber { tile: TileRef(1) }))
            .unwrap();
        assert_eq!(engine.state().turn_phase, TurnPhase::PlayerActions);
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn test_production_pays_from_bank() {
        let mut state = state();
        // Tile 1 is ore on 10
        settle(&mut state, 1, 1);
        let mut engine = Engine::from_state(state, 1).with_dice(LoadedDice::totals([10]));

        engine.apply(&Action::new(0, ActionKind::RollDice)).unwrap();
        assert_eq!(engine.state().players[1].resources.ore, 1);
        assert_eq!(engine.state().bank.resources.ore, 18);
        assert_eq!(engine.state().turn_phase, TurnPhase::PlayerActions);
    }

    #[test]
    fn test_production_blocked_when_bank_short() {
        let mut state = state();
        settle(&mut state, 1, 1);
        state.bank.resources.ore = 0;
        let mut engine = Engine::from_state(state, 1).with_dice(LoadedDice::totals([10]));

        let result = engine.apply(&Action::new(0, ActionKind::RollDice)).unwrap();
        assert_eq!(engine.state().players[1].resources.ore, 0);
        assert!(result.events.contains(&GameEvent::ProductionBlocked {
            resource: crate::board::Resource::Ore
        }));
    }
}

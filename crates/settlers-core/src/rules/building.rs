//! Settlement, city and road placement, including free setup placement.

use super::Outcome;
use crate::actions::GameEvent;
use crate::board::{Building, BuildingKind, PlayerId, Road};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::phase::GamePhase;
use crate::player::{costs, ResourceHand};
use crate::topology::{PointRef, RoadSpan};

impl Engine {
    pub(crate) fn build_settlement(
        &mut self,
        actor: PlayerId,
        point: PointRef,
    ) -> Result<Outcome, EngineError> {
        self.check_point(point)?;
        if !self
            .state
            .board
            .satisfies_distance_rule(point, self.topology.as_ref())
        {
            return Err(EngineError::LocationBlocked(point));
        }
        let player = self.state.player(actor)?;
        if player.settlements_remaining() == 0 {
            return Err(EngineError::NoPiecesRemaining("settlement"));
        }

        let setup = self.state.game_phase.is_setup();
        let starting = if self.state.game_phase == GamePhase::SetupSecondRound {
            let hand = self
                .state
                .board
                .starting_resources(point, self.topology.as_ref());
            if let Some(short) = hand
                .entries()
                .into_iter()
                .find(|&(r, n)| self.state.bank.resources.get(r) < n)
            {
                return Err(EngineError::BankDepleted(short.0));
            }
            Some(hand)
        } else {
            None
        };

        if !setup {
            if !self.state.board.has_road_touching(point, actor) {
                return Err(EngineError::SiteNotConnected(point));
            }
            if !player.resources.can_afford(&costs::settlement()) {
                return Err(EngineError::InsufficientResources { player: actor });
            }
        }

        // Validation done; mutate
        let mut outcome = Outcome::event(GameEvent::SettlementBuilt {
            player: actor,
            point,
        });
        if !setup {
            self.pay(actor, &costs::settlement())?;
        }
        self.state.board.place_building(Building {
            kind: BuildingKind::Settlement,
            owner: actor,
            location: point,
        });
        self.state.player_mut(actor)?.settlements.insert(point);

        if setup {
            self.state.setup_progress.settlement = Some(point);
        }
        if let Some(hand) = starting {
            self.state.bank.dispense(&hand);
            self.state.player_mut(actor)?.resources.add_hand(&hand);
            outcome.events.push(GameEvent::StartingResources {
                player: actor,
                resources: hand,
            });
        }

        // A new settlement can cut an opponent's road
        self.update_longest_road(&mut outcome);
        Ok(outcome)
    }

    pub(crate) fn build_city(
        &mut self,
        actor: PlayerId,
        point: PointRef,
    ) -> Result<Outcome, EngineError> {
        self.check_point(point)?;
        match self.state.board.building_at(point) {
            Some(b) if b.owner == actor && b.kind == BuildingKind::Settlement => {}
            _ => return Err(EngineError::NoSettlement(point)),
        }
        let player = self.state.player(actor)?;
        if player.cities_remaining() == 0 {
            return Err(EngineError::NoPiecesRemaining("city"));
        }
        if !player.resources.can_afford(&costs::city()) {
            return Err(EngineError::InsufficientResources { player: actor });
        }

        self.pay(actor, &costs::city())?;
        self.state.board.upgrade_to_city(point);
        let player = self.state.player_mut(actor)?;
        player.settlements.remove(&point);
        player.cities.insert(point);

        Ok(Outcome::event(GameEvent::CityBuilt {
            player: actor,
            point,
        }))
    }

    pub(crate) fn build_road(
        &mut self,
        actor: PlayerId,
        road: RoadSpan,
    ) -> Result<Outcome, EngineError> {
        self.check_road_site(road)?;

        let setup = self.state.game_phase.is_setup();
        let player = self.state.player(actor)?;
        if player.roads_remaining() == 0 {
            return Err(EngineError::NoPiecesRemaining("road"));
        }
        if setup {
            // The starting road hangs off this turn's starting settlement
            let anchored = self
                .state
                .setup_progress
                .settlement
                .is_some_and(|p| road.touches(p));
            if !anchored {
                return Err(EngineError::Disconnected(road));
            }
        } else {
            if !self.state.board.road_connects(road, actor) {
                return Err(EngineError::Disconnected(road));
            }
            if !player.resources.can_afford(&costs::road()) {
                return Err(EngineError::InsufficientResources { player: actor });
            }
        }

        let mut outcome = Outcome::default();
        if !setup {
            self.pay(actor, &costs::road())?;
        }
        self.lay_road(actor, road, &mut outcome);

        if setup {
            self.state.setup_progress.road_placed = true;
            if self.state.setup_progress.is_complete() {
                outcome.events.push(self.advance_turn(actor));
                outcome.ends_turn = true;
            }
        }
        Ok(outcome)
    }

    /// Board checks shared by every road placement
    pub(crate) fn check_road_site(&self, road: RoadSpan) -> Result<(), EngineError> {
        for point in road.endpoints() {
            self.check_point(point)?;
        }
        let [a, b] = road.endpoints();
        if road.is_degenerate() || !self.topology.is_road_adjacent(a, b) {
            return Err(EngineError::NotAdjacent(road));
        }
        if self.state.board.road_at(road).is_some() {
            return Err(EngineError::RoadOccupied(road));
        }
        Ok(())
    }

    /// Place a road that has already been validated
    pub(crate) fn lay_road(&mut self, actor: PlayerId, road: RoadSpan, outcome: &mut Outcome) {
        self.state.board.place_road(Road {
            owner: actor,
            span: road,
        });
        if let Ok(player) = self.state.player_mut(actor) {
            player.roads.insert(road);
        }
        outcome.events.push(GameEvent::RoadBuilt {
            player: actor,
            road,
        });
        self.update_longest_road(outcome);
    }

    pub(crate) fn check_point(&self, point: PointRef) -> Result<(), EngineError> {
        if self.topology.contains_point(point) {
            Ok(())
        } else {
            Err(EngineError::UnknownPoint(point))
        }
    }

    /// Move an already-affordable cost from a player to the bank.
    ///
    /// Handlers check affordability first and pay before any other
    /// mutation, so a shortfall here is an internal fault.
    pub(crate) fn pay(&mut self, actor: PlayerId, cost: &ResourceHand) -> Result<(), EngineError> {
        let player = self.state.player_mut(actor)?;
        if !player.resources.try_subtract(cost) {
            return Err(EngineError::Internal(format!(
                "player {actor} cannot pay {cost} after validation"
            )));
        }
        self.state.bank.receive(cost);
        Ok(())
    }

    // ==================== Queries for player sources ====================

    /// Points where `player` could place a settlement right now
    pub fn legal_settlement_points(&self, player: PlayerId) -> Vec<PointRef> {
        let setup = self.state.game_phase.is_setup();
        self.topology
            .points()
            .into_iter()
            .filter(|&p| {
                self.state
                    .board
                    .satisfies_distance_rule(p, self.topology.as_ref())
            })
            .filter(|&p| setup || self.state.board.has_road_touching(p, player))
            .collect()
    }

    /// Spans where `player` could place a road right now
    pub fn legal_road_spans(&self, player: PlayerId) -> Vec<RoadSpan> {
        let mut spans = Vec::new();
        for point in self.topology.points() {
            for other in self.topology.adjacent_points(point) {
                if point >= other {
                    continue;
                }
                let span = RoadSpan::new(point, other);
                if self.state.board.road_at(span).is_some() {
                    continue;
                }
                let ok = if self.state.game_phase.is_setup() {
                    self.state
                        .setup_progress
                        .settlement
                        .is_some_and(|s| span.touches(s))
                } else {
                    self.state.board.road_connects(span, player)
                };
                if ok {
                    spans.push(span);
                }
            }
        }
        spans
    }

    /// Settlements `player` could upgrade
    pub fn legal_city_points(&self, player: PlayerId) -> Vec<PointRef> {
        self.state
            .player(player)
            .map(|p| p.settlements.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::{Action, ActionKind};
    use crate::engine::Engine;
    use crate::error::{EngineError, ErrorKind};
    use crate::phase::{GamePhase, TurnPhase};
    use crate::player::{costs, ResourceHand};
    use crate::state::GameConfig;
    use crate::topology::{PointRef, RoadSpan};
    use pretty_assertions::assert_eq;

    fn road(a: u16, b: u16) -> RoadSpan {
        RoadSpan::new(PointRef(a), PointRef(b))
    }

    fn setup_engine() -> Engine {
        Engine::new(&GameConfig::with_players(["A", "B"]).with_seed(4)).unwrap()
    }

    /// Two-player game in normal play: player 0 owns a settlement at 1 with
    /// a road 1-2, player 1 owns a settlement at 4
    fn normal_play() -> Engine {
        let mut engine = setup_engine();
        let steps = [
            (0, ActionKind::BuildSettlement { point: PointRef(1) }),
            (0, ActionKind::BuildRoad { road: road(1, 2) }),
            (1, ActionKind::BuildSettlement { point: PointRef(5) }),
            (1, ActionKind::BuildRoad { road: road(5, 6) }),
            (1, ActionKind::BuildSettlement { point: PointRef(40) }),
            (1, ActionKind::BuildRoad { road: road(40, 41) }),
            (0, ActionKind::BuildSettlement { point: PointRef(30) }),
            (0, ActionKind::BuildRoad { road: road(30, 31) }),
        ];
        for (player, kind) in steps {
            engine.apply(&Action::new(player, kind)).unwrap();
        }
        let mut state = engine.into_state();
        state.turn_phase = TurnPhase::PlayerActions;
        Engine::from_state(state, 4)
    }

    #[test]
    fn test_setup_reaches_normal_play() {
        let engine = normal_play();
        assert_eq!(engine.state().game_phase, GamePhase::NormalPlay);
        assert_eq!(engine.state().current_player, 0);
        assert_eq!(engine.state().turn_number, 4);
    }

    #[test]
    fn test_second_round_settlement_grants_starting_resources() {
        let engine = normal_play();
        // Point 30 touches three producing tiles, point 40 at least one
        assert!(engine.state().players[0].resources.total() >= 1);
        assert!(engine.state().players[1].resources.total() >= 1);
        assert_eq!(
            engine.state().cards_in_play(),
            crate::state::TOTAL_RESOURCE_CARDS
        );
    }

    #[test]
    fn test_setup_settlement_respects_distance_rule() {
        let mut engine = setup_engine();
        engine
            .apply(&Action::new(0, ActionKind::BuildSettlement { point: PointRef(1) }))
            .unwrap();
        engine
            .apply(&Action::new(0, ActionKind::BuildRoad { road: road(1, 2) }))
            .unwrap();
        let err = engine
            .apply(&Action::new(1, ActionKind::BuildSettlement { point: PointRef(2) }))
            .unwrap_err();
        assert_eq!(err, EngineError::LocationBlocked(PointRef(2)));
    }

    #[test]
    fn test_setup_road_must_touch_new_settlement() {
        let mut engine = setup_engine();
        engine
            .apply(&Action::new(0, ActionKind::BuildSettlement { point: PointRef(1) }))
            .unwrap();
        let before = engine.state().clone();
        let err = engine
            .apply(&Action::new(0, ActionKind::BuildRoad { road: road(3, 4) }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disconnected);
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_road_between_non_neighbours() {
        let mut engine = setup_engine();
        engine
            .apply(&Action::new(0, ActionKind::BuildSettlement { point: PointRef(1) }))
            .unwrap();
        let err = engine
            .apply(&Action::new(0, ActionKind::BuildRoad { road: road(1, 3) }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAdjacent);
    }

    #[test]
    fn test_city_during_setup_is_invalid_phase() {
        let mut engine = setup_engine();
        let err = engine
            .apply(&Action::new(0, ActionKind::BuildCity { point: PointRef(1) }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPhase);
    }

    #[test]
    fn test_paid_road_costs_and_connects() {
        let mut engine = normal_play();
        let mut state = engine.into_state();
        state.players[0].resources = ResourceHand::with_amounts(1, 1, 0, 0, 0);
        engine = Engine::from_state(state, 1);

        let err = engine
            .apply(&Action::new(0, ActionKind::BuildRoad { road: road(10, 11) }))
            .unwrap_err();
        assert_eq!(err, EngineError::Disconnected(road(10, 11)));

        engine
            .apply(&Action::new(0, ActionKind::BuildRoad { road: road(2, 3) }))
            .unwrap();
        assert!(engine.state().players[0].resources.is_empty());
        assert_eq!(engine.state().players[0].roads.len(), 3);
        assert_eq!(engine.state().players[0].longest_road_length, 2);
    }

    #[test]
    fn test_settlement_needs_road_and_cost() {
        let mut engine = normal_play();
        let mut state = engine.into_state();
        state.players[0].resources = ResourceHand::new();
        engine = Engine::from_state(state, 1);

        let err = engine
            .apply(&Action::new(0, ActionKind::BuildSettlement { point: PointRef(12) }))
            .unwrap_err();
        assert_eq!(err, EngineError::SiteNotConnected(PointRef(12)));

        // 2 is next to the settlement at 1
        let err = engine
            .apply(&Action::new(0, ActionKind::BuildSettlement { point: PointRef(2) }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationBlocked);
    }

    #[test]
    fn test_city_upgrade_returns_settlement_piece() {
        let mut engine = normal_play();
        let mut state = engine.into_state();
        state.players[0].resources = ResourceHand::with_amounts(0, 0, 3, 2, 0);
        engine = Engine::from_state(state, 1);

        engine
            .apply(&Action::new(0, ActionKind::BuildCity { point: PointRef(1) }))
            .unwrap();
        let player = &engine.state().players[0];
        assert_eq!(player.settlements_remaining(), 4);
        assert_eq!(player.cities_remaining(), 3);
        assert!(player.resources.is_empty());

        let err = engine
            .apply(&Action::new(0, ActionKind::BuildCity { point: PointRef(5) }))
            .unwrap_err();
        assert_eq!(err, EngineError::NoSettlement(PointRef(5)));
    }

    #[test]
    fn test_unpayable_cost_is_an_internal_fault() {
        let mut engine = normal_play();
        engine.state.players[0].resources = ResourceHand::new();
        let before = engine.state().clone();

        let err = engine.pay(0, &costs::city()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        assert_eq!(engine.state(), &before);
    }
}

//! The turn orchestrator.
//!
//! [`GameManager`] owns the engine, one [`PlayerSource`] per seat and any
//! number of observers. Each step asks the active player for one action,
//! executes it, and tells everyone what happened. Player trades are
//! answered by a nested, synchronous call to the target's source while the
//! proposer's action is still executing.
//!
//! Repeated failures are contained: after `max_consecutive_errors` failures
//! in a row from the same player in the same turn, the manager forces the
//! turn to end (or, mid-discard, discards for them) and moves on.

use crate::actions::{Action, ActionKind, GameEvent, TradeOffer};
use crate::board::PlayerId;
use crate::engine::Engine;
use crate::error::{EngineError, ErrorKind};
use crate::observer::{GameObserver, Notification};
use crate::phase::TurnPhase;
use crate::players::{PlayerSource, Prompt};
use crate::rules::TradeNegotiator;
use crate::state::{ConfigError, GameConfig, GameState, MAX_CONSECUTIVE_ERRORS};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Expected {expected} player sources, got {got}")]
    SourceCount { expected: usize, got: usize },

    #[error("Game has not been started")]
    NotStarted,

    #[error("Game is paused")]
    Paused,

    #[error("Game is over")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    NotStarted,
    Running,
    Paused,
    Finished,
}

/// What one call to [`GameManager::play_step`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Executed { action: Action, ends_turn: bool },
    Rejected { player: PlayerId, kind: ErrorKind },
    /// The source produced nothing usable
    NoInput { player: PlayerId },
    /// A player ran out of attempts and their turn or discard was forced
    LockedOut { player: PlayerId },
}

/// One executed or rejected action, as kept in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub turn_number: u32,
    pub action: Action,
    pub events: Vec<GameEvent>,
    pub error: Option<ErrorKind>,
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub game_id: uuid::Uuid,
    pub winner: Option<PlayerId>,
    pub turns: u32,
    pub victory_points: Vec<u32>,
    pub actions: usize,
    pub failures: usize,
    pub lockouts: usize,
}

pub struct GameManager {
    engine: Engine,
    sources: Vec<Box<dyn PlayerSource>>,
    observers: Vec<Box<dyn GameObserver>>,
    max_consecutive_errors: u32,
    max_turns: Option<u32>,
    consecutive_errors: Vec<u32>,
    /// Turn the error counters belong to
    counted_turn: u32,
    status: RunStatus,
    history: Vec<HistoryEntry>,
    lockouts: usize,
}

impl GameManager {
    /// New game from a config, one source per configured player in seat
    /// order
    pub fn new(
        config: &GameConfig,
        sources: Vec<Box<dyn PlayerSource>>,
    ) -> Result<Self, ManagerError> {
        let engine = Engine::new(config)?;
        let mut manager = Self::with_engine(engine, sources)?;
        manager.max_consecutive_errors = config.max_consecutive_errors;
        manager.max_turns = config.max_turns;
        Ok(manager)
    }

    /// Drive an already-built engine, e.g. one with loaded dice
    pub fn with_engine(
        engine: Engine,
        sources: Vec<Box<dyn PlayerSource>>,
    ) -> Result<Self, ManagerError> {
        let expected = engine.state().player_count();
        if sources.len() != expected {
            return Err(ManagerError::SourceCount {
                expected,
                got: sources.len(),
            });
        }
        Ok(Self {
            counted_turn: engine.state().turn_number,
            engine,
            consecutive_errors: vec![0; expected],
            sources,
            observers: Vec::new(),
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            max_turns: None,
            status: RunStatus::NotStarted,
            history: Vec::new(),
            lockouts: 0,
        })
    }

    pub fn with_max_turns(mut self, max_turns: Option<u32>) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = limit.max(1);
        self
    }

    pub fn add_observer(&mut self, observer: impl GameObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &GameState {
        self.engine.state()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Current failure streak for a player
    pub fn consecutive_errors(&self, player: PlayerId) -> u32 {
        self.consecutive_errors
            .get(player as usize)
            .copied()
            .unwrap_or(0)
    }

    // ==================== Lifecycle ====================

    pub fn start(&mut self) -> Result<(), ManagerError> {
        match self.status {
            RunStatus::NotStarted => {}
            RunStatus::Finished => return Err(ManagerError::Finished),
            RunStatus::Running | RunStatus::Paused => return Ok(()),
        }
        self.status = RunStatus::Running;
        let state = self.engine.state();
        info!(game_id = %state.game_id, players = state.player_count(), "starting game");
        let notification = Notification::GameStarted {
            game_id: state.game_id,
            players: state.players.iter().map(|p| p.name.clone()).collect(),
        };
        self.broadcast(&notification);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            info!(turn = self.state().turn_number, "game paused");
            self.status = RunStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == RunStatus::Paused {
            info!(turn = self.state().turn_number, "game resumed");
            self.status = RunStatus::Running;
        }
    }

    /// Stop the game now, without a winner unless one was already decided
    pub fn end_game(&mut self) {
        if self.status == RunStatus::Finished {
            return;
        }
        self.engine.end_game();
        self.finish();
    }

    fn finish(&mut self) {
        self.status = RunStatus::Finished;
        let state = self.engine.state();
        let notification = Notification::GameOver {
            winner: state.winner(),
            turn_number: state.turn_number,
        };
        match state.winner() {
            Some(winner) => info!(
                winner,
                name = %state.players[winner as usize].name,
                turn = state.turn_number,
                "game finished"
            ),
            None => info!(turn = state.turn_number, "game finished without a winner"),
        }
        self.broadcast(&notification);
    }

    /// Play until someone wins, the turn limit is hit, or the game is paused
    pub fn run(&mut self) -> Result<GameSummary, ManagerError> {
        if self.status == RunStatus::NotStarted {
            self.start()?;
        }
        while self.status == RunStatus::Running {
            if let Some(limit) = self.max_turns {
                if self.state().turn_number >= limit {
                    info!(limit, "turn limit reached");
                    self.end_game();
                    break;
                }
            }
            self.play_step()?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> GameSummary {
        let state = self.engine.state();
        GameSummary {
            game_id: state.game_id,
            winner: state.winner(),
            turns: state.turn_number,
            victory_points: state.players.iter().map(|p| p.victory_points()).collect(),
            actions: self.history.len(),
            failures: self.history.iter().filter(|h| h.error.is_some()).count(),
            lockouts: self.lockouts,
        }
    }

    // ==================== Turn loop ====================

    /// Solicit and execute exactly one action
    pub fn play_step(&mut self) -> Result<StepOutcome, ManagerError> {
        match self.status {
            RunStatus::NotStarted => return Err(ManagerError::NotStarted),
            RunStatus::Paused => return Err(ManagerError::Paused),
            RunStatus::Finished => return Err(ManagerError::Finished),
            RunStatus::Running => {}
        }
        if self.engine.state().is_over() {
            self.finish();
            return Err(ManagerError::Finished);
        }
        self.sync_error_counters();

        let prompt = Prompt::for_turn(&self.engine);
        let player = prompt.player;
        let Some(source) = self.sources.get_mut(player as usize) else {
            return Err(ManagerError::SourceCount {
                expected: player as usize + 1,
                got: self.sources.len(),
            });
        };

        let action = match source.request_action(self.engine.state(), &prompt) {
            Ok(action) => action,
            Err(err) => {
                debug!(player, "no action: {err}");
                source.notify(&Notification::InputFailed {
                    player,
                    message: err.to_string(),
                });
                return Ok(self
                    .record_failure(player)
                    .unwrap_or(StepOutcome::NoInput { player }));
            }
        };

        let turn_number = self.engine.state().turn_number;
        let mut negotiator = SourceNegotiator {
            sources: &mut self.sources,
        };
        let result = self.engine.execute(&action, &mut negotiator);
        for observer in &mut self.observers {
            observer.on_action(&action, &result);
        }
        self.history.push(HistoryEntry {
            turn_number,
            action: action.clone(),
            events: result
                .as_ref()
                .map(|s| s.events.clone())
                .unwrap_or_default(),
            error: result.as_ref().err().map(EngineError::kind),
        });

        let outcome = match result {
            Ok(success) => {
                self.reset_errors(player);
                self.announce(&action, &success.events, &success.affected_players);
                StepOutcome::Executed {
                    action,
                    ends_turn: success.ends_turn,
                }
            }
            Err(err) => self.reject(player, &err),
        };

        if self.engine.state().is_over() {
            self.finish();
        }
        Ok(outcome)
    }

    fn reject(&mut self, player: PlayerId, err: &EngineError) -> StepOutcome {
        let kind = err.kind();
        if kind == ErrorKind::ExecutionError {
            error!(player, "execution fault: {err}");
            self.broadcast(&Notification::ExecutionFault {
                player,
                message: err.to_string(),
            });
        }
        if let Some(source) = self.sources.get_mut(player as usize) {
            source.notify(&Notification::ActionRejected {
                player,
                kind,
                message: err.to_string(),
            });
        }
        self.record_failure(player)
            .unwrap_or(StepOutcome::Rejected { player, kind })
    }

    /// Count a failure; returns the lockout outcome if this one hit the limit
    fn record_failure(&mut self, player: PlayerId) -> Option<StepOutcome> {
        let count = self.consecutive_errors.get_mut(player as usize)?;
        *count += 1;
        let failures = *count;
        if failures < self.max_consecutive_errors {
            return None;
        }

        warn!(
            player,
            failures,
            turn = self.engine.state().turn_number,
            "too many failed actions, forcing the turn on"
        );
        let forced = if self.engine.state().turn_phase == TurnPhase::DiscardPhase {
            self.engine.force_discard()
        } else {
            self.engine.force_end_turn()
        };
        self.reset_errors(player);
        self.lockouts += 1;

        match forced {
            Ok(success) => {
                let events = success.events;
                self.broadcast(&Notification::PlayerLockedOut { player, failures });
                self.announce_forced(player, &events, &success.affected_players);
            }
            Err(err) => error!(player, "could not force the turn on: {err}"),
        }
        Some(StepOutcome::LockedOut { player })
    }

    fn reset_errors(&mut self, player: PlayerId) {
        if let Some(count) = self.consecutive_errors.get_mut(player as usize) {
            *count = 0;
        }
    }

    /// Counters only span one turn
    fn sync_error_counters(&mut self) {
        let turn = self.engine.state().turn_number;
        if turn != self.counted_turn {
            self.counted_turn = turn;
            self.consecutive_errors.iter_mut().for_each(|c| *c = 0);
        }
    }

    // ==================== Notifications ====================

    /// Tell each player what happened, with private details only for the
    /// player they belong to
    fn announce(&mut self, action: &Action, events: &[GameEvent], affected: &[PlayerId]) {
        for (seat, source) in self.sources.iter_mut().enumerate() {
            source.notify(&Notification::ActionExecuted {
                action: action.clone(),
                events: events
                    .iter()
                    .map(|e| e.redacted_for(Some(seat as PlayerId)))
                    .collect(),
                affected_players: affected.to_vec(),
            });
        }
        let public = Notification::ActionExecuted {
            action: action.clone(),
            events: events.iter().map(|e| e.redacted_for(None)).collect(),
            affected_players: affected.to_vec(),
        };
        for observer in &mut self.observers {
            observer.on_notification(&public);
        }
    }

    fn announce_forced(&mut self, player: PlayerId, events: &[GameEvent], affected: &[PlayerId]) {
        let action = Action::new(player, ActionKind::EndTurn);
        self.announce(&action, events, affected);
    }

    fn broadcast(&mut self, notification: &Notification) {
        for source in &mut self.sources {
            source.notify(notification);
        }
        for observer in &mut self.observers {
            observer.on_notification(notification);
        }
    }
}

/// Asks the target's own source to answer a trade
struct SourceNegotiator<'a> {
    sources: &'a mut [Box<dyn PlayerSource>],
}

impl TradeNegotiator for SourceNegotiator<'_> {
    fn solicit(&mut self, proposer: PlayerId, offer: &TradeOffer, state: &GameState) -> Option<Action> {
        let source = self.sources.get_mut(offer.target as usize)?;
        let prompt = Prompt::for_trade(proposer, offer, state);
        match source.request_action(state, &prompt) {
            Ok(answer) => Some(answer),
            Err(err) => {
                debug!(target = offer.target, "no answer to trade: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventLog;
    use crate::players::{Bot, BotDifficulty, ScriptedPlayer};
    use crate::topology::PointRef;
    use pretty_assertions::assert_eq;

    fn scripted(names: &[&str], scripts: Vec<Vec<Action>>) -> Vec<Box<dyn PlayerSource>> {
        names
            .iter()
            .zip(scripts)
            .map(|(name, script)| Box::new(ScriptedPlayer::new(*name, script)) as Box<dyn PlayerSource>)
            .collect()
    }

    fn config() -> GameConfig {
        GameConfig::with_players(["A", "B"]).with_seed(9)
    }

    #[test]
    fn test_source_count_must_match() {
        let err = GameManager::new(&config(), scripted(&["A"], vec![vec![]])).err();
        assert!(matches!(
            err,
            Some(ManagerError::SourceCount {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_step_requires_start() {
        let mut manager =
            GameManager::new(&config(), scripted(&["A", "B"], vec![vec![], vec![]])).unwrap();
        assert!(matches!(manager.play_step(), Err(ManagerError::NotStarted)));

        manager.start().unwrap();
        manager.pause();
        assert!(!manager.is_running());
        assert!(matches!(manager.play_step(), Err(ManagerError::Paused)));
        manager.resume();
        assert!(manager.is_running());
    }

    #[test]
    fn test_three_failures_force_the_turn() {
        let bad = Action::new(
            0,
            ActionKind::BuildSettlement {
                point: PointRef(999),
            },
        );
        let mut manager = GameManager::new(
            &config(),
            scripted(&["A", "B"], vec![vec![bad.clone(), bad.clone(), bad], vec![]]),
        )
        .unwrap();
        let log = EventLog::new();
        manager.add_observer(log.clone());
        manager.start().unwrap();

        for expected in [1, 2] {
            let outcome = manager.play_step().unwrap();
            assert!(matches!(outcome, StepOutcome::Rejected { player: 0, .. }));
            assert_eq!(manager.consecutive_errors(0), expected);
        }
        assert_eq!(
            manager.play_step().unwrap(),
            StepOutcome::LockedOut { player: 0 }
        );
        assert_eq!(manager.consecutive_errors(0), 0);
        assert_eq!(manager.state().current_player, 1);
        assert_eq!(manager.state().turn_number, 1);
        assert!(log
            .notifications()
            .contains(&Notification::PlayerLockedOut {
                player: 0,
                failures: 3
            }));
        assert_eq!(log.failures(), 3);
    }

    #[test]
    fn test_success_resets_the_counter() {
        let bad = Action::new(0, ActionKind::RollDice);
        let good = Action::new(
            0,
            ActionKind::BuildSettlement {
                point: PointRef(1),
            },
        );
        let mut manager = GameManager::new(
            &config(),
            scripted(&["A", "B"], vec![vec![bad.clone(), bad.clone(), good, bad], vec![]]),
        )
        .unwrap();
        manager.start().unwrap();

        manager.play_step().unwrap();
        manager.play_step().unwrap();
        assert_eq!(manager.consecutive_errors(0), 2);
        assert!(matches!(
            manager.play_step().unwrap(),
            StepOutcome::Executed { .. }
        ));
        assert_eq!(manager.consecutive_errors(0), 0);
        manager.play_step().unwrap();
        assert_eq!(manager.consecutive_errors(0), 1);
    }

    #[test]
    fn test_trade_answer_comes_from_target_source() {
        let mut state = Engine::new(&config()).unwrap().into_state();
        state.game_phase = crate::phase::GamePhase::NormalPlay;
        state.turn_phase = TurnPhase::PlayerActions;
        state.turn_number = 4;
        state.players[0].resources = crate::player::ResourceHand::with_amounts(1, 0, 0, 0, 0);
        state.players[1].resources = crate::player::ResourceHand::with_amounts(0, 0, 0, 0, 4);
        let engine = Engine::from_state(state, 1);

        let proposal = Action::new(
            0,
            ActionKind::ProposeTrade(TradeOffer {
                target: 1,
                offer: crate::player::ResourceHand::with_amounts(1, 0, 0, 0, 0),
                request: crate::player::ResourceHand::with_amounts(0, 0, 0, 0, 2),
            }),
        );
        let proposer = ScriptedPlayer::new("A", [proposal]);
        let target = ScriptedPlayer::new("B", [Action::new(1, ActionKind::AcceptTrade)]);
        let target_prompts = target.prompts();
        let inbox = proposer.inbox();

        let mut manager =
            GameManager::with_engine(engine, vec![Box::new(proposer), Box::new(target)]).unwrap();
        manager.start().unwrap();
        let outcome = manager.play_step().unwrap();
        assert!(matches!(outcome, StepOutcome::Executed { .. }));
        assert_eq!(manager.state().players[0].resources.wool, 2);
        assert_eq!(manager.state().players[1].resources.brick, 1);

        let prompts = target_prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].trade.is_some());
        assert!(inbox
            .borrow()
            .iter()
            .any(|n| matches!(n, Notification::ActionExecuted { .. })));
    }

    #[test]
    fn test_bots_finish_a_game() {
        let config = GameConfig {
            max_turns: Some(600),
            ..GameConfig::with_players(["A", "B", "C"]).with_seed(21)
        };
        let sources: Vec<Box<dyn PlayerSource>> = (0..3)
            .map(|i| Box::new(Bot::with_seed(i, BotDifficulty::Medium, 100 + i as u64)) as Box<dyn PlayerSource>)
            .collect();
        let mut manager = GameManager::new(&config, sources).unwrap();
        let summary = manager.run().unwrap();

        assert_eq!(manager.status(), RunStatus::Finished);
        assert!(summary.turns >= 6);
        if let Some(winner) = summary.winner {
            assert!(summary.victory_points[winner as usize] >= 10);
        }
        assert!(manager.state().cards_in_hands() <= crate::state::TOTAL_RESOURCE_CARDS);
    }
}

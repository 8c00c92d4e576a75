//! The rules engine: validates actions and applies them to the game state.
//!
//! Every call to [`Engine::execute`] returns exactly one [`ActionResult`].
//! Handlers check everything first and only then touch the state, so a
//! failed action leaves the snapshot exactly as it was.
//!
//! The per-action handlers live in [`crate::rules`]; this module owns the
//! dispatch, turn advancement, bonus-card bookkeeping and win detection.

use crate::actions::{Action, ActionKind, ActionType, GameEvent};
use crate::board::PlayerId;
use crate::dice::{DiceRoller, SeededDice};
use crate::error::EngineError;
use crate::phase::{self, GamePhase, SetupProgress, TurnPhase};
use crate::rules::{DeclineTrades, Outcome, TradeNegotiator};
use crate::state::{ConfigError, GameConfig, GameState};
use crate::topology::{StandardTopology, TileRef, Topology};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

/// Minimum road length for the Longest Road bonus
pub const MIN_LONGEST_ROAD: u32 = 5;
/// Minimum knights played for the Largest Army bonus
pub const MIN_LARGEST_ARMY: u32 = 3;

/// What a successful action produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSuccess {
    /// State right after the action
    pub state: GameState,
    pub affected_players: Vec<PlayerId>,
    pub events: Vec<GameEvent>,
    /// The action passed the turn to the next player
    pub ends_turn: bool,
}

pub type ActionResult = Result<ActionSuccess, EngineError>;

/// Validator/executor for one game
pub struct Engine {
    pub(crate) state: GameState,
    pub(crate) topology: Box<dyn Topology>,
    pub(crate) dice: Box<dyn DiceRoller>,
    pub(crate) rng: StdRng,
}

impl Engine {
    /// New game on the standard board. A seed makes the whole game repeatable.
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = GameState::new(config, &mut rng)?;
        let dice = SeededDice::new(rng.gen());
        Ok(Self {
            state,
            topology: Box::new(StandardTopology::new()),
            dice: Box::new(dice),
            rng,
        })
    }

    /// Resume from an existing state, e.g. a prepared test position
    pub fn from_state(state: GameState, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dice = SeededDice::new(rng.gen());
        Self {
            state,
            topology: Box::new(StandardTopology::new()),
            dice: Box::new(dice),
            rng,
        }
    }

    pub fn with_dice(mut self, dice: impl DiceRoller + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub fn with_topology(mut self, topology: impl Topology + 'static) -> Self {
        self.topology = Box::new(topology);
        self
    }

    /// Read-only view of the current state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn topology(&self) -> &dyn Topology {
        self.topology.as_ref()
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Action kinds the active player may attempt now
    pub fn legal_actions(&self) -> Vec<ActionType> {
        phase::legal_action_types(&self.state)
    }

    /// Execute an action with no counterparty for player trades; every
    /// proposal is declined.
    pub fn apply(&mut self, action: &Action) -> ActionResult {
        self.execute(action, &mut DeclineTrades)
    }

    /// Validate and execute one action.
    ///
    /// `negotiator` is asked synchronously for the target's answer when the
    /// action is a player trade proposal.
    pub fn execute(
        &mut self,
        action: &Action,
        negotiator: &mut dyn TradeNegotiator,
    ) -> ActionResult {
        let result = self.dispatch(action, negotiator);
        match &result {
            Ok(success) => debug!(
                action = %action,
                events = success.events.len(),
                "action executed"
            ),
            Err(err) => debug!(action = %action, kind = %err.kind(), error = %err, "action rejected"),
        }
        result
    }

    fn dispatch(&mut self, action: &Action, negotiator: &mut dyn TradeNegotiator) -> ActionResult {
        self.check_preconditions(action)?;

        let actor = action.player;
        let mut outcome = match &action.kind {
            // ==================== Turn Management ====================
            ActionKind::RollDice => self.roll_dice(actor)?,
            ActionKind::EndTurn => self.end_turn(actor)?,

            // ==================== Building ====================
            ActionKind::BuildSettlement { point } => self.build_settlement(actor, *point)?,
            ActionKind::BuildCity { point } => self.build_city(actor, *point)?,
            ActionKind::BuildRoad { road } => self.build_road(actor, *road)?,

            // ==================== Trading ====================
            ActionKind::BankTrade { offer, request } => self.bank_trade(actor, offer, request)?,
            ActionKind::ProposeTrade(offer) => self.propose_trade(actor, offer, negotiator)?,
            ActionKind::AcceptTrade | ActionKind::RejectTrade => {
                return Err(EngineError::Internal(
                    "trade response passed precondition checks".into(),
                ))
            }

            // ==================== Development Cards ====================
            ActionKind::BuyDevCard => self.buy_dev_card(actor)?,
            ActionKind::PlayDevCard(play) => self.play_dev_card(actor, play)?,

            // ==================== Robber ====================
            ActionKind::DiscardCards { cards } => self.discard(actor, cards)?,
            ActionKind::MoveRobber { tile } => self.move_robber(actor, *tile)?,
            ActionKind::StealCard { victim } => self.steal(actor, *victim)?,
        };

        outcome.affected.insert(actor);
        self.check_win_condition(actor, &mut outcome);
        Ok(self.success(outcome))
    }

    fn check_preconditions(&self, action: &Action) -> Result<(), EngineError> {
        if self.state.is_over() {
            return Err(EngineError::GameOver);
        }
        self.state.player(action.player)?;

        let action_type = action.action_type();
        if matches!(action_type, ActionType::AcceptTrade | ActionType::RejectTrade) {
            return Err(EngineError::InvalidPhase {
                action: action_type,
                context: "outside a trade negotiation",
            });
        }

        let expected = self.state.active_player();
        if action.player != expected {
            return Err(EngineError::NotYourTurn { expected });
        }

        if !self.legal_actions().contains(&action_type) {
            return Err(EngineError::InvalidPhase {
                action: action_type,
                context: self.phase_context(),
            });
        }
        Ok(())
    }

    fn phase_context(&self) -> &'static str {
        match (self.state.game_phase, self.state.turn_phase) {
            (GamePhase::SetupFirstRound | GamePhase::SetupSecondRound, _) => {
                if self.state.setup_progress.settlement.is_none() {
                    "before placing this turn's starting settlement"
                } else {
                    "after this turn's starting settlement"
                }
            }
            (GamePhase::Ended { .. }, _) => "after the game has ended",
            (GamePhase::NormalPlay, TurnPhase::RollDice) => "before rolling",
            (GamePhase::NormalPlay, TurnPhase::DiscardPhase) => "while discards are pending",
            (GamePhase::NormalPlay, TurnPhase::RobberMove) => "until the robber is moved",
            (GamePhase::NormalPlay, TurnPhase::RobberSteal) => "until a victim is chosen",
            (GamePhase::NormalPlay, TurnPhase::PlayerActions) => "after rolling",
        }
    }

    fn success(&self, outcome: Outcome) -> ActionSuccess {
        ActionSuccess {
            state: self.state.clone(),
            affected_players: outcome.affected.into_iter().collect(),
            events: outcome.events,
            ends_turn: outcome.ends_turn,
        }
    }

    // ==================== Turn Advancement ====================

    fn end_turn(&mut self, actor: PlayerId) -> Result<Outcome, EngineError> {
        let mut outcome = Outcome::default();
        outcome.events.push(self.advance_turn(actor));
        outcome.ends_turn = true;
        Ok(outcome)
    }

    /// Pass the turn: snake order during setup, then round-robin.
    ///
    /// Clears every per-turn flag and the cached roll.
    pub(crate) fn advance_turn(&mut self, ending: PlayerId) -> GameEvent {
        if let Ok(player) = self.state.player_mut(ending) {
            player.end_turn();
        }

        let n = self.state.player_count();
        let state = &mut self.state;
        state.setup_progress = SetupProgress::default();
        state.dice_roll = None;
        state.turn_phase = TurnPhase::RollDice;
        state.players_must_discard.clear();
        state.robber_moved = false;
        state.steal_pending = false;
        state.steal_candidates.clear();
        state.dev_card_played_this_turn = false;
        state.turn_number += 1;

        let turn = state.turn_number;
        match state.game_phase {
            GamePhase::SetupFirstRound => {
                if turn as usize >= n {
                    state.game_phase = GamePhase::SetupSecondRound;
                    info!("first setup round complete");
                }
                state.current_player = phase::setup_player_for_turn(turn, n);
            }
            GamePhase::SetupSecondRound => {
                if turn as usize >= 2 * n {
                    state.game_phase = GamePhase::NormalPlay;
                    state.current_player = 0;
                    info!("setup complete, starting normal play");
                } else {
                    state.current_player = phase::setup_player_for_turn(turn, n);
                }
            }
            GamePhase::NormalPlay => {
                state.current_player = ((state.current_player as usize + 1) % n) as PlayerId;
            }
            GamePhase::Ended { .. } => {}
        }

        debug!(turn, player = state.current_player, "turn started");
        GameEvent::TurnEnded {
            player: ending,
            next_player: state.current_player,
        }
    }

    /// End the current turn regardless of phase.
    ///
    /// Used when a player keeps failing; any discards still owed are taken
    /// at random first so the penalty of a 7 still applies.
    pub fn force_end_turn(&mut self) -> ActionResult {
        if self.state.is_over() {
            return Err(EngineError::GameOver);
        }
        let mut outcome = Outcome::default();
        while self.state.turn_phase == TurnPhase::DiscardPhase {
            let forced = self.force_discard()?;
            outcome.events.extend(forced.events);
            outcome.affected.extend(forced.affected_players);
        }
        let ending = self.state.current_player;
        outcome.events.push(self.advance_turn(ending));
        outcome.affected.insert(ending);
        outcome.ends_turn = true;
        Ok(self.success(outcome))
    }

    /// Discard for the active discarder at random.
    pub fn force_discard(&mut self) -> ActionResult {
        if self.state.turn_phase != TurnPhase::DiscardPhase {
            return Err(EngineError::InvalidPhase {
                action: ActionType::DiscardCards,
                context: self.phase_context(),
            });
        }
        let player = self.state.active_player();
        let required = self
            .state
            .players_must_discard
            .get(&player)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("player {player} owes no discard")))?;

        let cards = self
            .state
            .players
            .get_mut(player as usize)
            .ok_or(EngineError::UnknownPlayer(player))?
            .resources
            .discard_random(required, &mut self.rng);

        let outcome = self.finish_discard(player, cards);
        Ok(self.success(outcome))
    }

    // ==================== Bonus Cards ====================

    /// Recompute every road length and move Longest Road if needed.
    ///
    /// A unique longest road of at least [`MIN_LONGEST_ROAD`] takes the
    /// bonus; the holder keeps it on a tie.
    pub(crate) fn update_longest_road(&mut self, outcome: &mut Outcome) {
        let mut best = 0;
        let mut leaders: Vec<PlayerId> = Vec::new();
        for player in &mut self.state.players {
            let length = self.state.board.longest_road(player.id);
            player.longest_road_length = length;
            if length >= MIN_LONGEST_ROAD {
                if length > best {
                    best = length;
                    leaders = vec![player.id];
                } else if length == best {
                    leaders.push(player.id);
                }
            }
        }

        let holder = self
            .state
            .players
            .iter()
            .find(|p| p.has_longest_road)
            .map(|p| p.id);

        let new_holder = match (leaders.as_slice(), holder) {
            ([only], _) => Some(*only),
            (_, Some(h)) if leaders.contains(&h) => Some(h),
            _ => None,
        };

        if new_holder != holder {
            for player in &mut self.state.players {
                player.has_longest_road = Some(player.id) == new_holder;
            }
            outcome.affected.extend(holder);
            outcome.affected.extend(new_holder);
            outcome.events.push(GameEvent::LongestRoadChanged {
                previous: holder,
                current: new_holder,
                length: best,
            });
        }
    }

    /// Move Largest Army to whoever now has strictly more knights than
    /// everyone else, with at least [`MIN_LARGEST_ARMY`].
    pub(crate) fn update_largest_army(&mut self, outcome: &mut Outcome) {
        let holder = self
            .state
            .players
            .iter()
            .find(|p| p.has_largest_army)
            .map(|p| p.id);

        let contender = self.state.players.iter().find(|p| {
            p.played_knights >= MIN_LARGEST_ARMY
                && self
                    .state
                    .players
                    .iter()
                    .all(|other| other.id == p.id || other.played_knights < p.played_knights)
        });

        let Some(contender) = contender else {
            return;
        };
        if Some(contender.id) == holder {
            return;
        }

        let (new_holder, knights) = (contender.id, contender.played_knights);
        for player in &mut self.state.players {
            player.has_largest_army = player.id == new_holder;
        }
        outcome.affected.extend(holder);
        outcome.affected.insert(new_holder);
        outcome.events.push(GameEvent::LargestArmyChanged {
            previous: holder,
            current: Some(new_holder),
            knights,
        });
    }

    // ==================== Win Detection ====================

    /// End the game if anyone has reached the target, checking the acting
    /// player before the others.
    fn check_win_condition(&mut self, actor: PlayerId, outcome: &mut Outcome) {
        let target = self.state.victory_points_to_win;
        let order = std::iter::once(actor).chain(
            (0..self.state.player_count() as PlayerId).filter(|&id| id != actor),
        );
        let winner = order
            .map(|id| (id, self.state.victory_points(id)))
            .find(|&(_, vp)| vp >= target);

        if let Some((player, victory_points)) = winner {
            self.state.game_phase = GamePhase::Ended {
                winner: Some(player),
            };
            info!(player, victory_points, turn = self.state.turn_number, "game won");
            outcome.events.push(GameEvent::GameWon {
                player,
                victory_points,
            });
        }
    }

    /// Stop the game without a winner
    pub fn end_game(&mut self) {
        if !self.state.is_over() {
            self.state.game_phase = GamePhase::Ended { winner: None };
            info!(turn = self.state.turn_number, "game ended without a winner");
        }
    }

    /// Players other than `actor` owning a building on `tile` and holding
    /// at least one card, in ascending id order
    pub fn eligible_victims(&self, tile: TileRef, actor: PlayerId) -> Vec<PlayerId> {
        self.state
            .board
            .players_adjacent_to_tile(tile, self.topology.as_ref())
            .into_iter()
            .filter(|&id| id != actor)
            .filter(|&id| {
                self.state
                    .players
                    .get(id as usize)
                    .is_some_and(|p| p.resources.total() > 0)
            })
            .collect()
    }
}

//! Player sources: where the manager gets each action from.
//!
//! A [`PlayerSource`] is asked synchronously for one action at a time. It
//! may be a bot, a scripted test double or anything a host wires up (a
//! terminal, a remote client, a model call). Two bot strengths are
//! provided:
//! - Easy: a random action among the plausible ones
//! - Medium: simple heuristics (good spots first, rob the leader, keep a
//!   balanced hand)

use crate::actions::{Action, ActionKind, ActionType, DevCardPlay, TradeOffer};
use crate::board::{PlayerId, Resource};
use crate::engine::Engine;
use crate::observer::Notification;
use crate::phase;
use crate::player::{DevelopmentCard, ResourceHand};
use crate::state::GameState;
use crate::topology::{PointRef, RoadSpan, StandardTopology, TileRef, Topology};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Player {0} has no action to offer")]
    NoAction(PlayerId),

    #[error("Script for {0} has run out")]
    Exhausted(String),

    #[error("Could not read an action: {0}")]
    Invalid(String),
}

/// Concrete targets the active player can pick from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOptions {
    pub settlement_points: Vec<PointRef>,
    pub city_points: Vec<PointRef>,
    pub road_spans: Vec<RoadSpan>,
    pub robber_tiles: Vec<TileRef>,
    pub steal_victims: Vec<PlayerId>,
    /// Cards owed while discarding
    pub discard_count: u32,
    /// Bank trade rate per resource given away
    pub trade_rates: Vec<(Resource, u32)>,
}

/// A trade the prompted player is being asked to answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub proposer: PlayerId,
    pub offer: TradeOffer,
}

/// One solicitation: who is asked, what they may do, and what to show them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub player: PlayerId,
    pub message: String,
    pub allowed: Vec<ActionType>,
    pub options: PromptOptions,
    pub trade: Option<TradeRequest>,
}

impl Prompt {
    /// Prompt for whoever the engine is waiting on
    pub fn for_turn(engine: &Engine) -> Self {
        let state = engine.state();
        let player = state.active_player();
        let allowed = engine.legal_actions();

        let mut options = PromptOptions::default();
        if allowed.contains(&ActionType::BuildSettlement) {
            options.settlement_points = engine.legal_settlement_points(player);
        }
        if allowed.contains(&ActionType::BuildCity) {
            options.city_points = engine.legal_city_points(player);
        }
        if allowed.contains(&ActionType::BuildRoad) || allowed.contains(&ActionType::PlayDevCard) {
            options.road_spans = engine.legal_road_spans(player);
        }
        if allowed.contains(&ActionType::MoveRobber) || allowed.contains(&ActionType::PlayDevCard) {
            options.robber_tiles = engine.legal_robber_tiles();
        }
        if allowed.contains(&ActionType::StealCard) {
            options.steal_victims = state.steal_candidates.clone();
        }
        if allowed.contains(&ActionType::DiscardCards) {
            options.discard_count = state
                .players_must_discard
                .get(&player)
                .copied()
                .unwrap_or_default();
        }
        if allowed.contains(&ActionType::BankTrade) {
            options.trade_rates = Resource::ALL
                .iter()
                .map(|&r| (r, engine.maritime_rate(player, r)))
                .collect();
        }

        Self {
            player,
            message: phase::prompt_message(state),
            allowed,
            options,
            trade: None,
        }
    }

    /// Prompt asking the target of `offer` to accept or reject it
    pub fn for_trade(proposer: PlayerId, offer: &TradeOffer, state: &GameState) -> Self {
        let name = state
            .players
            .get(proposer as usize)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        Self {
            player: offer.target,
            message: format!(
                "{name} offers {} for your {}. Accept or reject?",
                offer.offer, offer.request
            ),
            allowed: vec![ActionType::AcceptTrade, ActionType::RejectTrade],
            options: PromptOptions::default(),
            trade: Some(TradeRequest {
                proposer,
                offer: offer.clone(),
            }),
        }
    }

    pub fn allows(&self, action_type: ActionType) -> bool {
        self.allowed.contains(&action_type)
    }
}

/// Supplies actions for one seat at the table
pub trait PlayerSource {
    fn name(&self) -> &str;

    /// Block until the player picks an action for `prompt`
    fn request_action(&mut self, state: &GameState, prompt: &Prompt) -> Result<Action, InputError>;

    /// Delivery of results and events meant for this player
    fn notify(&mut self, _notification: &Notification) {}
}

// ==================== Bots ====================

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
}

impl std::str::FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            other => Err(format!("unknown bot difficulty '{other}'")),
        }
    }
}

/// A computer player
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    name: String,
    topology: Box<dyn Topology>,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self::build(player_id, difficulty, StdRng::from_entropy())
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self::build(player_id, difficulty, StdRng::seed_from_u64(seed))
    }

    fn build(player_id: PlayerId, difficulty: BotDifficulty, rng: StdRng) -> Self {
        Self {
            player_id,
            difficulty,
            name: format!("{difficulty:?} bot {player_id}"),
            topology: Box::new(StandardTopology::new()),
            rng,
        }
    }

    /// Board geometry used to score spots; must match the engine's
    pub fn with_topology(mut self, topology: impl Topology + 'static) -> Self {
        self.topology = Box::new(topology);
        self
    }

    /// Pick an action for the prompt, or `None` if nothing fits
    pub fn choose_action(&mut self, state: &GameState, prompt: &Prompt) -> Option<Action> {
        if let Some(request) = &prompt.trade {
            return Some(self.answer_trade(state, request));
        }
        let candidates = self.candidates(state, prompt);
        match self.difficulty {
            BotDifficulty::Easy => candidates.choose(&mut self.rng).cloned(),
            BotDifficulty::Medium => self.choose_medium(state, prompt, &candidates),
        }
    }

    fn action(&self, kind: ActionKind) -> Action {
        Action::new(self.player_id, kind)
    }

    /// Every action the bot considers plausible right now
    fn candidates(&self, state: &GameState, prompt: &Prompt) -> Vec<Action> {
        let Some(me) = state.players.get(self.player_id as usize) else {
            return Vec::new();
        };
        let setup = state.game_phase.is_setup();
        let options = &prompt.options;
        let mut actions = Vec::new();

        for &action_type in &prompt.allowed {
            match action_type {
                ActionType::RollDice => actions.push(self.action(ActionKind::RollDice)),
                ActionType::EndTurn => actions.push(self.action(ActionKind::EndTurn)),
                ActionType::BuildSettlement if setup || me.can_afford_settlement() => {
                    actions.extend(
                        options
                            .settlement_points
                            .iter()
                            .map(|&point| self.action(ActionKind::BuildSettlement { point })),
                    );
                }
                ActionType::BuildCity if me.can_afford_city() => {
                    actions.extend(
                        options
                            .city_points
                            .iter()
                            .map(|&point| self.action(ActionKind::BuildCity { point })),
                    );
                }
                ActionType::BuildRoad if setup || me.can_afford_road() => {
                    actions.extend(
                        options
                            .road_spans
                            .iter()
                            .map(|&road| self.action(ActionKind::BuildRoad { road })),
                    );
                }
                ActionType::BankTrade => {
                    let want = least_held(&me.resources, None);
                    for &(give, rate) in &options.trade_rates {
                        if give != want && me.resources.get(give) >= rate {
                            actions.push(self.action(ActionKind::BankTrade {
                                offer: ResourceHand::single(give, rate),
                                request: ResourceHand::single(want, 1),
                            }));
                        }
                    }
                }
                ActionType::BuyDevCard
                    if me.can_afford_dev_card() && state.bank.development_cards_left() > 0 =>
                {
                    actions.push(self.action(ActionKind::BuyDevCard));
                }
                ActionType::PlayDevCard if !state.dev_card_played_this_turn => {
                    actions.extend(self.card_plays(state, prompt));
                }
                ActionType::DiscardCards => {
                    actions.push(self.action(ActionKind::DiscardCards {
                        cards: bot_discard(&me.resources, options.discard_count),
                    }));
                }
                ActionType::MoveRobber => {
                    actions.extend(
                        options
                            .robber_tiles
                            .iter()
                            .map(|&tile| self.action(ActionKind::MoveRobber { tile })),
                    );
                }
                ActionType::StealCard => {
                    actions.extend(
                        options
                            .steal_victims
                            .iter()
                            .map(|&victim| self.action(ActionKind::StealCard { victim })),
                    );
                }
                // Bots answer trades but never start them
                _ => {}
            }
        }
        actions
    }

    fn card_plays(&self, state: &GameState, prompt: &Prompt) -> Vec<Action> {
        let Some(me) = state.players.get(self.player_id as usize) else {
            return Vec::new();
        };
        let options = &prompt.options;
        let mut plays = Vec::new();

        if me.has_playable_dev_card(DevelopmentCard::Knight) {
            plays.extend(options.robber_tiles.iter().map(|&tile| DevCardPlay::Knight {
                tile,
                victim: None,
            }));
        }
        // Only in the action phase; before rolling only knights make sense
        if state.turn_phase == crate::phase::TurnPhase::PlayerActions {
            if me.has_playable_dev_card(DevelopmentCard::RoadBuilding) && me.roads_remaining() >= 2 {
                if let [first, second, ..] = options.road_spans.as_slice() {
                    plays.push(DevCardPlay::RoadBuilding {
                        first: *first,
                        second: *second,
                    });
                }
            }
            if me.has_playable_dev_card(DevelopmentCard::Monopoly) {
                plays.push(DevCardPlay::Monopoly {
                    resource: least_held(&me.resources, None),
                });
            }
            if me.has_playable_dev_card(DevelopmentCard::YearOfPlenty) {
                let first = least_held(&me.resources, None);
                plays.push(DevCardPlay::YearOfPlenty {
                    first,
                    second: least_held(&me.resources, Some(first)),
                });
            }
        }

        plays
            .into_iter()
            .map(|play| self.action(ActionKind::PlayDevCard(play)))
            .collect()
    }

    /// Medium: Use basic heuristics
    fn choose_medium(
        &mut self,
        state: &GameState,
        prompt: &Prompt,
        candidates: &[Action],
    ) -> Option<Action> {
        if let Some(discard) = matching(candidates, |k| matches!(k, ActionKind::DiscardCards { .. })).first() {
            return Some((*discard).clone());
        }

        // Knight first if the robber sits on one of our tiles
        if prompt.allows(ActionType::RollDice) {
            let robbed = state
                .board
                .players_adjacent_to_tile(state.board.robber(), self.topology.as_ref())
                .contains(&self.player_id);
            if robbed {
                let knights = matching(candidates, |k| {
                    matches!(k, ActionKind::PlayDevCard(DevCardPlay::Knight { .. }))
                });
                if let Some(best) = self.best_by(state, &knights, Self::score_robber_action) {
                    return Some(best);
                }
            }
            return Some(self.action(ActionKind::RollDice));
        }

        let settlements = matching(candidates, |k| matches!(k, ActionKind::BuildSettlement { .. }));
        if let Some(best) = self.best_by(state, &settlements, Self::score_settlement_action) {
            return Some(best);
        }

        let robber = matching(candidates, |k| matches!(k, ActionKind::MoveRobber { .. }));
        if let Some(best) = self.best_by(state, &robber, Self::score_robber_action) {
            return Some(best);
        }

        let steals = matching(candidates, |k| matches!(k, ActionKind::StealCard { .. }));
        if let Some(best) = self.best_by(state, &steals, Self::score_steal_action) {
            return Some(best);
        }

        let roads = matching(candidates, |k| matches!(k, ActionKind::BuildRoad { .. }));
        if state.game_phase.is_setup() {
            return self.best_by(state, &roads, Self::score_road_action);
        }

        let cities = matching(candidates, |k| matches!(k, ActionKind::BuildCity { .. }));
        if let Some(best) = self.best_by(state, &cities, Self::score_city_action) {
            return Some(best);
        }

        // Build roads with 30% chance
        if !roads.is_empty() && self.rng.gen_bool(0.3) {
            return self.best_by(state, &roads, Self::score_road_action);
        }

        let plays = matching(candidates, |k| matches!(k, ActionKind::PlayDevCard(_)));
        if !plays.is_empty() && self.rng.gen_bool(0.5) {
            return plays.choose(&mut self.rng).map(|a| (*a).clone());
        }

        // Buy dev cards with 20% chance
        let buy = matching(candidates, |k| matches!(k, ActionKind::BuyDevCard));
        if !buy.is_empty() && self.rng.gen_bool(0.2) {
            return Some(self.action(ActionKind::BuyDevCard));
        }

        // Trade away a surplus only when holding plenty
        let me_total = state
            .players
            .get(self.player_id as usize)
            .map_or(0, |p| p.resources.total());
        let trades = matching(candidates, |k| matches!(k, ActionKind::BankTrade { .. }));
        if me_total > 5 {
            if let Some(trade) = trades.first() {
                return Some((*trade).clone());
            }
        }

        if prompt.allows(ActionType::EndTurn) {
            return Some(self.action(ActionKind::EndTurn));
        }

        // Fallback to random
        candidates.choose(&mut self.rng).cloned()
    }

    /// Highest scoring action, ties going to the earliest
    fn best_by(
        &self,
        state: &GameState,
        actions: &[&Action],
        score: fn(&Self, &GameState, &ActionKind) -> i32,
    ) -> Option<Action> {
        let mut best: Option<(&Action, i32)> = None;
        for action in actions {
            let s = score(self, state, &action.kind);
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((*action, s));
            }
        }
        best.map(|(a, _)| a.clone())
    }

    /// Expected production of a point: pips of each touching tile
    fn score_point(&self, state: &GameState, point: PointRef) -> i32 {
        self.topology
            .adjacent_tiles(point)
            .into_iter()
            .filter_map(|t| state.board.tile(t))
            .filter_map(|tile| tile.dice_number)
            .map(|n| 6 - (7 - n as i32).abs())
            .sum()
    }

    fn score_settlement_action(&self, state: &GameState, kind: &ActionKind) -> i32 {
        let ActionKind::BuildSettlement { point } = kind else {
            return 0;
        };
        let mut score = self.score_point(state, *point);

        // Bonus for resource diversity
        let mut kinds: Vec<Resource> = self
            .topology
            .adjacent_tiles(*point)
            .into_iter()
            .filter_map(|t| state.board.tile(t).and_then(|tile| tile.resource()))
            .collect();
        kinds.sort();
        kinds.dedup();
        score += kinds.len() as i32 * 2;
        score
    }

    fn score_city_action(&self, state: &GameState, kind: &ActionKind) -> i32 {
        match kind {
            ActionKind::BuildCity { point } => self.score_point(state, *point),
            _ => 0,
        }
    }

    /// Roads are worth the best open spot they lead to
    fn score_road_action(&self, state: &GameState, kind: &ActionKind) -> i32 {
        let ActionKind::BuildRoad { road } = kind else {
            return 0;
        };
        road.endpoints()
            .into_iter()
            .filter(|&p| state.board.satisfies_distance_rule(p, self.topology.as_ref()))
            .map(|p| self.score_point(state, p))
            .max()
            .unwrap_or(0)
    }

    /// Hurt opponents on busy tiles, never ourselves
    fn score_robber_action(&self, state: &GameState, kind: &ActionKind) -> i32 {
        let tile = match kind {
            ActionKind::MoveRobber { tile } => *tile,
            ActionKind::PlayDevCard(DevCardPlay::Knight { tile, .. }) => *tile,
            _ => return 0,
        };
        let Some(found) = state.board.tile(tile) else {
            return -100;
        };
        let mut score = found.dice_number.map_or(0, |n| 2 * (6 - (7 - n as i32).abs()));
        for owner in state.board.players_adjacent_to_tile(tile, self.topology.as_ref()) {
            if owner == self.player_id {
                score -= 20;
            } else {
                score += 5 + state.victory_points(owner) as i32;
            }
        }
        score
    }

    fn score_steal_action(&self, state: &GameState, kind: &ActionKind) -> i32 {
        let ActionKind::StealCard { victim } = kind else {
            return 0;
        };
        let cards = state
            .players
            .get(*victim as usize)
            .map_or(0, |p| p.resources.total());
        state.victory_points(*victim) as i32 * 3 + cards as i32
    }

    fn answer_trade(&mut self, state: &GameState, request: &TradeRequest) -> Action {
        let accept = match self.difficulty {
            BotDifficulty::Easy => self.rng.gen_bool(0.5),
            BotDifficulty::Medium => state
                .players
                .get(self.player_id as usize)
                .is_some_and(|me| {
                    // Give only from surplus, and only for things we lack
                    let offer = &request.offer;
                    offer.request.entries().iter().all(|&(r, n)| me.resources.get(r) >= n + 2)
                        && offer.offer.entries().iter().any(|&(r, _)| me.resources.get(r) == 0)
                }),
        };
        self.action(if accept {
            ActionKind::AcceptTrade
        } else {
            ActionKind::RejectTrade
        })
    }
}

impl PlayerSource for Bot {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_action(&mut self, state: &GameState, prompt: &Prompt) -> Result<Action, InputError> {
        self.choose_action(state, prompt)
            .ok_or(InputError::NoAction(self.player_id))
    }
}

fn matching(candidates: &[Action], pred: impl Fn(&ActionKind) -> bool) -> Vec<&Action> {
    candidates.iter().filter(|a| pred(&a.kind)).collect()
}

/// The resource held least, skipping `except`
fn least_held(hand: &ResourceHand, except: Option<Resource>) -> Resource {
    Resource::ALL
        .into_iter()
        .filter(|&r| Some(r) != except)
        .min_by_key(|&r| hand.get(r))
        .unwrap_or(Resource::Grain)
}

/// Discard `count` cards, always from whatever is held most. Ties go to
/// the earlier resource in `Resource::ALL`.
pub fn bot_discard(hand: &ResourceHand, count: u32) -> ResourceHand {
    let mut remaining = *hand;
    let mut discard = ResourceHand::new();
    for _ in 0..count {
        // max_by_key keeps the last maximum, so walk the resources backwards
        let Some(most) = Resource::ALL
            .into_iter()
            .rev()
            .filter(|&r| remaining.get(r) > 0)
            .max_by_key(|&r| remaining.get(r))
        else {
            break;
        };
        remaining.try_subtract(&ResourceHand::single(most, 1));
        discard.add(most, 1);
    }
    discard
}

// ==================== Scripted source ====================

/// Notifications a [`ScriptedPlayer`] has received, shared with the test
pub type Inbox = Rc<RefCell<Vec<Notification>>>;

/// Plays back a fixed list of actions, then hands over to an optional
/// fallback source
pub struct ScriptedPlayer {
    name: String,
    script: VecDeque<Action>,
    fallback: Option<Box<dyn PlayerSource>>,
    prompts: Rc<RefCell<Vec<Prompt>>>,
    inbox: Inbox,
}

impl ScriptedPlayer {
    pub fn new(name: impl Into<String>, script: impl IntoIterator<Item = Action>) -> Self {
        Self {
            name: name.into(),
            script: script.into_iter().collect(),
            fallback: None,
            prompts: Rc::default(),
            inbox: Rc::default(),
        }
    }

    pub fn then(mut self, fallback: impl PlayerSource + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn inbox(&self) -> Inbox {
        Rc::clone(&self.inbox)
    }

    /// Every prompt this player has been shown
    pub fn prompts(&self) -> Rc<RefCell<Vec<Prompt>>> {
        Rc::clone(&self.prompts)
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PlayerSource for ScriptedPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_action(&mut self, state: &GameState, prompt: &Prompt) -> Result<Action, InputError> {
        self.prompts.borrow_mut().push(prompt.clone());
        if let Some(action) = self.script.pop_front() {
            return Ok(action);
        }
        match &mut self.fallback {
            Some(source) => source.request_action(state, prompt),
            None => Err(InputError::Exhausted(self.name.clone())),
        }
    }

    fn notify(&mut self, notification: &Notification) {
        self.inbox.borrow_mut().push(notification.clone());
        if let Some(source) = &mut self.fallback {
            source.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{GamePhase, TurnPhase};
    use crate::state::GameConfig;
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        Engine::new(&GameConfig::with_players(["A", "B"]).with_seed(11)).unwrap()
    }

    #[test]
    fn test_setup_prompt_lists_every_free_point() {
        let engine = engine();
        let prompt = Prompt::for_turn(&engine);
        assert_eq!(prompt.player, 0);
        assert_eq!(prompt.allowed, vec![ActionType::BuildSettlement]);
        assert_eq!(prompt.options.settlement_points.len(), 54);
        assert!(prompt.message.contains("starting settlement"));
    }

    #[test]
    fn test_trade_prompt() {
        let engine = engine();
        let offer = TradeOffer {
            target: 1,
            offer: ResourceHand::single(Resource::Ore, 1),
            request: ResourceHand::single(Resource::Wool, 2),
        };
        let prompt = Prompt::for_trade(0, &offer, engine.state());
        assert_eq!(prompt.player, 1);
        assert_eq!(
            prompt.allowed,
            vec![ActionType::AcceptTrade, ActionType::RejectTrade]
        );
        assert_eq!(prompt.message, "A offers 1 ore for your 2 wool. Accept or reject?");
    }

    #[test]
    fn test_medium_bot_picks_best_start() {
        let engine = engine();
        let mut bot = Bot::with_seed(0, BotDifficulty::Medium, 1);
        let action = bot
            .choose_action(engine.state(), &Prompt::for_turn(&engine))
            .unwrap();
        assert_eq!(action.action_type(), ActionType::BuildSettlement);

        let best = StandardTopology::new()
            .points()
            .into_iter()
            .map(|point| {
                bot.score_settlement_action(engine.state(), &ActionKind::BuildSettlement { point })
            })
            .max()
            .unwrap();
        assert_eq!(bot.score_settlement_action(engine.state(), &action.kind), best);
    }

    #[test]
    fn test_medium_bot_rolls() {
        let mut state = engine().into_state();
        state.game_phase = GamePhase::NormalPlay;
        state.turn_phase = TurnPhase::RollDice;
        let engine = Engine::from_state(state, 1);

        let mut bot = Bot::with_seed(0, BotDifficulty::Medium, 1);
        let action = bot
            .choose_action(engine.state(), &Prompt::for_turn(&engine))
            .unwrap();
        assert_eq!(action.kind, ActionKind::RollDice);
    }

    #[test]
    fn test_easy_bot_only_offers_affordable_builds() {
        let mut state = engine().into_state();
        state.game_phase = GamePhase::NormalPlay;
        state.turn_phase = TurnPhase::PlayerActions;
        let engine = Engine::from_state(state, 1);

        let mut bot = Bot::with_seed(0, BotDifficulty::Easy, 3);
        for _ in 0..10 {
            let action = bot
                .choose_action(engine.state(), &Prompt::for_turn(&engine))
                .unwrap();
            assert_eq!(action.kind, ActionKind::EndTurn);
        }
    }

    #[test]
    fn test_bot_discard_takes_from_largest_pile() {
        let hand = ResourceHand::with_amounts(5, 1, 0, 2, 1);
        let discard = bot_discard(&hand, 4);
        assert_eq!(discard, ResourceHand::with_amounts(4, 0, 0, 0, 0));
        assert_eq!(bot_discard(&ResourceHand::new(), 3), ResourceHand::new());
    }

    #[test]
    fn test_bot_discard_breaks_ties_toward_earlier_resource() {
        let hand = ResourceHand::with_amounts(0, 2, 0, 2, 2);
        assert_eq!(bot_discard(&hand, 1), ResourceHand::single(Resource::Lumber, 1));
        assert_eq!(bot_discard(&hand, 4), ResourceHand::with_amounts(0, 2, 0, 1, 1));
    }

    #[test]
    fn test_medium_bot_trade_answers() {
        let mut state = engine().into_state();
        state.players[1].resources = ResourceHand::with_amounts(0, 0, 0, 0, 4);
        let mut bot = Bot::with_seed(1, BotDifficulty::Medium, 1);

        let fair = TradeOffer {
            target: 1,
            offer: ResourceHand::single(Resource::Ore, 1),
            request: ResourceHand::single(Resource::Wool, 2),
        };
        let prompt = Prompt::for_trade(0, &fair, &state);
        assert_eq!(
            bot.choose_action(&state, &prompt).map(|a| a.kind),
            Some(ActionKind::AcceptTrade)
        );

        let greedy = TradeOffer {
            request: ResourceHand::single(Resource::Wool, 3),
            ..fair
        };
        let prompt = Prompt::for_trade(0, &greedy, &state);
        assert_eq!(
            bot.choose_action(&state, &prompt).map(|a| a.kind),
            Some(ActionKind::RejectTrade)
        );
    }

    #[test]
    fn test_scripted_player_falls_back() {
        let engine = engine();
        let prompt = Prompt::for_turn(&engine);
        let mut scripted = ScriptedPlayer::new("script", [Action::new(0, ActionKind::EndTurn)])
            .then(Bot::with_seed(0, BotDifficulty::Easy, 2));
        let prompts = scripted.prompts();

        assert_eq!(
            scripted.request_action(engine.state(), &prompt),
            Ok(Action::new(0, ActionKind::EndTurn))
        );
        let next = scripted.request_action(engine.state(), &prompt).unwrap();
        assert_eq!(next.action_type(), ActionType::BuildSettlement);
        assert_eq!(prompts.borrow().len(), 2);

        let mut bare = ScriptedPlayer::new("bare", []);
        assert_eq!(
            bare.request_action(engine.state(), &prompt),
            Err(InputError::Exhausted("bare".into()))
        );
    }
}

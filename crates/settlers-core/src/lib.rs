//! Settlers - a turn and action rules engine for a 2-4 player
//! settlement, trading and building board game
//!
//! This crate provides:
//! - A fixed 19-tile, 54-point, 72-road board with harbors and a robber
//! - Player hands, the resource bank and the development deck
//! - The phase machine for setup, dice, discards, the robber and free play
//! - One validated, atomic handler per action
//! - A turn orchestrator that drives pluggable player sources
//!
//! # Architecture
//!
//! [`Engine`] is the only thing that mutates a [`GameState`]. Every action
//! goes through [`Engine::execute`] and comes back as one [`ActionResult`];
//! a rejected action leaves the state untouched. [`GameManager`] sits on
//! top and runs a whole game against [`PlayerSource`]s (bots, scripts or
//! anything else), keeping observers informed.
//!
//! # Modules
//!
//! - [`topology`]: Point, tile and road identifiers and their adjacency
//! - [`board`]: Tiles, harbors, buildings, roads and the robber
//! - [`player`]: Resource hands, development cards and per-player state
//! - [`bank`]: Finite resource supply and the development deck
//! - [`phase`]: Game and turn phases, and which actions each allows
//! - [`engine`]: Action execution, turn advancement and win detection
//! - [`manager`]: The turn loop, failure containment and notifications
//! - [`players`]: Player sources, including the built-in bot

pub mod actions;
pub mod bank;
pub mod board;
pub mod dice;
pub mod engine;
pub mod error;
pub mod manager;
pub mod observer;
pub mod phase;
pub mod player;
pub mod players;
pub mod rules;
pub mod state;
pub mod topology;

// Re-export commonly used types
pub use actions::{Action, ActionKind, ActionType, DevCardPlay, GameEvent, TradeOffer};
pub use bank::Bank;
pub use board::{Board, BuildingKind, Harbor, PlayerId, Resource, Tile, TileType};
pub use dice::{DiceRoller, LoadedDice, SeededDice};
pub use engine::{ActionResult, ActionSuccess, Engine};
pub use error::{EngineError, ErrorKind};
pub use manager::{GameManager, GameSummary, ManagerError, RunStatus, StepOutcome};
pub use observer::{EventLog, GameObserver, Notification, TracingObserver};
pub use phase::{GamePhase, TurnPhase};
pub use player::{DevelopmentCard, Player, ResourceHand};
pub use players::{Bot, BotDifficulty, InputError, PlayerSource, Prompt, ScriptedPlayer};
pub use rules::{DeclineTrades, TradeNegotiator};
pub use state::{GameConfig, GameState};
pub use topology::{PointRef, RoadSpan, StandardTopology, TileRef, Topology};

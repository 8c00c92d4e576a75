//! Per-action rule handlers.
//!
//! Each submodule adds an `impl Engine` block for one family of actions.
//! Handlers follow the same shape: validate against the current state,
//! return early on the first violation, then mutate. Nothing after the
//! first mutation may fail.

mod building;
mod cards;
mod robber;
mod trade;

pub use trade::{DeclineTrades, TradeNegotiator};

use crate::actions::GameEvent;
use crate::board::PlayerId;
use std::collections::BTreeSet;

/// What a handler did, before it is turned into an `ActionSuccess`
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub events: Vec<GameEvent>,
    pub affected: BTreeSet<PlayerId>,
    pub ends_turn: bool,
}

impl Outcome {
    pub fn event(event: GameEvent) -> Self {
        Self {
            events: vec![event],
            ..Self::default()
        }
    }
}

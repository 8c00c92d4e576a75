//! Notifications and observer hooks.
//!
//! The manager calls every registered [`GameObserver`] after each action,
//! successful or not, and forwards [`Notification`]s to observers and player
//! sources alike. Public copies of events are redacted; only the player a
//! private detail belongs to sees it.

use crate::actions::{Action, GameEvent};
use crate::board::PlayerId;
use crate::engine::ActionResult;
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Something that happened which a player or observer should hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Notification {
    GameStarted {
        game_id: Uuid,
        players: Vec<String>,
    },

    /// An action went through. Events are already redacted for the receiver.
    ActionExecuted {
        action: Action,
        events: Vec<GameEvent>,
        affected_players: Vec<PlayerId>,
    },

    /// An action was refused; the player may try again
    ActionRejected {
        player: PlayerId,
        kind: ErrorKind,
        message: String,
    },

    /// A player source could not produce an action at all
    InputFailed { player: PlayerId, message: String },

    /// Too many failures in a row; the turn (or the discard) was forced
    PlayerLockedOut { player: PlayerId, failures: u32 },

    /// The engine hit an internal fault. The game goes on.
    ExecutionFault { player: PlayerId, message: String },

    GameOver {
        winner: Option<PlayerId>,
        turn_number: u32,
    },
}

/// Hook for visualization, logging and AI collaborators
pub trait GameObserver {
    /// Called after every execution attempt with the unredacted result
    fn on_action(&mut self, _action: &Action, _result: &ActionResult) {}

    /// Called with the public copy of every notification
    fn on_notification(&mut self, _notification: &Notification) {}
}

/// Forwards everything to `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl GameObserver for TracingObserver {
    fn on_action(&mut self, action: &Action, result: &ActionResult) {
        match result {
            Ok(success) => {
                for event in &success.events {
                    debug!(action = %action, event = ?event.redacted_for(None), "event");
                }
            }
            Err(err) => debug!(action = %action, kind = %err.kind(), "rejected: {err}"),
        }
    }

    fn on_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::GameStarted { game_id, players } => {
                info!(%game_id, ?players, "game started")
            }
            Notification::PlayerLockedOut { player, failures } => {
                warn!(player, failures, "player locked out for this turn")
            }
            Notification::ExecutionFault { player, message } => {
                error!(player, "execution fault: {message}")
            }
            Notification::GameOver {
                winner,
                turn_number,
            } => info!(?winner, turn_number, "game over"),
            Notification::InputFailed { player, message } => {
                debug!(player, "no action from player: {message}")
            }
            Notification::ActionExecuted { .. } | Notification::ActionRejected { .. } => {}
        }
    }
}

/// One recorded execution attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedAction {
    pub action: Action,
    pub events: Vec<GameEvent>,
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Default)]
struct LogInner {
    actions: Vec<LoggedAction>,
    notifications: Vec<Notification>,
}

/// Records everything it observes. Clones share the same log, so a test
/// can keep one handle and give the other to the manager.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Rc<RefCell<LogInner>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<LoggedAction> {
        self.inner.borrow().actions.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.borrow().notifications.clone()
    }

    /// Every event from successful actions, in order
    pub fn events(&self) -> Vec<GameEvent> {
        self.inner
            .borrow()
            .actions
            .iter()
            .flat_map(|a| a.events.iter().cloned())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.inner
            .borrow()
            .actions
            .iter()
            .filter(|a| a.error.is_some())
            .count()
    }
}

impl GameObserver for EventLog {
    fn on_action(&mut self, action: &Action, result: &ActionResult) {
        let (events, error) = match result {
            Ok(success) => (success.events.clone(), None),
            Err(err) => (Vec::new(), Some(err.kind())),
        };
        self.inner.borrow_mut().actions.push(LoggedAction {
            action: action.clone(),
            events,
            error,
        });
    }

    fn on_notification(&mut self, notification: &Notification) {
        self.inner
            .borrow_mut()
            .notifications
            .push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::error::EngineError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_log_handles_share_entries() {
        let log = EventLog::new();
        let mut handle = log.clone();

        let action = Action::new(1, ActionKind::RollDice);
        handle.on_action(&action, &Err(EngineError::NotYourTurn { expected: 0 }));
        handle.on_notification(&Notification::PlayerLockedOut {
            player: 1,
            failures: 3,
        });

        assert_eq!(log.failures(), 1);
        assert_eq!(log.actions()[0].error, Some(ErrorKind::NotYourTurn));
        assert_eq!(log.notifications().len(), 1);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_notification_json_shape() {
        let json = serde_json::to_value(Notification::PlayerLockedOut {
            player: 2,
            failures: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "PlayerLockedOut");
        assert_eq!(json["payload"]["player"], 2);
    }
}

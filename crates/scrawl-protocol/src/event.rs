//! Inbound events: everything that can happen to a room.
//!
//! Each event carries its payload and, where one exists, the acting
//! player. Timer expiry is routed through the same enum (`TimerEnd`) so
//! user actions and timeouts share one serialized processing path.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// An event funneled into the state machine.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON, e.g.
/// `{ "type": "SelectWord", "actor": 3, "word": "gato" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Host starts the game. Requires enough ready participants.
    StartGame { actor: PlayerId },

    /// The drawer picks one of the offered words.
    SelectWord { actor: PlayerId, word: String },

    /// The drawer submits the finished drawing.
    SubmitDrawing { actor: PlayerId, image_ref: String },

    /// A guesser submits a guess at the secret word.
    SubmitGuess { actor: PlayerId, text: String },

    /// Advance from the round-results screen to the next round.
    /// `None` when raised internally by the results timer.
    NextRound { actor: Option<PlayerId> },

    /// End the game and show final results. `None` when the machine
    /// redirects here after the last round.
    EndGame { actor: Option<PlayerId> },

    /// Host pauses the game, freezing the active countdown.
    PauseGame { actor: PlayerId },

    /// Host resumes a paused game with its exact remaining time.
    ResumeGame { actor: PlayerId },

    /// Host (or admin) clears the session back to `Waiting`.
    ResetGame { actor: PlayerId },

    /// The active phase timer reached zero. Internal only — never
    /// accepted from a network actor.
    TimerEnd,

    /// Something outside the machine failed in a way the room must
    /// surface (transport collapse, invariant breach reported upstream).
    ErrorOccurred { message: String, code: String },
}

impl GameEvent {
    /// The fieldless kind used for transition-table lookup.
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::StartGame { .. } => EventKind::StartGame,
            GameEvent::SelectWord { .. } => EventKind::SelectWord,
            GameEvent::SubmitDrawing { .. } => EventKind::SubmitDrawing,
            GameEvent::SubmitGuess { .. } => EventKind::SubmitGuess,
            GameEvent::NextRound { .. } => EventKind::NextRound,
            GameEvent::EndGame { .. } => EventKind::EndGame,
            GameEvent::PauseGame { .. } => EventKind::PauseGame,
            GameEvent::ResumeGame { .. } => EventKind::ResumeGame,
            GameEvent::ResetGame { .. } => EventKind::ResetGame,
            GameEvent::TimerEnd => EventKind::TimerEnd,
            GameEvent::ErrorOccurred { .. } => EventKind::ErrorOccurred,
        }
    }

    /// The acting player, when the event has one.
    pub fn actor(&self) -> Option<PlayerId> {
        match self {
            GameEvent::StartGame { actor }
            | GameEvent::SelectWord { actor, .. }
            | GameEvent::SubmitDrawing { actor, .. }
            | GameEvent::SubmitGuess { actor, .. }
            | GameEvent::PauseGame { actor }
            | GameEvent::ResumeGame { actor }
            | GameEvent::ResetGame { actor } => Some(*actor),
            GameEvent::NextRound { actor } | GameEvent::EndGame { actor } => *actor,
            GameEvent::TimerEnd | GameEvent::ErrorOccurred { .. } => None,
        }
    }
}

/// Fieldless mirror of [`GameEvent`], used as the column key of the
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    StartGame,
    SelectWord,
    SubmitDrawing,
    SubmitGuess,
    NextRound,
    EndGame,
    PauseGame,
    ResumeGame,
    ResetGame,
    TimerEnd,
    ErrorOccurred,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let ev = GameEvent::SelectWord {
            actor: PlayerId(1),
            word: "gato".into(),
        };
        assert_eq!(ev.kind(), EventKind::SelectWord);
        assert_eq!(GameEvent::TimerEnd.kind(), EventKind::TimerEnd);
    }

    #[test]
    fn test_actor_present_for_player_events() {
        let ev = GameEvent::SubmitGuess {
            actor: PlayerId(9),
            text: "dog".into(),
        };
        assert_eq!(ev.actor(), Some(PlayerId(9)));
    }

    #[test]
    fn test_actor_absent_for_internal_events() {
        assert_eq!(GameEvent::TimerEnd.actor(), None);
        assert_eq!(GameEvent::NextRound { actor: None }.actor(), None);
    }

    #[test]
    fn test_event_json_shape_is_internally_tagged() {
        let ev = GameEvent::SelectWord {
            actor: PlayerId(3),
            word: "gato".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "SelectWord");
        assert_eq!(json["actor"], 3);
        assert_eq!(json["word"], "gato");
    }

    #[test]
    fn test_event_round_trip() {
        let ev = GameEvent::ErrorOccurred {
            message: "transport gone".into(),
            code: "TRANSPORT".into(),
        };
        let bytes = serde_json::to_vec(&ev).unwrap();
        let decoded: GameEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, decoded);
    }
}

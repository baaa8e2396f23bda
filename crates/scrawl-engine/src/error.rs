//! Error types for the game engine.
//!
//! Two families with very different blast radii:
//!
//! - **Rejections** (`NoSession`, `TransitionNotAllowed`, `Validation`,
//!   `Collaborator`): returned to the immediate caller, the session is
//!   untouched, the room keeps playing.
//! - **Hard failures** (`Internal`): force the room into the `Error`
//!   phase — timer stopped, detail persisted, room-wide notice — and
//!   recovery requires an explicit reset.

use scrawl_protocol::{EventKind, GamePhase, PlayerId, RoomId};

/// Failure reported by an external collaborator (store, transport,
/// word bank, leaderboard, evaluator, membership).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PortError {
    message: String,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A synchronous rejection of a single event. The session is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Only the current drawer may select the word or submit the drawing.
    #[error("player {0} is not the current drawer")]
    NotDrawer(PlayerId),

    /// The drawer may not guess their own word.
    #[error("player {0} is the drawer and cannot guess")]
    DrawerCannotGuess(PlayerId),

    /// The selected word was not among the offered options.
    #[error("word was not among the offered options")]
    WordNotOffered,

    /// The drawing payload is not a well-formed image reference.
    #[error("malformed drawing reference: {0}")]
    MalformedDrawing(String),

    /// Starting requires a quorum of ready players.
    #[error("need at least {required} ready players, have {ready}")]
    NotEnoughPlayers { ready: usize, required: usize },

    /// Guesses must contain something to compare.
    #[error("guess text is empty")]
    EmptyGuess,
}

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No session exists for the room (only `StartGame` creates one).
    #[error("no active session for room {0}")]
    NoSession(RoomId),

    /// The (phase, event) pair is not in the transition table.
    #[error("event {event:?} is not allowed in phase {phase}")]
    TransitionNotAllowed { phase: GamePhase, event: EventKind },

    /// Actor or payload validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator call failed in a context where the caller can
    /// simply retry (e.g. loading the session, the readiness check).
    #[error("collaborator failure during {context}: {source}")]
    Collaborator {
        context: &'static str,
        #[source]
        source: PortError,
    },

    /// An invariant broke or a mandatory dependency was unavailable.
    /// Forces the room into the `Error` phase.
    #[error("internal game error: {0}")]
    Internal(String),

    /// The room's worker task is gone (engine shutting down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl GameError {
    /// Whether this error merely rejected the event, leaving the session
    /// untouched. Everything else forces the `Error` phase.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GameError::NoSession(_)
                | GameError::TransitionNotAllowed { .. }
                | GameError::Validation(_)
                | GameError::Collaborator { .. }
        )
    }
}

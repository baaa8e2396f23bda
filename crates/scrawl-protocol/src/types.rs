//! Identity, participant, and phase types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a player ID can never be confused with a room ID
/// at a call site. `#[serde(transparent)]` keeps the wire shape a plain
/// number: `PlayerId(42)` serializes as `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room — one isolated game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Specifies who should receive a notification.
///
/// The state machine produces `(Recipient, Notification)` pairs; the
/// transport layer decides how to deliver each one. Drawer-only payloads
/// (word options, the full word) use `Player`, everything else `All`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every participant in the room.
    All,
    /// One specific participant.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// A participant's role inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRole {
    /// Room owner; may start, pause, resume, and reset the game.
    Host,
    /// Ordinary player; draws and guesses.
    Player,
    /// Watches only — never drawer, never scored.
    Spectator,
}

/// Read-only reference to a room member, owned by the membership
/// collaborator. The engine never mutates these; it only reads them for
/// readiness checks and drawer rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub player_id: PlayerId,
    pub display_name: String,
    pub role: ParticipantRole,
    /// Whether the participant's connection is currently live.
    pub connected: bool,
    /// Whether the participant has flagged themselves ready to play.
    pub ready: bool,
}

impl Participant {
    /// Whether this participant can currently take the drawer role.
    pub fn can_draw(&self) -> bool {
        self.connected && self.role != ParticipantRole::Spectator
    }
}

/// Word difficulty requested from the word bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// The state set of the round/turn state machine.
///
/// ```text
/// Waiting → Starting → WordSelection → Drawing → Guessing → RoundEnd
///              ▲              ▲                                │
///              │              └───────── next round ───────────┤
///              │                                               ▼
///              └────────────── reset ──────────────────── GameEnd
/// ```
///
/// `Paused` is entered from `Drawing`/`Guessing` and returns to whichever
/// phase was active. `Error` is reachable from anywhere; both `GameEnd`
/// and `Error` are terminal until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Waiting,
    Starting,
    WordSelection,
    Drawing,
    Guessing,
    RoundEnd,
    GameEnd,
    Paused,
    Error,
}

impl GamePhase {
    /// Every phase, in declaration order. Used by table-closure tests and
    /// by anything that needs to enumerate the state set.
    pub const ALL: [GamePhase; 9] = [
        GamePhase::Waiting,
        GamePhase::Starting,
        GamePhase::WordSelection,
        GamePhase::Drawing,
        GamePhase::Guessing,
        GamePhase::RoundEnd,
        GamePhase::GameEnd,
        GamePhase::Paused,
        GamePhase::Error,
    ];

    /// Terminal until an explicit `ResetGame`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::GameEnd | GamePhase::Error)
    }

    /// Phases whose countdown may be frozen by a pause.
    pub fn is_pausable(&self) -> bool {
        matches!(self, GamePhase::Drawing | GamePhase::Guessing)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Starting => "starting",
            GamePhase::WordSelection => "word_selection",
            GamePhase::Drawing => "drawing",
            GamePhase::Guessing => "guessing",
            GamePhase::RoundEnd => "round_end",
            GamePhase::GameEnd => "game_end",
            GamePhase::Paused => "paused",
            GamePhase::Error => "error",
        };
        f.write_str(name)
    }
}

// =========================================================================
// Tests
// =========================================================================

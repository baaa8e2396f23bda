//! Outbound notifications: everything a room tells its observers.
//!
//! Notifications are already *sanitized* — a [`SessionView`] never
//! contains the secret word or the drawer's word options. Drawer-only
//! payloads exist as dedicated variants addressed via
//! [`Recipient::Player`](crate::Recipient::Player).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GamePhase, PlayerId, RoomId};

/// A sanitized snapshot of a room's session, safe to broadcast to every
/// participant. The secret word appears only as a masked length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub room_id: RoomId,
    pub phase: GamePhase,
    pub round: u32,
    pub total_rounds: u32,
    /// Seconds left on the active phase timer (0 when none).
    pub time_remaining: u32,
    pub drawer: Option<PlayerId>,
    /// Character count of the secret word, present from `Drawing` onward.
    pub word_length: Option<usize>,
    pub scores: BTreeMap<PlayerId, u32>,
}

/// One row of the final ranking. Ranks are 1-based and contiguous —
/// ties are broken deterministically, never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub player_id: PlayerId,
    pub score: u32,
    pub rank: u32,
}

/// A server-to-participant notification.
///
/// Internally tagged like every other wire enum in this crate:
/// `{ "type": "TimerTick", "remaining": 42 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// The room transitioned phases; includes the sanitized snapshot.
    StateChanged { view: SessionView },

    /// Seconds remaining on the active countdown. Best-effort; ticks may
    /// coalesce under load.
    TimerTick { remaining: u32 },

    /// Drawer-only: the words offered for selection.
    WordOptions { options: Vec<String> },

    /// Drawer-only: the word in play. `auto_selected` is set when the
    /// selection timer expired and the machine picked for them.
    WordAssigned { word: String, auto_selected: bool },

    /// Broadcast: the length of the word everyone is guessing.
    WordMasked { length: usize },

    /// Broadcast: the drawer's submission (or `None` on timeout).
    DrawingSubmitted {
        drawer: PlayerId,
        image_ref: Option<String>,
        round: u32,
    },

    /// Private to the guesser: whether their guess matched.
    GuessResult { correct: bool, score: u32 },

    /// Broadcast whenever the score ledger changes.
    ScoreUpdate { scores: BTreeMap<PlayerId, u32> },

    /// Broadcast at the end of each round, revealing the word.
    RoundEnded {
        round: u32,
        word: Option<String>,
        scores: BTreeMap<PlayerId, u32>,
    },

    /// Broadcast once with the final ranking.
    GameEnded {
        rankings: Vec<RankedPlayer>,
        winner: Option<PlayerId>,
    },

    /// Broadcast after a reset; clients drop all game state.
    GameReset,

    /// Broadcast when the room enters the error phase. Generic on
    /// purpose — internal detail stays in the persisted session.
    GameError { message: String, code: String },
}

//! Shared vocabulary of the Scrawl game engine.
//!
//! Every type that crosses a boundary lives here: identity newtypes,
//! the inbound [`GameEvent`] enum, the outbound [`Notification`] enum,
//! and the participant/phase types referenced by both sides.
//!
//! # Key types
//!
//! - [`PlayerId`] / [`RoomId`] — identity newtypes
//! - [`GamePhase`] — the round/turn state machine's state set
//! - [`GameEvent`] — everything that can happen to a room
//! - [`Notification`] — everything a room tells the outside world
//! - [`Recipient`] — who a notification is addressed to

mod event;
mod notify;
mod types;

pub use event::{EventKind, GameEvent};
pub use notify::{Notification, RankedPlayer, SessionView};
pub use types::{
    Difficulty, GamePhase, Participant, ParticipantRole, PlayerId, Recipient, RoomId,
};

//! Round and turn orchestration for scrawl rooms.
//!
//! The crate is organized around three pieces:
//!
//! - [`table`]: the transition table — every legal (phase, event) pair
//!   and the action it runs, as plain data.
//! - [`machine::GameMachine`]: loads the session, consults the table,
//!   runs the action, persists, notifies. One logical step per event.
//! - [`engine::GameEngine`]: one worker task per room so player events
//!   and timer expirations for that room never interleave.
//!
//! External concerns (storage, delivery, words, leaderboard, room
//! membership, drawing evaluation) sit behind the traits in [`ports`];
//! [`adapters`] provides in-memory implementations for tests and demos.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod machine;
pub mod ports;
pub mod rotation;
pub mod scoring;
pub mod session;
pub mod table;

pub use config::GameConfig;
pub use engine::GameEngine;
pub use error::{GameError, PortError, ValidationError};
pub use machine::{EventOutcome, GameMachine};
pub use ports::Collaborators;
pub use session::{GameSession, ScoreLedger};

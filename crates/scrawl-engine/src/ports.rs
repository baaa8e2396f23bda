//! Collaborator ports: the engine's view of the outside world.
//!
//! Storage, transport, the word bank, the leaderboard, the optional AI
//! evaluator, and room membership are external services. The engine
//! talks to them through these trait objects so tests and demos can
//! inject in-memory versions (see [`crate::adapters`]).

use std::sync::Arc;

use async_trait::async_trait;

use scrawl_protocol::{Difficulty, Notification, Participant, PlayerId, RoomId};

use crate::error::PortError;
use crate::session::{AiEvaluation, GameSession};

/// Session storage. Single-writer-per-room: only a room's own serialized
/// task ever writes its session.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn load_session(&self, room_id: RoomId) -> Result<Option<GameSession>, PortError>;
    async fn save_session(&self, session: &GameSession) -> Result<(), PortError>;
    async fn delete_session(&self, room_id: RoomId) -> Result<(), PortError>;
}

/// Outbound notification delivery. Best-effort by contract: delivery
/// failures are the transport's concern and never abort a transition.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn broadcast_to_room(&self, room_id: RoomId, notification: Notification);
    async fn send_to_player(&self, player_id: PlayerId, notification: Notification);
}

/// Supplies word choices. An empty `categories` slice requests the
/// generic pool; implementations should fall back to it themselves when
/// the preferred categories are empty or unavailable.
#[async_trait]
pub trait WordBankPort: Send + Sync {
    async fn word_options(
        &self,
        categories: &[String],
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<String>, PortError>;
}

/// Receives final results. Best-effort: failures are logged per player
/// and never abort the game-end transition.
#[async_trait]
pub trait LeaderboardPort: Send + Sync {
    async fn record_game_result(
        &self,
        player_id: PlayerId,
        display_name: &str,
        final_score: u32,
        category: &str,
    ) -> Result<(), PortError>;
}

/// Advisory drawing evaluation. Purely informational; errors and
/// timeouts become an "unavailable" [`AiEvaluation`].
#[async_trait]
pub trait AiEvaluationPort: Send + Sync {
    async fn evaluate_drawing(&self, image_ref: &str, word: &str)
    -> Result<AiEvaluation, PortError>;
}

/// Room membership, owned elsewhere. Participants come back in stable
/// join order — rotation depends on that.
#[async_trait]
pub trait MembershipPort: Send + Sync {
    async fn participants(&self, room_id: RoomId) -> Result<Vec<Participant>, PortError>;
}

/// The engine's collaborators, bundled for injection.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PersistencePort>,
    pub transport: Arc<dyn TransportPort>,
    pub word_bank: Arc<dyn WordBankPort>,
    pub leaderboard: Arc<dyn LeaderboardPort>,
    pub membership: Arc<dyn MembershipPort>,
    /// Absent disables evaluation entirely.
    pub evaluator: Option<Arc<dyn AiEvaluationPort>>,
}

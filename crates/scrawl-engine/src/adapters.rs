//! In-memory reference adapters for the collaborator ports.
//!
//! These back the demo binary and the integration tests. A deployment
//! swaps in its own implementations (database store, socket transport,
//! and so on) without touching the engine.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scrawl_protocol::{Difficulty, Notification, Participant, PlayerId, RoomId};

use crate::error::PortError;
use crate::ports::{
    Collaborators, LeaderboardPort, MembershipPort, PersistencePort, TransportPort, WordBankPort,
};
use crate::session::GameSession;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ======================================================================
// Persistence
// ======================================================================

/// Session store backed by a hash map.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<RoomId, GameSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistencePort for MemoryStore {
    async fn load_session(&self, room_id: RoomId) -> Result<Option<GameSession>, PortError> {
        Ok(lock(&self.sessions).get(&room_id).cloned())
    }

    async fn save_session(&self, session: &GameSession) -> Result<(), PortError> {
        lock(&self.sessions).insert(session.room_id, session.clone());
        Ok(())
    }

    async fn delete_session(&self, room_id: RoomId) -> Result<(), PortError> {
        lock(&self.sessions).remove(&room_id);
        Ok(())
    }
}

// ======================================================================
// Transport
// ======================================================================

/// Records every delivery instead of sending it anywhere. Tests drain
/// the log; the demo prints it.
#[derive(Default)]
pub struct RecordingTransport {
    deliveries: Mutex<VecDeque<Delivery>>,
}

/// One delivered notification and where it went.
#[derive(Debug, Clone)]
pub enum Delivery {
    Broadcast(RoomId, Notification),
    Direct(PlayerId, Notification),
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything delivered so far.
    pub fn drain(&self) -> Vec<Delivery> {
        lock(&self.deliveries).drain(..).collect()
    }
}

#[async_trait]
impl TransportPort for RecordingTransport {
    async fn broadcast_to_room(&self, room_id: RoomId, notification: Notification) {
        lock(&self.deliveries).push_back(Delivery::Broadcast(room_id, notification));
    }

    async fn send_to_player(&self, player_id: PlayerId, notification: Notification) {
        lock(&self.deliveries).push_back(Delivery::Direct(player_id, notification));
    }
}

// ======================================================================
// Word bank
// ======================================================================

/// Fixed word list, served in order so tests know what was offered.
pub struct StaticWordBank {
    words: Vec<String>,
    cursor: Mutex<usize>,
}

impl StaticWordBank {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            cursor: Mutex::new(0),
        }
    }
}

#[async_trait]
impl WordBankPort for StaticWordBank {
    async fn word_options(
        &self,
        _categories: &[String],
        _difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<String>, PortError> {
        if self.words.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = lock(&self.cursor);
        let options = (0..count)
            .map(|i| self.words[(*cursor + i) % self.words.len()].clone())
            .collect();
        *cursor = (*cursor + count) % self.words.len();
        Ok(options)
    }
}

// ======================================================================
// Leaderboard
// ======================================================================

/// Accumulates reported results in memory.
#[derive(Default)]
pub struct MemoryLeaderboard {
    results: Mutex<Vec<ReportedResult>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedResult {
    pub player_id: PlayerId,
    pub display_name: String,
    pub final_score: u32,
    pub category: String,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ReportedResult> {
        lock(&self.results).clone()
    }
}

#[async_trait]
impl LeaderboardPort for MemoryLeaderboard {
    async fn record_game_result(
        &self,
        player_id: PlayerId,
        display_name: &str,
        final_score: u32,
        category: &str,
    ) -> Result<(), PortError> {
        lock(&self.results).push(ReportedResult {
            player_id,
            display_name: display_name.to_string(),
            final_score,
            category: category.to_string(),
        });
        Ok(())
    }
}

// ======================================================================
// Membership
// ======================================================================

/// Participant roster held in memory, mutable from outside the engine
/// (joins, disconnects) like a real room service would be.
#[derive(Default)]
pub struct MemoryRoster {
    rooms: Mutex<HashMap<RoomId, Vec<Participant>>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_participants(&self, room_id: RoomId, participants: Vec<Participant>) {
        lock(&self.rooms).insert(room_id, participants);
    }

    pub fn set_connected(&self, room_id: RoomId, player_id: PlayerId, connected: bool) {
        if let Some(roster) = lock(&self.rooms).get_mut(&room_id) {
            if let Some(p) = roster.iter_mut().find(|p| p.player_id == player_id) {
                p.connected = connected;
            }
        }
    }
}

#[async_trait]
impl MembershipPort for MemoryRoster {
    async fn participants(&self, room_id: RoomId) -> Result<Vec<Participant>, PortError> {
        Ok(lock(&self.rooms).get(&room_id).cloned().unwrap_or_default())
    }
}

// ======================================================================
// Bundles
// ======================================================================

/// Everything wired to the in-memory adapters, with handles kept so the
/// caller can inspect or mutate them.
pub struct MemoryHarness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub leaderboard: Arc<MemoryLeaderboard>,
    pub roster: Arc<MemoryRoster>,
}

impl MemoryHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            transport: Arc::new(RecordingTransport::new()),
            leaderboard: Arc::new(MemoryLeaderboard::new()),
            roster: Arc::new(MemoryRoster::new()),
        }
    }

    pub fn collaborators(&self, words: &[&str]) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            transport: self.transport.clone(),
            word_bank: Arc::new(StaticWordBank::new(words.iter().copied())),
            leaderboard: self.leaderboard.clone(),
            membership: self.roster.clone(),
            evaluator: None,
        }
    }
}

impl Default for MemoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

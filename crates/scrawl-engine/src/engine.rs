//! Per-room event serialization.
//!
//! Each active room gets one worker task owning a command channel and
//! the room's timer signal channel. Every state change for a room —
//! player events and timer expirations alike — funnels through that
//! single task, so two events can never interleave mid-transition.

use std::collections::HashMap;
use std::sync::Arc;

use scrawl_protocol::{GameEvent, RoomId};
use scrawl_timer::TimerSignal;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::machine::{EventOutcome, GameMachine};

/// Backpressure bound on each room's command queue.
const COMMAND_CHANNEL_SIZE: usize = 64;

enum RoomCommand {
    Event {
        event: GameEvent,
        reply: oneshot::Sender<Result<EventOutcome, GameError>>,
    },
    Shutdown,
}

struct RoomEntry {
    tx: mpsc::Sender<RoomCommand>,
}

/// Front door of the engine. Clone-cheap via the inner `Arc`s; workers
/// are spawned lazily on the first event for a room.
pub struct GameEngine {
    machine: Arc<GameMachine>,
    rooms: Mutex<HashMap<RoomId, RoomEntry>>,
}

impl GameEngine {
    pub fn new(machine: GameMachine) -> Self {
        Self {
            machine: Arc::new(machine),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Submit one event for a room and wait for the outcome of the full
    /// serialized step (including forced follow-ups).
    pub async fn submit(
        &self,
        room_id: RoomId,
        event: GameEvent,
    ) -> Result<EventOutcome, GameError> {
        let tx = self.room_sender(room_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(RoomCommand::Event {
            event,
            reply: reply_tx,
        })
        .await
        .map_err(|_| GameError::Unavailable(room_id))?;
        reply_rx.await.map_err(|_| GameError::Unavailable(room_id))?
    }

    /// Tear down a room's worker and countdown. The persisted session is
    /// left alone; a later event respawns the worker.
    pub async fn close_room(&self, room_id: RoomId) {
        let entry = self.rooms.lock().await.remove(&room_id);
        self.machine.timers().stop(room_id);
        if let Some(entry) = entry {
            // Worker may already be gone; that's fine.
            let _ = entry.tx.send(RoomCommand::Shutdown).await;
            info!(%room_id, "room closed");
        }
    }

    async fn room_sender(&self, room_id: RoomId) -> mpsc::Sender<RoomCommand> {
        let mut rooms = self.rooms.lock().await;
        if let Some(entry) = rooms.get(&room_id) {
            if !entry.tx.is_closed() {
                return entry.tx.clone();
            }
        }
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        tokio::spawn(run_room_worker(Arc::clone(&self.machine), room_id, rx));
        rooms.insert(room_id, RoomEntry { tx: tx.clone() });
        debug!(%room_id, "room worker spawned");
        tx
    }
}

async fn run_room_worker(
    machine: Arc<GameMachine>,
    room_id: RoomId,
    mut commands: mpsc::Receiver<RoomCommand>,
) {
    let (signal_tx, mut signals) = mpsc::unbounded_channel::<TimerSignal>();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(RoomCommand::Event { event, reply }) => {
                        let result = machine.process_event(room_id, event, &signal_tx).await;
                        log_failure(room_id, &result);
                        // Caller may have given up waiting.
                        let _ = reply.send(result);
                    }
                    Some(RoomCommand::Shutdown) | None => break,
                }
            }
            Some(signal) = signals.recv() => {
                handle_timer_signal(&machine, room_id, signal, &signal_tx).await;
            }
        }
    }
    debug!(%room_id, "room worker stopped");
}

async fn handle_timer_signal(
    machine: &GameMachine,
    room_id: RoomId,
    signal: TimerSignal,
    signal_tx: &scrawl_timer::SignalSender,
) {
    match signal {
        TimerSignal::Tick {
            generation,
            remaining,
            ..
        } => {
            if machine.timers().is_current(room_id, generation) {
                machine.broadcast_tick(room_id, remaining).await;
            }
        }
        TimerSignal::Expired { generation, .. } => {
            // A countdown replaced (or paused) after this signal was
            // queued must not end the new phase.
            if !machine.timers().is_current(room_id, generation) {
                debug!(%room_id, generation, "dropping stale timer expiry");
                return;
            }
            if let Err(err) = machine
                .process_event(room_id, GameEvent::TimerEnd, signal_tx)
                .await
            {
                // Expiry in a phase with no timeout rule (e.g. a guess
                // already ended the phase) is expected noise.
                debug!(%room_id, %err, "timer expiry not applied");
            }
        }
    }
}

fn log_failure(room_id: RoomId, result: &Result<EventOutcome, GameError>) {
    match result {
        Ok(_) => {}
        Err(err) if err.is_rejection() => debug!(%room_id, %err, "event rejected"),
        Err(err) => warn!(%room_id, %err, "event failed"),
    }
}

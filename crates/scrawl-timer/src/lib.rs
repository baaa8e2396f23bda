//! Per-room countdown timers with pause/resume and safe teardown.
//!
//! One phase of a Scrawl round is bounded by one countdown. The
//! [`TimerRegistry`] owns every live countdown, keyed by room, and
//! enforces the core invariant: **at most one live timer per room** —
//! starting a new phase timer implicitly cancels the previous one.
//!
//! Remaining time is always recomputed from wall-clock timestamps
//! (`remaining = ceil(end_time − now)`), never by decrementing a counter,
//! so the countdown stays correct under scheduler jitter and coalesced
//! ticks.
//!
//! # Signals
//!
//! A timer communicates with its room through an mpsc sender supplied at
//! [`TimerRegistry::start`]: at least one [`TimerSignal::Tick`] per
//! second, then exactly one [`TimerSignal::Expired`]. Every signal
//! carries the generation it was issued under; consumers must drop
//! signals whose generation is no longer current
//! ([`TimerRegistry::is_current`]) — that is the defense against a stale
//! expiry racing a reset, a pause, or a phase change.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use scrawl_protocol::RoomId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Channel sender over which a timer reports ticks and expiry.
pub type SignalSender = mpsc::UnboundedSender<TimerSignal>;

/// A signal emitted by a room's phase timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Seconds remaining, emitted at least once per second.
    Tick {
        room_id: RoomId,
        generation: u64,
        remaining: u32,
    },
    /// The countdown reached zero. Emitted exactly once per timer, after
    /// which the timer has already deregistered itself.
    Expired { room_id: RoomId, generation: u64 },
}

impl TimerSignal {
    /// The generation this signal was issued under.
    pub fn generation(&self) -> u64 {
        match self {
            TimerSignal::Tick { generation, .. } | TimerSignal::Expired { generation, .. } => {
                *generation
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseTimer
// ---------------------------------------------------------------------------

/// The countdown state of one phase: wall-clock anchored, freezable.
///
/// While running, `remaining()` derives from `end_time − now`. While
/// paused, the frozen `remaining` field is authoritative and resuming
/// recomputes `end_time` from it — time spent paused never counts
/// against the player.
#[derive(Debug, Clone)]
pub struct PhaseTimer {
    start_time: Instant,
    duration: Duration,
    end_time: Instant,
    /// Authoritative only while paused.
    remaining: u32,
    is_paused: bool,
    paused_at: Option<Instant>,
}

impl PhaseTimer {
    fn new(duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            duration,
            end_time: now + duration,
            remaining: ceil_secs(duration),
            is_paused: false,
            paused_at: None,
        }
    }

    /// Seconds left, recomputed from the wall clock unless paused.
    pub fn remaining(&self) -> u32 {
        if self.is_paused {
            self.remaining
        } else {
            ceil_secs(self.end_time.duration_since(Instant::now()))
        }
    }

    /// The full duration this phase was started with.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When this countdown started (last resume counts as a start).
    pub fn started_at(&self) -> Instant {
        self.start_time
    }

    /// Whether the countdown is currently frozen.
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// When the timer was frozen, if it is.
    pub fn paused_at(&self) -> Option<Instant> {
        self.paused_at
    }

    fn pause(&mut self) {
        if !self.is_paused {
            self.remaining = self.remaining();
            self.is_paused = true;
            self.paused_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if self.is_paused {
            let now = Instant::now();
            self.start_time = now;
            self.end_time = now + Duration::from_secs(u64::from(self.remaining));
            self.is_paused = false;
            self.paused_at = None;
        }
    }
}

/// Round a duration up to whole seconds (so 59.2s reads as 60 remaining,
/// matching what a countdown display shows).
fn ceil_secs(d: Duration) -> u32 {
    ((d.as_millis() + 999) / 1000) as u32
}

// ---------------------------------------------------------------------------
// TimerRegistry
// ---------------------------------------------------------------------------

struct Entry {
    timer: PhaseTimer,
    generation: u64,
    /// The ticking task. `None` while paused.
    task: Option<JoinHandle<()>>,
    signals: SignalSender,
}

struct Inner {
    entries: HashMap<RoomId, Entry>,
    /// The generation of the most recent start/pause/resume/stop per
    /// room. A signal is live iff its generation equals this value.
    latest: HashMap<RoomId, u64>,
    next_generation: u64,
}

/// Owns every live [`PhaseTimer`], keyed by room.
///
/// Cheap to clone (shared interior). All operations are short
/// lock-and-release critical sections; nothing is held across an await.
#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                latest: HashMap::new(),
                next_generation: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation elsewhere; the map
        // itself is still structurally sound, so recover rather than
        // cascade the panic into every room.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a countdown for `room_id`, cancelling any existing timer
    /// for that room first. Returns the new timer's generation.
    pub fn start(&self, room_id: RoomId, duration: Duration, signals: &SignalSender) -> u64 {
        let mut inner = self.lock();
        if let Some(old) = inner.entries.remove(&room_id) {
            if let Some(task) = old.task {
                task.abort();
            }
            debug!(%room_id, "replacing active phase timer");
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.latest.insert(room_id, generation);

        let timer = PhaseTimer::new(duration);
        let task = spawn_ticker(
            Arc::clone(&self.inner),
            room_id,
            generation,
            timer.end_time,
            signals.clone(),
        );
        inner.entries.insert(
            room_id,
            Entry {
                timer,
                generation,
                task: Some(task),
                signals: signals.clone(),
            },
        );

        debug!(%room_id, generation, secs = duration.as_secs(), "phase timer started");
        generation
    }

    /// Freezes the room's countdown. Returns `false` (no-op) if there is
    /// no timer or it is already paused.
    pub fn pause(&self, room_id: RoomId) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(&room_id) else {
            return false;
        };
        if entry.timer.is_paused() {
            return false;
        }
        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.timer.pause();
        let frozen = entry.timer.remaining();
        // Invalidate any tick already in flight from the aborted task.
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.latest.insert(room_id, generation);
        debug!(%room_id, remaining = frozen, "phase timer paused");
        true
    }

    /// Resumes a paused countdown with its exact frozen remaining time.
    /// Returns `false` (no-op) if there is no paused timer for the room.
    pub fn resume(&self, room_id: RoomId) -> bool {
        let mut inner = self.lock();
        let generation = inner.next_generation;
        let Some(entry) = inner.entries.get_mut(&room_id) else {
            return false;
        };
        if !entry.timer.is_paused() {
            return false;
        }
        entry.timer.resume();
        entry.generation = generation;
        let end_time = entry.timer.end_time;
        let signals = entry.signals.clone();
        entry.task = Some(spawn_ticker(
            Arc::clone(&self.inner),
            room_id,
            generation,
            end_time,
            signals,
        ));
        let remaining = entry.timer.remaining();
        inner.next_generation += 1;
        inner.latest.insert(room_id, generation);
        debug!(%room_id, generation, remaining, "phase timer resumed");
        true
    }

    /// Cancels and deregisters the room's timer. Safe no-op when nothing
    /// is active; returns whether a timer was actually stopped.
    pub fn stop(&self, room_id: RoomId) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.remove(&room_id) else {
            return false;
        };
        if let Some(task) = entry.task {
            task.abort();
        }
        // Invalidate in-flight signals from the stopped timer.
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.latest.insert(room_id, generation);
        debug!(%room_id, "phase timer stopped");
        true
    }

    /// Seconds left on the room's timer, if one exists.
    pub fn remaining(&self, room_id: RoomId) -> Option<u32> {
        let inner = self.lock();
        inner.entries.get(&room_id).map(|e| e.timer.remaining())
    }

    /// Whether the room's timer exists and is paused.
    pub fn is_paused(&self, room_id: RoomId) -> bool {
        let inner = self.lock();
        inner
            .entries
            .get(&room_id)
            .is_some_and(|e| e.timer.is_paused())
    }

    /// Whether a signal generation is still live for this room. Stale
    /// generations belong to timers that have since been replaced,
    /// paused, or stopped — their signals must be dropped.
    pub fn is_current(&self, room_id: RoomId, generation: u64) -> bool {
        let inner = self.lock();
        inner.latest.get(&room_id) == Some(&generation)
    }

    /// A copy of the room's timer state, if one exists.
    pub fn snapshot(&self, room_id: RoomId) -> Option<PhaseTimer> {
        let inner = self.lock();
        inner.entries.get(&room_id).map(|e| e.timer.clone())
    }

    /// Number of rooms with a live timer (paused ones included).
    pub fn active_count(&self) -> usize {
        self.lock().entries.len()
    }
}

/// The ticking task: emits one tick immediately, then at one-second
/// steps until the deadline, then the single expiry.
fn spawn_ticker(
    inner: Arc<Mutex<Inner>>,
    room_id: RoomId,
    generation: u64,
    end_time: Instant,
    signals: SignalSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Instant::now();
            let left = end_time.duration_since(now);

            if left.is_zero() {
                // Deregister before reporting expiry, and only if this
                // timer is still the room's current one — a replacement
                // or stop in the meantime wins.
                let fire = {
                    let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
                    let current = guard
                        .entries
                        .get(&room_id)
                        .is_some_and(|e| e.generation == generation)
                        && guard.latest.get(&room_id) == Some(&generation);
                    if current {
                        guard.entries.remove(&room_id);
                    }
                    current
                };
                if fire {
                    trace!(%room_id, generation, "phase timer expired");
                    let _ = signals.send(TimerSignal::Expired {
                        room_id,
                        generation,
                    });
                }
                return;
            }

            let remaining = ceil_secs(left);
            let live = {
                let guard = inner.lock().unwrap_or_else(|e| e.into_inner());
                guard.latest.get(&room_id) == Some(&generation)
            };
            if !live {
                return;
            }
            if signals
                .send(TimerSignal::Tick {
                    room_id,
                    generation,
                    remaining,
                })
                .is_err()
            {
                // Receiver gone — the room actor is shutting down.
                return;
            }

            time::sleep_until(now + left.min(Duration::from_secs(1))).await;
        }
    })
}

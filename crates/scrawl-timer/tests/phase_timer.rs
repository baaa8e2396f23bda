//! Integration tests for the per-room timer registry.
//!
//! Uses `tokio::time::pause()` (via `start_paused`) so wall-clock waits
//! are deterministic: sleeping in the test auto-advances the clock and
//! fires any due timers.

use std::time::Duration;

use scrawl_protocol::RoomId;
use scrawl_timer::{TimerRegistry, TimerSignal};
use tokio::sync::mpsc;

const ROOM: RoomId = RoomId(1);

fn channel() -> (
    mpsc::UnboundedSender<TimerSignal>,
    mpsc::UnboundedReceiver<TimerSignal>,
) {
    mpsc::unbounded_channel()
}

/// Let already-scheduled tasks run without advancing the clock.
async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

// =========================================================================
// Ticking and expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_reports_full_duration() {
    let registry = TimerRegistry::new();
    let (tx, mut rx) = channel();

    registry.start(ROOM, Duration::from_secs(10), &tx);

    let sig = rx.recv().await.unwrap();
    match sig {
        TimerSignal::Tick { remaining, room_id, .. } => {
            assert_eq!(room_id, ROOM);
            assert_eq!(remaining, 10);
        }
        other => panic!("expected tick, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_countdown_expires_exactly_once() {
    let registry = TimerRegistry::new();
    let (tx, mut rx) = channel();

    registry.start(ROOM, Duration::from_secs(3), &tx);

    let mut ticks: Vec<u32> = Vec::new();
    let mut expired = 0;
    // Everything fires within 3 seconds; wait past the deadline.
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    while let Ok(sig) = rx.try_recv() {
        match sig {
            TimerSignal::Tick { remaining, .. } => ticks.push(remaining),
            TimerSignal::Expired { room_id, .. } => {
                assert_eq!(room_id, ROOM);
                expired += 1;
            }
        }
    }

    assert_eq!(expired, 1, "expiry must fire exactly once");
    assert!(!ticks.is_empty());
    // Ticks count down monotonically.
    for pair in ticks.windows(2) {
        assert!(pair[0] >= pair[1], "ticks must not increase: {ticks:?}");
    }
    // The timer deregistered itself on expiry.
    assert_eq!(registry.remaining(ROOM), None);
    assert_eq!(registry.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_is_recomputed_from_wall_clock() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();

    registry.start(ROOM, Duration::from_secs(90), &tx);
    tokio::time::sleep(Duration::from_secs(30)).await;

    let remaining = registry.remaining(ROOM).unwrap();
    assert!(
        (59..=61).contains(&remaining),
        "expected ~60s remaining, got {remaining}"
    );
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_preserves_remaining_across_wall_clock_time() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();

    registry.start(ROOM, Duration::from_secs(90), &tx);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(registry.pause(ROOM));
    let frozen = registry.remaining(ROOM).unwrap();
    assert!((59..=61).contains(&frozen), "frozen at {frozen}");

    // Wall-clock time passes while paused; the countdown must not move.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(registry.remaining(ROOM), Some(frozen));

    assert!(registry.resume(ROOM));
    let resumed = registry.remaining(ROOM).unwrap();
    assert!(
        resumed >= frozen.saturating_sub(1) && resumed <= frozen + 1,
        "resume must restart from the frozen value: {frozen} -> {resumed}"
    );

    // And it counts down again after resuming.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let later = registry.remaining(ROOM).unwrap();
    assert!(later < frozen, "countdown stalled after resume");
}

#[tokio::test(start_paused = true)]
async fn test_paused_timer_never_expires() {
    let registry = TimerRegistry::new();
    let (tx, mut rx) = channel();

    registry.start(ROOM, Duration::from_secs(5), &tx);
    assert!(registry.pause(ROOM));

    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;

    let mut expired = false;
    while let Ok(sig) = rx.try_recv() {
        if let TimerSignal::Expired { generation, .. } = sig {
            // Only a live-generation expiry counts.
            expired = registry.is_current(ROOM, generation);
        }
    }
    assert!(!expired, "paused timer must not expire");
    assert_eq!(registry.remaining(ROOM), Some(5));
}

#[tokio::test(start_paused = true)]
async fn test_pause_twice_is_noop() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();

    registry.start(ROOM, Duration::from_secs(30), &tx);
    assert!(registry.pause(ROOM));
    assert!(!registry.pause(ROOM), "second pause must be a no-op");
}

#[tokio::test(start_paused = true)]
async fn test_resume_without_pause_is_noop() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();

    registry.start(ROOM, Duration::from_secs(30), &tx);
    assert!(!registry.resume(ROOM), "resume on a running timer is a no-op");
    assert!(!registry.resume(RoomId(99)), "resume on an absent room is a no-op");
}

// =========================================================================
// Stop and replacement
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_without_timer_is_noop() {
    let registry = TimerRegistry::new();
    assert!(!registry.stop(ROOM));
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_expiry() {
    let registry = TimerRegistry::new();
    let (tx, mut rx) = channel();

    registry.start(ROOM, Duration::from_secs(2), &tx);
    assert!(registry.stop(ROOM));

    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    while let Ok(sig) = rx.try_recv() {
        assert!(
            !matches!(sig, TimerSignal::Expired { .. }),
            "stopped timer must not expire"
        );
    }
    assert_eq!(registry.remaining(ROOM), None);
}

#[tokio::test(start_paused = true)]
async fn test_start_replaces_existing_timer() {
    let registry = TimerRegistry::new();
    let (tx, mut rx) = channel();

    let gen1 = registry.start(ROOM, Duration::from_secs(100), &tx);
    let gen2 = registry.start(ROOM, Duration::from_secs(5), &tx);

    assert_ne!(gen1, gen2);
    assert!(!registry.is_current(ROOM, gen1));
    assert!(registry.is_current(ROOM, gen2));
    assert_eq!(registry.remaining(ROOM), Some(5));
    assert_eq!(registry.active_count(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    // The only expiry comes from the replacement timer.
    let mut expiries = Vec::new();
    while let Ok(sig) = rx.try_recv() {
        if let TimerSignal::Expired { generation, .. } = sig {
            expiries.push(generation);
        }
    }
    assert_eq!(expiries, vec![gen2]);
}

#[tokio::test(start_paused = true)]
async fn test_rooms_are_independent() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();
    let other = RoomId(2);

    registry.start(ROOM, Duration::from_secs(50), &tx);
    registry.start(other, Duration::from_secs(20), &tx);

    assert!(registry.pause(ROOM));
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Pausing one room never touches its sibling.
    assert_eq!(registry.remaining(ROOM), Some(50));
    let sibling = registry.remaining(other).unwrap();
    assert!((9..=11).contains(&sibling), "sibling kept counting: {sibling}");
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_reflects_pause_state() {
    let registry = TimerRegistry::new();
    let (tx, _rx) = channel();

    registry.start(ROOM, Duration::from_secs(40), &tx);
    let snap = registry.snapshot(ROOM).unwrap();
    assert!(!snap.is_paused());
    assert_eq!(snap.duration(), Duration::from_secs(40));
    assert!(snap.paused_at().is_none());

    registry.pause(ROOM);
    let snap = registry.snapshot(ROOM).unwrap();
    assert!(snap.is_paused());
    assert!(snap.paused_at().is_some());
}

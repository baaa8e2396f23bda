//! Deterministic drawer rotation.

use scrawl_protocol::{Participant, PlayerId};

/// Pick the next drawer: round-robin in join order over connected,
/// non-spectator participants.
///
/// A disconnected participant is skipped but keeps their slot — they
/// re-enter the rotation at the same position once reconnected. The
/// previous drawer never draws twice in a row unless they are the only
/// eligible participant. When the previous drawer is no longer in the
/// list at all, rotation restarts from an offset derived from the round
/// number so repeated calls stay deterministic.
///
/// Returns `None` when nobody is eligible.
pub fn next_drawer(
    participants: &[Participant],
    previous: Option<PlayerId>,
    round: u32,
) -> Option<PlayerId> {
    if participants.is_empty() {
        return None;
    }
    let len = participants.len();
    let start = match previous.and_then(|p| participants.iter().position(|x| x.player_id == p)) {
        Some(idx) => idx + 1,
        None => (round.saturating_sub(1) as usize) % len,
    };

    for offset in 0..len {
        let candidate = &participants[(start + offset) % len];
        if candidate.can_draw() && Some(candidate.player_id) != previous {
            return Some(candidate.player_id);
        }
    }

    // Everyone else is ineligible; the previous drawer may repeat if
    // they can still draw.
    participants
        .iter()
        .find(|p| p.can_draw())
        .map(|p| p.player_id)
}

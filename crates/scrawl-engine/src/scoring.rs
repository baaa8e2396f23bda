//! Pure scoring policy: guess points, drawer bonus, final ranking,
//! guess normalization.

use scrawl_protocol::{PlayerId, RankedPlayer};

use crate::session::ScoreLedger;

/// Points for a correct guess at the instant the phase starts.
pub const MAX_GUESS_POINTS: u32 = 100;
/// Guaranteed floor for any correct guess, however late.
pub const MIN_GUESS_POINTS: u32 = 10;
/// Fixed bonus credited to the drawer, once per round, when anyone
/// guesses their word.
pub const DRAWER_BONUS: u32 = 25;

/// Points for a correct guess with `time_remaining` seconds left of a
/// `phase_duration`-second guessing phase.
///
/// Linear decay from [`MAX_GUESS_POINTS`] to [`MIN_GUESS_POINTS`]:
/// monotonically non-increasing in elapsed time, never below the floor.
pub fn guess_score(time_remaining: u32, phase_duration: u32) -> u32 {
    if phase_duration == 0 {
        return MIN_GUESS_POINTS;
    }
    let remaining = u64::from(time_remaining.min(phase_duration));
    let span = u64::from(MAX_GUESS_POINTS - MIN_GUESS_POINTS);
    MIN_GUESS_POINTS + ((span * remaining) / u64::from(phase_duration)) as u32
}

/// Final ranking: 1-based, contiguous, no shared ranks.
///
/// Order: higher score first; equal scores go to whoever reached their
/// score earlier (lower gain sequence in the ledger); players who never
/// scored tie-break by player id for full determinism.
pub fn final_ranking(ledger: &ScoreLedger) -> Vec<RankedPlayer> {
    let mut rows: Vec<(PlayerId, u32, u64)> = ledger
        .entries()
        .map(|(player, score)| (player, score, ledger.gain_seq(player).unwrap_or(u64::MAX)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));
    rows.into_iter()
        .enumerate()
        .map(|(i, (player_id, score, _))| RankedPlayer {
            player_id,
            score,
            rank: i as u32 + 1,
        })
        .collect()
}

/// Fold a guess for comparison: trim, lowercase, strip Latin diacritics.
/// "GÁTO " and "gato" compare equal.
pub fn normalize_guess(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_diacritic)
        .collect()
}

fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_decays_monotonically() {
        assert!(guess_score(80, 90) > guess_score(10, 90));
        let mut prev = u32::MAX;
        for remaining in (0..=90).rev() {
            let s = guess_score(remaining, 90);
            assert!(s <= prev, "score increased as time ran out");
            prev = s;
        }
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(guess_score(90, 90), MAX_GUESS_POINTS);
        assert_eq!(guess_score(0, 90), MIN_GUESS_POINTS);
        // Remaining clamped to the phase duration.
        assert_eq!(guess_score(500, 90), MAX_GUESS_POINTS);
    }

    #[test]
    fn test_score_floor_for_degenerate_duration() {
        assert_eq!(guess_score(10, 0), MIN_GUESS_POINTS);
    }

    #[test]
    fn test_ranking_is_contiguous_and_unique() {
        let mut ledger = ScoreLedger::default();
        ledger.reset_for([PlayerId(1), PlayerId(2), PlayerId(3)]);
        ledger.credit(PlayerId(2), 120);
        ledger.credit(PlayerId(1), 95);

        let ranking = final_ranking(&ledger);
        assert_eq!(ranking.len(), 3);
        let ranks: Vec<u32> = ranking.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(ranking[0].player_id, PlayerId(2));
        assert_eq!(ranking[1].player_id, PlayerId(1));
        assert_eq!(ranking[2].player_id, PlayerId(3));
    }

    #[test]
    fn test_ranking_tie_goes_to_earlier_scorer() {
        let mut ledger = ScoreLedger::default();
        ledger.reset_for([PlayerId(1), PlayerId(2)]);
        ledger.credit(PlayerId(2), 100);
        ledger.credit(PlayerId(1), 100);

        let ranking = final_ranking(&ledger);
        // P2 reached 100 first, so P2 takes rank 1 despite equal scores.
        assert_eq!(ranking[0].player_id, PlayerId(2));
        assert_eq!(ranking[0].rank, 1);
        assert_eq!(ranking[1].player_id, PlayerId(1));
        assert_eq!(ranking[1].rank, 2);
    }

    #[test]
    fn test_ranking_never_scored_tie_breaks_by_id() {
        let mut ledger = ScoreLedger::default();
        ledger.reset_for([PlayerId(3), PlayerId(1), PlayerId(2)]);

        let ranking = final_ranking(&ledger);
        let ids: Vec<PlayerId> = ranking.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_normalize_case_insensitive() {
        assert_eq!(normalize_guess("GATO"), normalize_guess("gato"));
    }

    #[test]
    fn test_normalize_diacritic_insensitive() {
        assert_eq!(normalize_guess("gáto"), "gato");
        assert_eq!(normalize_guess("CAFÉ"), "cafe");
        assert_eq!(normalize_guess("año"), "ano");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_guess("  gato \n"), "gato");
    }

    #[test]
    fn test_normalize_distinct_words_stay_distinct() {
        assert_ne!(normalize_guess("gato"), normalize_guess("pato"));
    }
}

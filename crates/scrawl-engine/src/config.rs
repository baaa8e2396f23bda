//! Engine configuration: phase durations, round counts, word options.

use std::time::Duration;

use scrawl_protocol::Difficulty;
use tracing::warn;

/// Full configuration for a game.
///
/// One `GameConfig` is shared by every room an engine hosts; per-room
/// variation (categories, difficulty) is a deployment concern, so a
/// deployment wanting different settings per room runs one engine per
/// settings profile.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Minimum ready, connected, non-spectator players to start.
    pub min_players: usize,
    /// Rounds per game; every round gives one participant the drawer role.
    pub total_rounds: u32,
    /// Words offered to the drawer each round.
    pub word_option_count: usize,

    /// Pre-game countdown after the host starts (seconds).
    pub starting_secs: u32,
    /// Time the drawer has to pick a word (seconds).
    pub selection_secs: u32,
    /// Time the drawer has to draw (seconds).
    pub drawing_secs: u32,
    /// Time the guessers have (seconds).
    pub guessing_secs: u32,
    /// Round-results display time before the next round (seconds).
    pub round_end_secs: u32,
    /// Final-results display time (seconds).
    pub game_end_secs: u32,

    /// Hard cap on one advisory drawing evaluation.
    pub ai_eval_timeout: Duration,

    /// Preferred word-bank categories; empty means the generic pool.
    pub categories: Vec<String>,
    pub difficulty: Difficulty,
    /// Used when the selection timer expires and no options exist.
    pub fallback_word: String,
    /// Category reported to the leaderboard with each result.
    pub leaderboard_category: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            total_rounds: 3,
            word_option_count: 3,
            starting_secs: 3,
            selection_secs: 15,
            drawing_secs: 60,
            guessing_secs: 90,
            round_end_secs: 8,
            game_end_secs: 30,
            ai_eval_timeout: Duration::from_secs(5),
            categories: Vec::new(),
            difficulty: Difficulty::Medium,
            fallback_word: "sol".to_string(),
            leaderboard_category: "general".to_string(),
        }
    }
}

impl GameConfig {
    /// Clamp out-of-range values so the config is safe to use.
    /// Called automatically by the engine on construction.
    pub fn validated(mut self) -> Self {
        if self.min_players < 2 {
            warn!(min_players = self.min_players, "min_players below 2 — clamping");
            self.min_players = 2;
        }
        if self.total_rounds == 0 {
            warn!("total_rounds of 0 — clamping to 1");
            self.total_rounds = 1;
        }
        if self.word_option_count == 0 {
            self.word_option_count = 1;
        }
        for secs in [
            &mut self.starting_secs,
            &mut self.selection_secs,
            &mut self.drawing_secs,
            &mut self.guessing_secs,
            &mut self.round_end_secs,
            &mut self.game_end_secs,
        ] {
            if *secs == 0 {
                *secs = 1;
            }
        }
        if self.fallback_word.trim().is_empty() {
            self.fallback_word = "sol".to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_already_valid() {
        let cfg = GameConfig::default();
        let validated = cfg.clone().validated();
        assert_eq!(cfg.min_players, validated.min_players);
        assert_eq!(cfg.total_rounds, validated.total_rounds);
    }

    #[test]
    fn test_validated_clamps_degenerate_values() {
        let cfg = GameConfig {
            min_players: 0,
            total_rounds: 0,
            word_option_count: 0,
            guessing_secs: 0,
            fallback_word: "  ".into(),
            ..GameConfig::default()
        }
        .validated();
        assert_eq!(cfg.min_players, 2);
        assert_eq!(cfg.total_rounds, 1);
        assert_eq!(cfg.word_option_count, 1);
        assert_eq!(cfg.guessing_secs, 1);
        assert!(!cfg.fallback_word.trim().is_empty());
    }
}

//! The game state machine.
//!
//! [`GameMachine::process_event`] is the sole entry point for changing
//! a room's state: it loads the session, looks the (phase, event) pair
//! up in the transition table, authorizes the actor, runs the rule's
//! action, persists, and notifies — one atomic logical step per event.
//! Callers (the per-room workers in [`crate::engine`]) guarantee the
//! per-room serialization; the machine itself is stateless apart from
//! the timer registry and safe to share across rooms.

use std::time::Duration;

use rand::Rng;
use scrawl_protocol::{
    EventKind, GameEvent, GamePhase, Notification, Participant, ParticipantRole, RankedPlayer,
    Recipient, RoomId,
};
use scrawl_timer::{SignalSender, TimerRegistry};
use tracing::{debug, error, info, warn};

use crate::config::GameConfig;
use crate::error::{GameError, ValidationError};
use crate::ports::Collaborators;
use crate::rotation;
use crate::scoring;
use crate::session::{unix_ms, AiEvaluation, DrawingRecord, GameSession, GuessRecord, SessionErrorDetail};
use crate::table::{self, Action, Target};

/// Error code stored and broadcast when an action fails internally.
const INTERNAL_ERROR_CODE: &str = "INTERNAL";
/// What players see when a room errors; detail stays in the session.
const GENERIC_ERROR_NOTICE: &str = "the game hit an error and must be reset";

/// The result of one fully processed event (internal follow-ups, like
/// the forced phase end after a correct guess, are already applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcome {
    pub phase: GamePhase,
    pub round: u32,
}

/// What one table action produced.
struct ActionOutput {
    notices: Vec<(Recipient, Notification)>,
    /// An event the machine must process next, inside the same
    /// serialized step.
    follow_up: Option<GameEvent>,
}

impl ActionOutput {
    fn new(notices: Vec<(Recipient, Notification)>) -> Self {
        Self {
            notices,
            follow_up: None,
        }
    }
}

struct Applied {
    outcome: EventOutcome,
    follow_up: Option<GameEvent>,
}

pub struct GameMachine {
    config: GameConfig,
    ports: Collaborators,
    timers: TimerRegistry,
}

impl GameMachine {
    pub fn new(config: GameConfig, ports: Collaborators) -> Self {
        Self {
            config: config.validated(),
            ports,
            timers: TimerRegistry::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Timer access is deliberately crate-internal: every start, stop,
    /// pause, and resume must happen inside a room's serialized step.
    pub(crate) fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Process one event for a room, including any internal follow-up it
    /// forces. Must be called from the room's serialized task.
    pub async fn process_event(
        &self,
        room_id: RoomId,
        event: GameEvent,
        signals: &SignalSender,
    ) -> Result<EventOutcome, GameError> {
        let mut applied = self.apply(room_id, event, signals).await?;
        while let Some(follow_up) = applied.follow_up.take() {
            applied = self.apply(room_id, follow_up, signals).await?;
        }
        Ok(applied.outcome)
    }

    /// Broadcast a countdown tick. Called by the room worker for live
    /// tick signals; never touches the session.
    pub(crate) async fn broadcast_tick(&self, room_id: RoomId, remaining: u32) {
        self.ports
            .transport
            .broadcast_to_room(room_id, Notification::TimerTick { remaining })
            .await;
    }

    async fn apply(
        &self,
        room_id: RoomId,
        event: GameEvent,
        signals: &SignalSender,
    ) -> Result<Applied, GameError> {
        let kind = event.kind();

        let mut session = match self
            .ports
            .store
            .load_session(room_id)
            .await
            .map_err(|source| GameError::Collaborator {
                context: "load_session",
                source,
            })? {
            Some(s) => s,
            // The first StartGame creates the room's session.
            None if kind == EventKind::StartGame => {
                GameSession::new(room_id, self.config.total_rounds)
            }
            None => return Err(GameError::NoSession(room_id)),
        };

        let rule = table::lookup(session.phase, kind).ok_or(GameError::TransitionNotAllowed {
            phase: session.phase,
            event: kind,
        })?;

        // Advancing past the final round redirects to the end-game rule.
        let rule = if rule.action == Action::AdvanceRound
            && session.current_round >= session.total_rounds
        {
            table::lookup(session.phase, EventKind::EndGame)
                .ok_or_else(|| GameError::Internal("end-game rule missing from table".into()))?
        } else {
            rule
        };

        authorize(&session, &event)?;

        // Resolve the target phase before the action runs: `Resume`
        // clears `previous_phase` as part of its work.
        let old_phase = session.phase;
        let next_phase = match rule.to {
            Target::Phase(p) => p,
            Target::Previous => session.previous_phase.ok_or_else(|| {
                GameError::Internal("resume without a recorded previous phase".into())
            })?,
        };

        let output = match self
            .run_action(rule.action, room_id, &mut session, &event, signals)
            .await
        {
            Ok(output) => output,
            Err(err) if err.is_rejection() => return Err(err),
            Err(err) => {
                self.force_error(room_id, &mut session, &err).await;
                return Err(err);
            }
        };

        session.phase = next_phase;
        if let Some(remaining) = self.timers.remaining(room_id) {
            session.time_remaining = remaining;
        }
        session.touch();

        if let Err(source) = self.ports.store.save_session(&session).await {
            let err = GameError::Internal(format!("failed to persist session: {source}"));
            self.force_error(room_id, &mut session, &err).await;
            return Err(err);
        }

        info!(
            %room_id,
            from = %old_phase,
            to = %next_phase,
            event = ?kind,
            round = session.current_round,
            "transition applied"
        );

        let mut notices = Vec::with_capacity(output.notices.len() + 1);
        if next_phase != old_phase {
            notices.push((
                Recipient::All,
                Notification::StateChanged {
                    view: session.view(),
                },
            ));
        }
        notices.extend(output.notices);
        self.dispatch(room_id, notices).await;

        Ok(Applied {
            outcome: EventOutcome {
                phase: next_phase,
                round: session.current_round,
            },
            follow_up: output.follow_up,
        })
    }

    async fn run_action(
        &self,
        action: Action,
        room_id: RoomId,
        session: &mut GameSession,
        event: &GameEvent,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        match action {
            Action::BeginCountdown => self.begin_countdown(room_id, session, signals).await,
            Action::OpenSelection => {
                let notices = self.enter_word_selection(room_id, session, signals).await?;
                Ok(ActionOutput::new(notices))
            }
            Action::ConfirmWord => self.confirm_word(room_id, session, event, signals),
            Action::AutoSelectWord => self.auto_select_word(room_id, session, signals),
            Action::AcceptDrawing => self.accept_drawing(room_id, session, event, signals),
            Action::TimeoutDrawing => self.timeout_drawing(room_id, session, signals),
            Action::RecordGuess => self.record_guess(room_id, session, event),
            Action::CloseGuessing => self.close_guessing(room_id, session, signals).await,
            Action::AdvanceRound => self.advance_round(room_id, session, signals).await,
            Action::FinishGame => self.finish_game(room_id, session, signals).await,
            Action::Pause => self.pause_game(room_id, session),
            Action::Resume => self.resume_game(room_id, session, signals),
            Action::Reset => self.reset_game(room_id, session),
            Action::RecordError => self.record_error(room_id, session, event),
        }
    }

    // -- Actions ----------------------------------------------------------

    async fn begin_countdown(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let participants = self
            .ports
            .membership
            .participants(room_id)
            .await
            .map_err(|source| GameError::Collaborator {
                context: "readiness check",
                source,
            })?;

        let ready: Vec<&Participant> = participants
            .iter()
            .filter(|p| p.connected && p.ready && p.role != ParticipantRole::Spectator)
            .collect();
        if ready.len() < self.config.min_players {
            return Err(ValidationError::NotEnoughPlayers {
                ready: ready.len(),
                required: self.config.min_players,
            }
            .into());
        }

        session.total_rounds = self.config.total_rounds;
        session.current_round = 1;
        session.current_drawer = None;
        session.current_word = None;
        session.word_options.clear();
        session.drawings.clear();
        session.guesses.clear();
        session.drawer_bonus_round = None;
        session.previous_phase = None;
        session.error = None;
        session.last_ai_evaluation = None;
        session.ended_at = None;
        session.started_at = Some(unix_ms());
        session
            .scores
            .reset_for(ready.iter().map(|p| p.player_id));

        self.start_phase_timer(room_id, self.config.starting_secs, signals);
        info!(%room_id, players = ready.len(), "game starting");
        Ok(ActionOutput::new(Vec::new()))
    }

    /// Shared by `OpenSelection` (first round) and `AdvanceRound`:
    /// rotate the drawer, fetch word options, start the selection timer.
    async fn enter_word_selection(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<Vec<(Recipient, Notification)>, GameError> {
        let participants = self
            .ports
            .membership
            .participants(room_id)
            .await
            .map_err(|source| {
                GameError::Internal(format!("membership unavailable mid-game: {source}"))
            })?;

        let drawer =
            rotation::next_drawer(&participants, session.current_drawer, session.current_round)
                .ok_or_else(|| GameError::Internal("no eligible drawer in room".into()))?;
        let options = self.fetch_word_options().await?;

        session.current_drawer = Some(drawer);
        session.current_word = None;
        session.word_options = options.clone();

        self.start_phase_timer(room_id, self.config.selection_secs, signals);
        info!(%room_id, %drawer, round = session.current_round, "word selection opened");
        Ok(vec![(
            Recipient::Player(drawer),
            Notification::WordOptions { options },
        )])
    }

    /// Preferred categories first, generic pool second. Total inability
    /// to obtain any options is the one mandatory-dependency failure
    /// that forces the error phase.
    async fn fetch_word_options(&self) -> Result<Vec<String>, GameError> {
        let count = self.config.word_option_count;
        if !self.config.categories.is_empty() {
            match self
                .ports
                .word_bank
                .word_options(&self.config.categories, self.config.difficulty, count)
                .await
            {
                Ok(words) if !words.is_empty() => return Ok(truncate(words, count)),
                Ok(_) => debug!("preferred categories returned no words, trying generic pool"),
                Err(err) => warn!(%err, "word bank failed for preferred categories"),
            }
        }
        match self
            .ports
            .word_bank
            .word_options(&[], self.config.difficulty, count)
            .await
        {
            Ok(words) if !words.is_empty() => Ok(truncate(words, count)),
            Ok(_) => Err(GameError::Internal("word bank returned no options".into())),
            Err(err) => Err(GameError::Internal(format!("word bank unavailable: {err}"))),
        }
    }

    fn confirm_word(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        event: &GameEvent,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let GameEvent::SelectWord { word, .. } = event else {
            return Err(GameError::Internal("confirm_word on wrong event".into()));
        };
        if !session.word_options.iter().any(|w| w == word) {
            return Err(ValidationError::WordNotOffered.into());
        }
        self.assign_word(room_id, session, word.clone(), false, signals)
    }

    fn auto_select_word(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let word = if session.word_options.is_empty() {
            self.config.fallback_word.clone()
        } else {
            let idx = rand::rng().random_range(0..session.word_options.len());
            session.word_options[idx].clone()
        };
        debug!(%room_id, "selection timed out, word auto-selected");
        self.assign_word(room_id, session, word, true, signals)
    }

    fn assign_word(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        word: String,
        auto_selected: bool,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let drawer = session
            .current_drawer
            .ok_or_else(|| GameError::Internal("word assigned without a drawer".into()))?;
        let length = word.chars().count();
        session.current_word = Some(word.clone());
        session.word_options.clear();

        self.start_phase_timer(room_id, self.config.drawing_secs, signals);
        Ok(ActionOutput::new(vec![
            (
                Recipient::Player(drawer),
                Notification::WordAssigned {
                    word,
                    auto_selected,
                },
            ),
            (Recipient::All, Notification::WordMasked { length }),
        ]))
    }

    fn accept_drawing(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        event: &GameEvent,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let GameEvent::SubmitDrawing { image_ref, .. } = event else {
            return Err(GameError::Internal("accept_drawing on wrong event".into()));
        };
        validate_image_ref(image_ref)?;
        self.store_drawing(room_id, session, Some(image_ref.clone()), signals)
    }

    fn timeout_drawing(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        debug!(%room_id, "drawing timed out, recording blank submission");
        self.store_drawing(room_id, session, None, signals)
    }

    fn store_drawing(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        image_ref: Option<String>,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let drawer = session
            .current_drawer
            .ok_or_else(|| GameError::Internal("drawing phase without a drawer".into()))?;
        let word = session
            .current_word
            .clone()
            .ok_or_else(|| GameError::Internal("drawing phase without a word".into()))?;
        let round = session.current_round;
        session.drawings.push(DrawingRecord {
            player_id: drawer,
            image_ref: image_ref.clone(),
            word,
            round,
        });

        self.start_phase_timer(room_id, self.config.guessing_secs, signals);
        Ok(ActionOutput::new(vec![(
            Recipient::All,
            Notification::DrawingSubmitted {
                drawer,
                image_ref,
                round,
            },
        )]))
    }

    fn record_guess(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        event: &GameEvent,
    ) -> Result<ActionOutput, GameError> {
        let GameEvent::SubmitGuess { actor, text } = event else {
            return Err(GameError::Internal("record_guess on wrong event".into()));
        };
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyGuess.into());
        }
        let word = session
            .current_word
            .clone()
            .ok_or_else(|| GameError::Internal("guessing phase without a word".into()))?;

        let correct = scoring::normalize_guess(text) == scoring::normalize_guess(&word);
        if !correct {
            session.guesses.push(GuessRecord {
                player_id: *actor,
                text: text.clone(),
                correct: false,
                score: 0,
            });
            return Ok(ActionOutput::new(vec![(
                Recipient::Player(*actor),
                Notification::GuessResult {
                    correct: false,
                    score: 0,
                },
            )]));
        }

        // No registry entry means the countdown already ran out and this
        // guess merely beat the expiry signal into the queue: floor points.
        let remaining = self.timers.remaining(room_id).unwrap_or(0);
        let points = scoring::guess_score(remaining, self.config.guessing_secs);
        session.scores.credit(*actor, points);
        if session.drawer_bonus_round != Some(session.current_round) {
            if let Some(drawer) = session.current_drawer {
                session.scores.credit(drawer, scoring::DRAWER_BONUS);
                session.drawer_bonus_round = Some(session.current_round);
            }
        }
        session.guesses.push(GuessRecord {
            player_id: *actor,
            text: text.clone(),
            correct: true,
            score: points,
        });
        info!(%room_id, guesser = %actor, points, "correct guess");

        let mut output = ActionOutput::new(vec![
            (
                Recipient::Player(*actor),
                Notification::GuessResult {
                    correct: true,
                    score: points,
                },
            ),
            (
                Recipient::All,
                Notification::ScoreUpdate {
                    scores: session.scores.snapshot(),
                },
            ),
        ]);
        // First correct guess ends the phase, inside this same
        // serialized step — the real expiry that may race us is then
        // rejected as stale.
        output.follow_up = Some(GameEvent::TimerEnd);
        Ok(output)
    }

    async fn close_guessing(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        session.last_ai_evaluation = self.evaluate_last_drawing(session).await;

        self.start_phase_timer(room_id, self.config.round_end_secs, signals);
        Ok(ActionOutput::new(vec![(
            Recipient::All,
            Notification::RoundEnded {
                round: session.current_round,
                word: session.current_word.clone(),
                scores: session.scores.snapshot(),
            },
        )]))
    }

    /// Best-effort advisory evaluation. Never errors, never blocks the
    /// transition past its configured timeout.
    async fn evaluate_last_drawing(&self, session: &GameSession) -> Option<AiEvaluation> {
        let evaluator = self.ports.evaluator.as_ref()?;
        let record = session
            .drawings
            .iter()
            .rev()
            .find(|d| d.round == session.current_round)?;
        let Some(image_ref) = &record.image_ref else {
            return Some(AiEvaluation::unavailable("no drawing was submitted"));
        };

        match tokio::time::timeout(
            self.config.ai_eval_timeout,
            evaluator.evaluate_drawing(image_ref, &record.word),
        )
        .await
        {
            Ok(Ok(evaluation)) => Some(evaluation),
            Ok(Err(err)) => {
                warn!(%err, "drawing evaluation failed");
                Some(AiEvaluation::unavailable(format!("evaluation failed: {err}")))
            }
            Err(_) => {
                warn!("drawing evaluation timed out");
                Some(AiEvaluation::unavailable("evaluation timed out"))
            }
        }
    }

    async fn advance_round(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        session.current_round += 1;
        session.current_word = None;
        session.word_options.clear();
        session.last_ai_evaluation = None;
        let notices = self.enter_word_selection(room_id, session, signals).await?;
        Ok(ActionOutput::new(notices))
    }

    async fn finish_game(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        let rankings = scoring::final_ranking(&session.scores);
        let winner = rankings.first().map(|r| r.player_id);
        session.current_word = None;
        session.word_options.clear();
        session.ended_at = Some(unix_ms());

        self.report_results(room_id, &rankings).await;

        self.start_phase_timer(room_id, self.config.game_end_secs, signals);
        info!(%room_id, winner = ?winner, "game finished");
        Ok(ActionOutput::new(vec![(
            Recipient::All,
            Notification::GameEnded { rankings, winner },
        )]))
    }

    /// Report each player's result to the leaderboard. Independent
    /// best-effort calls: one failure never aborts the others.
    async fn report_results(&self, room_id: RoomId, rankings: &[RankedPlayer]) {
        let names: Vec<Participant> = match self.ports.membership.participants(room_id).await {
            Ok(p) => p,
            Err(err) => {
                warn!(%room_id, %err, "membership lookup failed, reporting without names");
                Vec::new()
            }
        };
        for row in rankings {
            let name = names
                .iter()
                .find(|p| p.player_id == row.player_id)
                .map(|p| p.display_name.as_str())
                .unwrap_or("");
            if let Err(err) = self
                .ports
                .leaderboard
                .record_game_result(
                    row.player_id,
                    name,
                    row.score,
                    &self.config.leaderboard_category,
                )
                .await
            {
                warn!(%room_id, player = %row.player_id, %err, "leaderboard update failed");
            }
        }
    }

    fn pause_game(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
    ) -> Result<ActionOutput, GameError> {
        session.previous_phase = Some(session.phase);
        self.timers.pause(room_id);
        if let Some(remaining) = self.timers.remaining(room_id) {
            session.time_remaining = remaining;
        }
        info!(%room_id, remaining = session.time_remaining, "game paused");
        Ok(ActionOutput::new(Vec::new()))
    }

    fn resume_game(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        signals: &SignalSender,
    ) -> Result<ActionOutput, GameError> {
        session.previous_phase = None;
        if !self.timers.resume(room_id) {
            // Pause and resume were separated by a process restart:
            // rebuild the countdown from the persisted remaining time.
            if session.time_remaining > 0 {
                self.start_phase_timer(room_id, session.time_remaining, signals);
            }
        }
        info!(%room_id, "game resumed");
        Ok(ActionOutput::new(Vec::new()))
    }

    fn reset_game(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
    ) -> Result<ActionOutput, GameError> {
        self.timers.stop(room_id);
        session.reset();
        info!(%room_id, "game reset");
        Ok(ActionOutput::new(vec![(
            Recipient::All,
            Notification::GameReset,
        )]))
    }

    fn record_error(
        &self,
        room_id: RoomId,
        session: &mut GameSession,
        event: &GameEvent,
    ) -> Result<ActionOutput, GameError> {
        let GameEvent::ErrorOccurred { message, code } = event else {
            return Err(GameError::Internal("record_error on wrong event".into()));
        };
        self.timers.stop(room_id);
        session.time_remaining = 0;
        session.error = Some(SessionErrorDetail {
            message: message.clone(),
            code: code.clone(),
            at: unix_ms(),
        });
        error!(%room_id, code, message, "room entered error phase");
        Ok(ActionOutput::new(vec![(
            Recipient::All,
            Notification::GameError {
                message: GENERIC_ERROR_NOTICE.to_string(),
                code: code.clone(),
            },
        )]))
    }

    /// An action failed hard: stop the timer, record the failure on the
    /// session, persist best-effort, broadcast a generic notice.
    async fn force_error(&self, room_id: RoomId, session: &mut GameSession, err: &GameError) {
        error!(%room_id, %err, "forcing room into error phase");
        self.timers.stop(room_id);
        session.phase = GamePhase::Error;
        session.time_remaining = 0;
        session.error = Some(SessionErrorDetail {
            message: err.to_string(),
            code: INTERNAL_ERROR_CODE.to_string(),
            at: unix_ms(),
        });
        session.touch();
        if let Err(save_err) = self.ports.store.save_session(session).await {
            error!(%room_id, %save_err, "failed to persist error state");
        }
        self.ports
            .transport
            .broadcast_to_room(
                room_id,
                Notification::GameError {
                    message: GENERIC_ERROR_NOTICE.to_string(),
                    code: INTERNAL_ERROR_CODE.to_string(),
                },
            )
            .await;
    }

    // -- Helpers ----------------------------------------------------------

    fn start_phase_timer(&self, room_id: RoomId, secs: u32, signals: &SignalSender) {
        self.timers
            .start(room_id, Duration::from_secs(u64::from(secs)), signals);
    }

    async fn dispatch(&self, room_id: RoomId, notices: Vec<(Recipient, Notification)>) {
        for (recipient, notification) in notices {
            match recipient {
                Recipient::All => {
                    self.ports
                        .transport
                        .broadcast_to_room(room_id, notification)
                        .await;
                }
                Recipient::Player(player_id) => {
                    self.ports
                        .transport
                        .send_to_player(player_id, notification)
                        .await;
                }
            }
        }
    }
}

/// Actor checks per event: the drawer-only and guesser-only rules.
/// Host privilege for start/pause/resume/reset is pre-checked by the
/// membership collaborator upstream.
fn authorize(session: &GameSession, event: &GameEvent) -> Result<(), ValidationError> {
    match event {
        GameEvent::SelectWord { actor, .. } | GameEvent::SubmitDrawing { actor, .. } => {
            if session.current_drawer != Some(*actor) {
                return Err(ValidationError::NotDrawer(*actor));
            }
        }
        GameEvent::SubmitGuess { actor, .. } => {
            if session.current_drawer == Some(*actor) {
                return Err(ValidationError::DrawerCannotGuess(*actor));
            }
        }
        _ => {}
    }
    Ok(())
}

/// A drawing payload must look like an image reference: a data URI, an
/// http(s) URL, or a plain storage key. No whitespace, bounded length.
fn validate_image_ref(image_ref: &str) -> Result<(), ValidationError> {
    const MAX_URI_LEN: usize = 2 * 1024 * 1024;
    if image_ref.is_empty() {
        return Err(ValidationError::MalformedDrawing("empty reference".into()));
    }
    if image_ref.len() > MAX_URI_LEN {
        return Err(ValidationError::MalformedDrawing("reference too large".into()));
    }
    if image_ref.chars().any(char::is_whitespace) {
        return Err(ValidationError::MalformedDrawing(
            "reference contains whitespace".into(),
        ));
    }
    let ok = image_ref.starts_with("data:image/")
        || image_ref.starts_with("http://")
        || image_ref.starts_with("https://")
        || image_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if !ok {
        return Err(ValidationError::MalformedDrawing(
            "not a data URI, URL, or storage key".into(),
        ));
    }
    Ok(())
}

fn truncate(mut words: Vec<String>, count: usize) -> Vec<String> {
    words.truncate(count);
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{PlayerId, RoomId};

    fn session_with_drawer(drawer: u64) -> GameSession {
        let mut s = GameSession::new(RoomId(1), 3);
        s.current_drawer = Some(PlayerId(drawer));
        s
    }

    #[test]
    fn test_authorize_select_word_requires_drawer() {
        let s = session_with_drawer(1);
        let ok = GameEvent::SelectWord {
            actor: PlayerId(1),
            word: "gato".into(),
        };
        let bad = GameEvent::SelectWord {
            actor: PlayerId(2),
            word: "gato".into(),
        };
        assert!(authorize(&s, &ok).is_ok());
        assert_eq!(
            authorize(&s, &bad),
            Err(ValidationError::NotDrawer(PlayerId(2)))
        );
    }

    #[test]
    fn test_authorize_guess_rejects_drawer() {
        let s = session_with_drawer(1);
        let guess = GameEvent::SubmitGuess {
            actor: PlayerId(1),
            text: "gato".into(),
        };
        assert_eq!(
            authorize(&s, &guess),
            Err(ValidationError::DrawerCannotGuess(PlayerId(1)))
        );
    }

    #[test]
    fn test_authorize_ignores_host_events() {
        let s = session_with_drawer(1);
        let ev = GameEvent::PauseGame { actor: PlayerId(9) };
        assert!(authorize(&s, &ev).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guess_that_beats_the_expiry_signal_scores_the_floor() {
        use crate::adapters::MemoryHarness;
        use crate::ports::PersistencePort;

        let room = RoomId(1);
        let harness = MemoryHarness::new();
        harness.roster.set_participants(
            room,
            [1u64, 2, 3]
                .map(|id| Participant {
                    player_id: PlayerId(id),
                    display_name: format!("p{id}"),
                    role: ParticipantRole::Player,
                    connected: true,
                    ready: true,
                })
                .to_vec(),
        );
        let machine = GameMachine::new(
            GameConfig::default(),
            harness.collaborators(&["manzana", "cielo", "rio"]),
        );
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        for event in [
            GameEvent::StartGame { actor: PlayerId(1) },
            GameEvent::TimerEnd,
            GameEvent::SelectWord {
                actor: PlayerId(1),
                word: "manzana".into(),
            },
            GameEvent::SubmitDrawing {
                actor: PlayerId(1),
                image_ref: "drawings/r1.png".into(),
            },
        ] {
            machine.process_event(room, event, &tx).await.unwrap();
        }

        // Let the guessing countdown run out completely; the expired
        // ticker deregisters itself, leaving only its queued signal.
        tokio::time::sleep(Duration::from_secs(91)).await;
        for _ in 0..25 {
            tokio::task::yield_now().await;
        }
        assert!(machine.timers().remaining(room).is_none());

        // The guess is processed before the queued expiry: correct, but
        // only worth the floor, never the stale full-phase value.
        let outcome = machine
            .process_event(
                room,
                GameEvent::SubmitGuess {
                    actor: PlayerId(2),
                    text: "manzana".into(),
                },
                &tx,
            )
            .await
            .unwrap();
        assert_eq!(outcome.phase, GamePhase::RoundEnd);

        let session = harness
            .store
            .load_session(room)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.scores.get(PlayerId(2)), scoring::MIN_GUESS_POINTS);
    }

    #[test]
    fn test_image_ref_validation() {
        assert!(validate_image_ref("data:image/png;base64,iVBORw0KGgo").is_ok());
        assert!(validate_image_ref("https://cdn.example.com/d/1.png").is_ok());
        assert!(validate_image_ref("drawings/room-1/round-2.png").is_ok());
        assert!(validate_image_ref("").is_err());
        assert!(validate_image_ref("has space").is_err());
        assert!(validate_image_ref("emoji-🎨-key").is_err());
    }
}

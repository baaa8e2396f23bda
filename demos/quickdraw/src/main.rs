//! Scripted two-round game in a single room, printed to stdout.
//!
//! Run with `RUST_LOG=scrawl_engine=debug` to watch the transitions.

use std::time::Duration;

use scrawl_engine::adapters::{Delivery, MemoryHarness};
use scrawl_engine::ports::PersistencePort;
use scrawl_engine::{GameConfig, GameEngine, GameError, GameMachine};
use scrawl_protocol::{
    GameEvent, Notification, Participant, ParticipantRole, PlayerId, RoomId,
};
use tracing_subscriber::EnvFilter;

const ROOM: RoomId = RoomId(1);

fn player(id: u64, name: &str, role: ParticipantRole) -> Participant {
    Participant {
        player_id: PlayerId(id),
        display_name: name.into(),
        role,
        connected: true,
        ready: true,
    }
}

#[tokio::main]
async fn main() -> Result<(), GameError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let harness = MemoryHarness::new();
    harness.roster.set_participants(
        ROOM,
        vec![
            player(1, "alice", ParticipantRole::Host),
            player(2, "bruno", ParticipantRole::Player),
            player(3, "cora", ParticipantRole::Player),
        ],
    );

    let config = GameConfig {
        total_rounds: 2,
        starting_secs: 1,
        selection_secs: 2,
        guessing_secs: 3,
        round_end_secs: 2,
        ..GameConfig::default()
    };
    let words = ["manzana", "cielo", "rio", "nube", "tren", "flor"];
    let machine = GameMachine::new(config, harness.collaborators(&words));
    let engine = GameEngine::new(machine);

    let alice = PlayerId(1);
    let bruno = PlayerId(2);

    // Round 1: alice draws, the selection timer is left to auto-pick.
    engine.submit(ROOM, GameEvent::StartGame { actor: alice }).await?;
    tokio::time::sleep(Duration::from_secs(4)).await;
    print_deliveries(&harness);

    let word = harness
        .store
        .load_session(ROOM)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?
        .and_then(|s| s.current_word)
        .ok_or_else(|| GameError::Internal("no word was auto-selected".into()))?;

    engine
        .submit(
            ROOM,
            GameEvent::SubmitDrawing {
                actor: alice,
                image_ref: "demo/round-1.png".into(),
            },
        )
        .await?;
    engine
        .submit(ROOM, GameEvent::SubmitGuess { actor: bruno, text: word })
        .await?;
    print_deliveries(&harness);

    // Round 2: bruno draws and lets the clock run out on the guessers.
    engine.submit(ROOM, GameEvent::NextRound { actor: Some(alice) }).await?;
    engine
        .submit(
            ROOM,
            GameEvent::SelectWord {
                actor: bruno,
                word: current_options(&harness).await?,
            },
        )
        .await?;
    engine
        .submit(
            ROOM,
            GameEvent::SubmitDrawing {
                actor: bruno,
                image_ref: "demo/round-2.png".into(),
            },
        )
        .await?;
    // The guessing timeout ends the round and the results timer then
    // closes the game, no host input needed.
    tokio::time::sleep(Duration::from_secs(6)).await;
    print_deliveries(&harness);

    Ok(())
}

async fn current_options(harness: &MemoryHarness) -> Result<String, GameError> {
    harness
        .store
        .load_session(ROOM)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?
        .and_then(|s| s.word_options.first().cloned())
        .ok_or_else(|| GameError::Internal("no word options offered".into()))
}

fn print_deliveries(harness: &MemoryHarness) {
    for delivery in harness.transport.drain() {
        match delivery {
            Delivery::Broadcast(room, n) => println!("[{room}] {}", describe(&n)),
            Delivery::Direct(player, n) => println!("[-> {player}] {}", describe(&n)),
        }
    }
}

fn describe(n: &Notification) -> String {
    match n {
        Notification::StateChanged { view } => {
            format!("phase={} round={}/{}", view.phase, view.round, view.total_rounds)
        }
        Notification::TimerTick { remaining } => format!("tick {remaining}s"),
        Notification::WordOptions { options } => format!("pick one of {options:?}"),
        Notification::WordAssigned { word, auto_selected } => {
            format!("your word is {word:?} (auto: {auto_selected})")
        }
        Notification::WordMasked { length } => format!("word has {length} letters"),
        Notification::DrawingSubmitted { drawer, image_ref, round } => {
            format!("round {round}: {drawer} submitted {image_ref:?}")
        }
        Notification::GuessResult { correct, score } => {
            format!("guess correct={correct} (+{score})")
        }
        Notification::ScoreUpdate { scores } => format!("scores {scores:?}"),
        Notification::RoundEnded { round, word, .. } => {
            format!("round {round} over, word was {word:?}")
        }
        Notification::GameEnded { rankings, winner } => {
            let table: Vec<String> = rankings
                .iter()
                .map(|r| format!("#{} {} ({} pts)", r.rank, r.player_id, r.score))
                .collect();
            format!("game over, winner {winner:?}: {}", table.join(", "))
        }
        Notification::GameReset => "game reset".into(),
        Notification::GameError { message, code } => format!("error [{code}]: {message}"),
    }
}

// tests/command_dispatch_tests.rs

use std::sync::Arc;
use chrono::{Duration, TimeZone, Utc};

use scorebot_common::models::BotRuntimeState;
use scorebot_common::traits::{BroadcastSink, PredictionLedger};
use scorebot_core::eventbus::RoomBroadcaster;
use scorebot_core::repositories::SqlitePredictionLedger;
use scorebot_core::services::{Action, ActionExecutor, CommandDispatcher, DispatchSettings};
use scorebot_core::test_utils::helpers::{chat_event, setup_test_database};
use scorebot_core::test_utils::{InMemoryPredictionLedger, RecordingMessenger, RecordingSink};
use scorebot_core::Error;

const SCOREBOARD_URL: &str = "http://localhost:3000/ganadores";

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::new(DispatchSettings {
        scoreboard_url: SCOREBOARD_URL.to_string(),
        show_players_room: "dedsafio".to_string(),
        team_cooldown: std::time::Duration::from_millis(60_000),
    })
}

struct Harness {
    dispatcher: CommandDispatcher,
    state: BotRuntimeState,
    ledger: Arc<InMemoryPredictionLedger>,
    messenger: Arc<RecordingMessenger>,
    sink: Arc<RecordingSink>,
    executor: ActionExecutor,
}

impl Harness {
    fn new() -> Self {
        let ledger = Arc::new(InMemoryPredictionLedger::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let sink = Arc::new(RecordingSink::default());
        let executor = ActionExecutor::new(ledger.clone(), messenger.clone(), sink.clone());
        Self {
            dispatcher: dispatcher(),
            state: BotRuntimeState::default(),
            ledger,
            messenger,
            sink,
            executor,
        }
    }

    async fn say(&mut self, chatter: &str, text: &str, badges: &[&str]) -> Vec<Action> {
        let event = chat_event(&format!("id-{chatter}"), chatter, text, badges);
        let actions = self.dispatcher.dispatch(&event, &mut self.state, Utc::now());
        self.executor.execute(actions.clone()).await;
        actions
    }
}

#[tokio::test]
async fn test_repeat_prediction_updates_single_row() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let ledger = Arc::new(SqlitePredictionLedger::new(db.pool().clone()));
    let executor = ActionExecutor::new(
        ledger.clone(),
        Arc::new(RecordingMessenger::default()),
        Arc::new(RecordingSink::default()),
    );
    let dispatcher = dispatcher();
    let mut state = BotRuntimeState {
        tracking_enabled: true,
        ..Default::default()
    };

    for text in ["3-1", "2-0"] {
        let event = chat_event("u1", "alice", text, &[]);
        let actions = dispatcher.dispatch(&event, &mut state, Utc::now());
        executor.execute(actions).await;
    }

    assert_eq!(ledger.prediction_count().await?, 1);
    let row = ledger.find_prediction_by_user("u1").await?.expect("row for u1");
    assert_eq!((row.home_score, row.away_score), (2, 0));
    assert_eq!(row.username, "alice");
    Ok(())
}

#[tokio::test]
async fn test_predictions_ignored_while_tracking_disabled() {
    let mut h = Harness::new();
    let actions = h.say("alice", "3-1", &[]).await;
    assert!(actions.is_empty());
    assert!(h.ledger.predictions().is_empty());

    h.say("mod", "!start", &["moderator"]).await;
    assert!(h.state.tracking_enabled);
    h.say("alice", "3-1", &[]).await;
    assert_eq!(h.ledger.predictions().len(), 1);

    h.say("mod", "!stop", &["moderator"]).await;
    h.say("bob", "1-1", &[]).await;
    assert_eq!(h.ledger.predictions().len(), 1);
    assert_eq!(
        h.messenger.chats(),
        vec!["Started saving predictions", "Stopped saving predictions"]
    );
}

#[tokio::test]
async fn test_unprivileged_start_is_ignored() {
    let mut h = Harness::new();
    let actions = h.say("viewer", "!start", &["subscriber"]).await;

    assert!(actions.is_empty());
    assert!(!h.state.tracking_enabled);
    assert!(h.messenger.chats().is_empty());
}

#[tokio::test]
async fn test_winners_snapshot_whisper_and_replies() {
    let mut h = Harness::new();
    h.state.tracking_enabled = true;
    h.say("alice", "2-0", &[]).await;
    h.say("bob", "2-0", &[]).await;
    h.say("carol", "1-1", &[]).await;

    let actions = h.say("boss", "!winners 2-0", &["moderator"]).await;
    assert_eq!(
        actions,
        vec![
            Action::Reply("Fetching winners".to_string()),
            Action::RecordWinners { home: 2, away: 0 },
            Action::WhisperWinners { to_user_id: "id-boss".to_string() },
            Action::Reply(format!("Winners are in: {SCOREBOARD_URL}")),
        ]
    );

    let winners = h.ledger.winners();
    assert_eq!(winners.len(), 2);
    assert!(winners.iter().all(|w| w.home_score == 2 && w.away_score == 0));

    assert_eq!(
        h.messenger.whispers(),
        vec![("id-boss".to_string(), "Winners: bob,alice".to_string())]
    );
    assert_eq!(
        h.messenger.chats(),
        vec![
            "Fetching winners".to_string(),
            format!("Winners are in: {SCOREBOARD_URL}"),
        ]
    );
}

#[tokio::test]
async fn test_winners_ledger_accumulates_until_cleared() {
    let mut h = Harness::new();
    h.state.tracking_enabled = true;
    h.say("alice", "2-0", &[]).await;
    h.say("bob", "1-0", &[]).await;

    h.say("streamer", "!winners 2-0", &["broadcaster"]).await;
    h.say("streamer", "!winners 1-0", &["broadcaster"]).await;
    assert_eq!(h.ledger.winners().len(), 2);
    let last_whisper = h.messenger.whispers().pop().expect("whisper sent");
    assert_eq!(last_whisper.1, "Winners: bob,alice");

    h.say("streamer", "!clearWinners", &["broadcaster"]).await;
    assert!(h.ledger.winners().is_empty());
}

#[tokio::test]
async fn test_malformed_winners_does_nothing() {
    let mut h = Harness::new();
    for text in ["!winners", "!winners abc", "!winners 2:0"] {
        let actions = h.say("boss", text, &["moderator"]).await;
        assert!(actions.is_empty(), "{text}");
    }
    assert!(h.messenger.chats().is_empty());
    assert!(h.messenger.whispers().is_empty());
}

#[tokio::test]
async fn test_team_cooldown() {
    let dispatcher = dispatcher();
    let mut state = BotRuntimeState::default();
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();

    let event = chat_event("u9", "fan", "!team", &[]);
    let mut emitted = 0;
    for offset in [0, 10, 61] {
        let actions = dispatcher.dispatch(&event, &mut state, t0 + Duration::seconds(offset));
        emitted += actions
            .iter()
            .filter(|a| matches!(a, Action::EmitToRoom { room, event } if room == "dedsafio" && event == "showPlayers"))
            .count();
    }
    assert_eq!(emitted, 2);
    assert_eq!(state.last_team_command_at, Some(t0 + Duration::seconds(61)));
}

#[tokio::test]
async fn test_team_broadcast_reaches_sink() {
    let mut h = Harness::new();
    h.say("fan", "!team\u{200B}", &[]).await;
    assert_eq!(
        h.sink.events(),
        vec![("dedsafio".to_string(), "showPlayers".to_string(), None)]
    );
}

#[tokio::test]
async fn test_simple_replies() {
    let mut h = Harness::new();
    h.say("viewer", "!ping", &[]).await;
    h.say("viewer", "!scoreboard", &[]).await;
    h.say("viewer", "!help", &[]).await;

    let chats = h.messenger.chats();
    assert_eq!(chats[0], "pong");
    assert_eq!(chats[1], format!("The scoreboard is at: {SCOREBOARD_URL}"));
    assert!(chats[2].starts_with("Available commands: "));
}

#[tokio::test]
async fn test_clear_removes_predictions() {
    let mut h = Harness::new();
    h.state.tracking_enabled = true;
    h.say("alice", "2-0", &[]).await;
    h.say("bob", "3-3", &[]).await;

    h.say("streamer", "!clear", &["broadcaster"]).await;
    assert!(h.ledger.predictions().is_empty());
    assert_eq!(h.messenger.chats(), vec!["Clearing predictions"]);
}

#[tokio::test]
async fn test_failed_action_does_not_stop_the_rest() {
    let rooms = RoomBroadcaster::new();
    rooms.shutdown();
    let sink: Arc<dyn BroadcastSink> = Arc::new(rooms);
    let messenger = Arc::new(RecordingMessenger::default());
    let executor = ActionExecutor::new(
        Arc::new(InMemoryPredictionLedger::default()),
        messenger.clone(),
        sink,
    );

    executor
        .execute(vec![
            Action::EmitToRoom {
                room: "dedsafio".to_string(),
                event: "showPlayers".to_string(),
            },
            Action::Reply("still here".to_string()),
        ])
        .await;

    assert_eq!(messenger.chats(), vec!["still here"]);
}

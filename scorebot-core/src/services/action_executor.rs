// File: scorebot-core/src/services/action_executor.rs

use std::sync::Arc;
use tracing::{error, info};

use scorebot_common::models::Prediction;
use scorebot_common::traits::BroadcastSink;
use crate::repositories::PredictionLedger;
use crate::services::commands::Action;
use crate::services::message_sender::Messenger;
use crate::Error;

pub const WINNERS_WHISPER_PREFIX: &str = "Winners: ";

/// `"Winners: a,b,c"` in ledger order.
pub fn winners_whisper_text(winners: &[Prediction]) -> String {
    let names: Vec<&str> = winners.iter().map(|w| w.username.as_str()).collect();
    format!("{}{}", WINNERS_WHISPER_PREFIX, names.join(","))
}

/// Performs dispatcher actions one after another.
pub struct ActionExecutor {
    ledger: Arc<dyn PredictionLedger>,
    messenger: Arc<dyn Messenger>,
    sink: Arc<dyn BroadcastSink>,
}

impl ActionExecutor {
    pub fn new(
        ledger: Arc<dyn PredictionLedger>,
        messenger: Arc<dyn Messenger>,
        sink: Arc<dyn BroadcastSink>,
    ) -> Self {
        Self { ledger, messenger, sink }
    }

    /// Runs every action in order. A failing action is logged and the rest
    /// still run.
    pub async fn execute(&self, actions: Vec<Action>) {
        for action in actions {
            if let Err(e) = self.execute_one(&action).await {
                error!("[Commands] action {:?} failed: {}", action, e);
            }
        }
    }

    pub async fn execute_one(&self, action: &Action) -> Result<(), Error> {
        match action {
            Action::Reply(text) => {
                self.messenger.send_chat_message(text).await;
            }
            Action::UpsertPrediction { user_id, username, home, away } => {
                self.ledger.upsert_prediction(user_id, username, *home, *away).await?;
                info!("[Commands] prediction {}-{} saved for <{}>", home, away, username);
            }
            Action::ClearPredictions => {
                self.ledger.clear_predictions().await?;
            }
            Action::ClearWinners => {
                self.ledger.clear_winner_snapshots().await?;
            }
            Action::RecordWinners { home, away } => {
                let winners = self.ledger.list_predictions_matching(*home, *away).await?;
                for winner in &winners {
                    self.ledger.append_winner_snapshot(winner).await?;
                }
                info!("[Commands] recorded {} winner(s) for {}-{}", winners.len(), home, away);
            }
            Action::WhisperWinners { to_user_id } => {
                let ledger = self.ledger.list_winner_snapshots().await?;
                let text = winners_whisper_text(&ledger);
                self.messenger.send_whisper(&text, to_user_id).await;
            }
            Action::EmitToRoom { room, event } => {
                self.sink.emit_to_room(room, event, None).await?;
            }
        }
        Ok(())
    }
}

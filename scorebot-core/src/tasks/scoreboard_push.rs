// scorebot-core/src/tasks/scoreboard_push.rs

use std::sync::Arc;
use std::time::Duration;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use scorebot_common::traits::BroadcastSink;
use crate::repositories::PredictionLedger;
use crate::Error;

pub const SCOREBOARD_UPDATE_EVENT: &str = "update";
pub const TOP_PREDICTIONS_LIMIT: i64 = 5;

/// `{type, predictions: [{homeScore, awayScore, count}], count}` for `room`.
pub async fn build_scoreboard_update(ledger: &dyn PredictionLedger, room: &str) -> Result<Value, Error> {
    let top = ledger.top_predictions(TOP_PREDICTIONS_LIMIT).await?;
    let count = ledger.prediction_count().await?;

    let predictions: Vec<Value> = top
        .iter()
        .map(|t| {
            json!({
                "homeScore": t.home_score,
                "awayScore": t.away_score,
                "count": t.count,
            })
        })
        .collect();

    Ok(json!({
        "type": room,
        "predictions": predictions,
        "count": count,
    }))
}

pub async fn push_scoreboard_update(
    ledger: &dyn PredictionLedger,
    sink: &dyn BroadcastSink,
    room: &str,
) -> Result<(), Error> {
    let payload = build_scoreboard_update(ledger, room).await?;
    sink.emit_to_room(room, SCOREBOARD_UPDATE_EVENT, Some(payload)).await
}

/// Spawns the bot's recurring task: every `interval`, push the scoreboard to
/// `room`. Runs until the handle is aborted.
pub fn spawn_scoreboard_push_task(
    ledger: Arc<dyn PredictionLedger>,
    sink: Arc<dyn BroadcastSink>,
    room: String,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match push_scoreboard_update(ledger.as_ref(), sink.as_ref(), &room).await {
                Ok(()) => debug!("[Bot] scoreboard update pushed to {}", room),
                Err(e) => warn!("[Bot] scoreboard update for {} failed: {}", room, e),
            }
        }
    })
}

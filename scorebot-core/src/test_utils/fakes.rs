// File: scorebot-core/src/test_utils/fakes.rs
//
// In-memory stand-ins for the bot's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use scorebot_common::models::{Credential, Prediction, ScoreTally};
use scorebot_common::traits::{BroadcastSink, CredentialStore, PredictionLedger};
use crate::services::Messenger;
use crate::Error;

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credential>>,
    saves: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn with(credential: Credential) -> Self {
        Self {
            inner: Mutex::new(Some(credential)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<Credential> {
        self.inner.lock().clone()
    }

    /// Drops the stored record, as if the token file had been deleted.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, Error> {
        Ok(self.inner.lock().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), Error> {
        *self.inner.lock() = Some(credential.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPredictionLedger {
    predictions: Mutex<Vec<Prediction>>,
    winners: Mutex<Vec<Prediction>>,
    next_id: AtomicI64,
}

impl InMemoryPredictionLedger {
    pub fn predictions(&self) -> Vec<Prediction> {
        self.predictions.lock().clone()
    }

    pub fn winners(&self) -> Vec<Prediction> {
        self.winners.lock().clone()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl PredictionLedger for InMemoryPredictionLedger {
    async fn insert_prediction(
        &self,
        user_id: &str,
        username: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<(), Error> {
        let id = self.allocate_id();
        self.predictions.lock().push(Prediction {
            id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            home_score,
            away_score,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn update_prediction(&self, id: i64, home_score: i64, away_score: i64) -> Result<(), Error> {
        let mut rows = self.predictions.lock();
        let row = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("prediction id={id}")))?;
        row.home_score = home_score;
        row.away_score = away_score;
        row.timestamp = Utc::now();
        Ok(())
    }

    async fn find_prediction_by_user(&self, user_id: &str) -> Result<Option<Prediction>, Error> {
        Ok(self.predictions.lock().iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_predictions_matching(&self, home_score: i64, away_score: i64) -> Result<Vec<Prediction>, Error> {
        Ok(self
            .predictions
            .lock()
            .iter()
            .filter(|p| p.home_score == home_score && p.away_score == away_score)
            .cloned()
            .collect())
    }

    async fn clear_predictions(&self) -> Result<(), Error> {
        self.predictions.lock().clear();
        Ok(())
    }

    async fn top_predictions(&self, limit: i64) -> Result<Vec<ScoreTally>, Error> {
        let mut counts: HashMap<(i64, i64), i64> = HashMap::new();
        for p in self.predictions.lock().iter() {
            *counts.entry((p.home_score, p.away_score)).or_default() += 1;
        }
        let mut tallies: Vec<ScoreTally> = counts
            .into_iter()
            .map(|((home_score, away_score), count)| ScoreTally { home_score, away_score, count })
            .collect();
        tallies.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.home_score.cmp(&b.home_score))
                .then(a.away_score.cmp(&b.away_score))
        });
        tallies.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tallies)
    }

    async fn prediction_count(&self) -> Result<i64, Error> {
        Ok(self.predictions.lock().len() as i64)
    }

    async fn append_winner_snapshot(&self, prediction: &Prediction) -> Result<(), Error> {
        let id = self.allocate_id();
        self.winners.lock().push(Prediction { id, ..prediction.clone() });
        Ok(())
    }

    async fn list_winner_snapshots(&self) -> Result<Vec<Prediction>, Error> {
        let mut rows = self.winners.lock().clone();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn clear_winner_snapshots(&self) -> Result<(), Error> {
        self.winners.lock().clear();
        Ok(())
    }
}

/// Records outbound messages; `delivered` is what every send reports.
pub struct RecordingMessenger {
    chats: Mutex<Vec<String>>,
    whispers: Mutex<Vec<(String, String)>>,
    delivered: bool,
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordingMessenger {
    pub fn new(delivered: bool) -> Self {
        Self {
            chats: Mutex::new(Vec::new()),
            whispers: Mutex::new(Vec::new()),
            delivered,
        }
    }

    pub fn chats(&self) -> Vec<String> {
        self.chats.lock().clone()
    }

    /// `(to_user_id, text)` pairs.
    pub fn whispers(&self) -> Vec<(String, String)> {
        self.whispers.lock().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_chat_message(&self, text: &str) -> bool {
        self.chats.lock().push(text.to_string());
        self.delivered
    }

    async fn send_whisper(&self, text: &str, to_user_id: &str) -> bool {
        self.whispers.lock().push((to_user_id.to_string(), text.to_string()));
        self.delivered
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, String, Option<serde_json::Value>)>>,
}

impl RecordingSink {
    /// `(room, event, payload)` in emit order.
    pub fn events(&self) -> Vec<(String, String, Option<serde_json::Value>)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl BroadcastSink for RecordingSink {
    async fn emit_to_room(
        &self,
        room: &str,
        event: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<(), Error> {
        self.events.lock().push((room.to_string(), event.to_string(), payload));
        Ok(())
    }
}

use async_trait::async_trait;
use crate::error::Error;
use crate::models::{Credential, Prediction, ScoreTally};

/// Durable home of the single credential record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing is stored or the record cannot be parsed.
    async fn load(&self) -> Result<Option<Credential>, Error>;
    async fn save(&self, credential: &Credential) -> Result<(), Error>;
}

/// Narrow view of the prediction tables the chat commands need.
#[async_trait]
pub trait PredictionLedger: Send + Sync {
    async fn insert_prediction(
        &self,
        user_id: &str,
        username: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<(), Error>;

    async fn update_prediction(&self, id: i64, home_score: i64, away_score: i64) -> Result<(), Error>;

    async fn find_prediction_by_user(&self, user_id: &str) -> Result<Option<Prediction>, Error>;

    async fn list_predictions_matching(&self, home_score: i64, away_score: i64) -> Result<Vec<Prediction>, Error>;

    async fn clear_predictions(&self) -> Result<(), Error>;

    /// Score lines ordered by how many users picked them, most popular first.
    async fn top_predictions(&self, limit: i64) -> Result<Vec<ScoreTally>, Error>;

    async fn prediction_count(&self) -> Result<i64, Error>;

    async fn append_winner_snapshot(&self, prediction: &Prediction) -> Result<(), Error>;

    /// Most recent first.
    async fn list_winner_snapshots(&self) -> Result<Vec<Prediction>, Error>;

    async fn clear_winner_snapshots(&self) -> Result<(), Error>;

    /// Updates the user's open prediction if there is one, inserts otherwise.
    /// Callers must not run two upserts for the same user concurrently.
    async fn upsert_prediction(
        &self,
        user_id: &str,
        username: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<(), Error> {
        match self.find_prediction_by_user(user_id).await? {
            Some(existing) => self.update_prediction(existing.id, home_score, away_score).await,
            None => self.insert_prediction(user_id, username, home_score, away_score).await,
        }
    }
}

// File: scorebot-core/src/repositories/sqlite/predictions.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use scorebot_common::models::{Prediction, ScoreTally};
use crate::repositories::PredictionLedger;
use crate::Error;

pub struct SqlitePredictionLedger {
    pool: Pool<Sqlite>,
}

impl SqlitePredictionLedger {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionLedger for SqlitePredictionLedger {
    async fn insert_prediction(
        &self,
        user_id: &str,
        username: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO predictions (user_id, username, home_score, away_score, timestamp)
            VALUES (?, ?, ?, ?, ?)"#,
        )
            .bind(user_id)
            .bind(username)
            .bind(home_score)
            .bind(away_score)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_prediction(&self, id: i64, home_score: i64, away_score: i64) -> Result<(), Error> {
        let result = sqlx::query(
            r#"UPDATE predictions
            SET home_score = ?, away_score = ?, timestamp = ?
            WHERE id = ?"#,
        )
            .bind(home_score)
            .bind(away_score)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("prediction id={id}")));
        }
        Ok(())
    }

    async fn find_prediction_by_user(&self, user_id: &str) -> Result<Option<Prediction>, Error> {
        let row = sqlx::query_as::<_, Prediction>(
            r#"SELECT id, user_id, username, home_score, away_score, timestamp
            FROM predictions
            WHERE user_id = ?
            ORDER BY id ASC
            LIMIT 1"#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_predictions_matching(&self, home_score: i64, away_score: i64) -> Result<Vec<Prediction>, Error> {
        let rows = sqlx::query_as::<_, Prediction>(
            r#"SELECT id, user_id, username, home_score, away_score, timestamp
            FROM predictions
            WHERE home_score = ? AND away_score = ?
            ORDER BY id ASC"#,
        )
            .bind(home_score)
            .bind(away_score)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn clear_predictions(&self) -> Result<(), Error> {
        sqlx::query("DELETE FROM predictions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn top_predictions(&self, limit: i64) -> Result<Vec<ScoreTally>, Error> {
        let rows = sqlx::query_as::<_, ScoreTally>(
            r#"SELECT home_score, away_score, COUNT(*) AS count
            FROM predictions
            GROUP BY home_score, away_score
            ORDER BY count DESC, home_score ASC, away_score ASC
            LIMIT ?"#,
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn prediction_count(&self) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn append_winner_snapshot(&self, prediction: &Prediction) -> Result<(), Error> {
        sqlx::query(
            r#"INSERT INTO winner_predictions (user_id, username, home_score, away_score, timestamp)
            VALUES (?, ?, ?, ?, ?)"#,
        )
            .bind(&prediction.user_id)
            .bind(&prediction.username)
            .bind(prediction.home_score)
            .bind(prediction.away_score)
            .bind(prediction.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_winner_snapshots(&self) -> Result<Vec<Prediction>, Error> {
        let rows = sqlx::query_as::<_, Prediction>(
            r#"SELECT id, user_id, username, home_score, away_score, timestamp
            FROM winner_predictions
            ORDER BY timestamp DESC, id DESC"#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn clear_winner_snapshots(&self) -> Result<(), Error> {
        sqlx::query("DELETE FROM winner_predictions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// File: scorebot-common/src/models/prediction.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One user's guess at the final score. At most one row per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prediction {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub home_score: i64,
    pub away_score: i64,
    pub timestamp: DateTime<Utc>,
}

/// How many predictions share a given score line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoreTally {
    pub home_score: i64,
    pub away_score: i64,
    pub count: i64,
}

/// A `home-away` score line as typed in chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: i64,
    pub away: i64,
}

impl Score {
    pub fn new(home: i64, away: i64) -> Self {
        Self { home, away }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl FromStr for Score {
    type Err = Error;

    /// Base-10 parse of `"<home>-<away>"`, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (home, away) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::MalformedCommandInput(format!("expected home-away, got '{s}'")))?;

        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map(i64::from)
                .map_err(|e| Error::MalformedCommandInput(format!("'{part}': {e}")))
        };

        Ok(Score::new(parse(home)?, parse(away)?))
    }
}

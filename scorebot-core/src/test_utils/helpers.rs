// File: scorebot-core/src/test_utils/helpers.rs

use scorebot_common::models::{Badge, ChatEvent};
use crate::db::Database;
use crate::Error;

/// Fresh in-memory SQLite database with all migrations applied.
pub async fn setup_test_database() -> Result<Database, Error> {
    let db = Database::in_memory().await?;
    db.migrate().await?;
    Ok(db)
}

/// A chat line in channel `streamer` from `chatter_login`, carrying one
/// badge per entry of `badge_sets`.
pub fn chat_event(chatter_id: &str, chatter_login: &str, text: &str, badge_sets: &[&str]) -> ChatEvent {
    ChatEvent {
        broadcaster_user_id: "1000".to_string(),
        broadcaster_login: "streamer".to_string(),
        chatter_id: chatter_id.to_string(),
        chatter_login: chatter_login.to_string(),
        text: text.to_string(),
        badges: badge_sets
            .iter()
            .map(|set| Badge {
                set_id: set.to_string(),
                id: "1".to_string(),
                info: String::new(),
            })
            .collect(),
    }
}

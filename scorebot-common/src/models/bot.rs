// File: scorebot-common/src/models/bot.rs

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Running,
    #[default]
    Stopped,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotStatus::Running => write!(f, "running"),
            BotStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Snapshot handed to dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub username: Option<String>,
    pub status: BotStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

/// Process-wide state of one bot run, owned by the runtime and handed by
/// reference to the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotRuntimeState {
    pub tracking_enabled: bool,
    pub channel_user_id: Option<String>,
    pub bot_user_id: Option<String>,
    pub username: Option<String>,
    pub status: BotStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub last_team_command_at: Option<DateTime<Utc>>,
}

impl BotRuntimeState {
    pub fn mark_running(
        &mut self,
        username: &str,
        channel_user_id: &str,
        bot_user_id: &str,
        now: DateTime<Utc>,
    ) {
        self.username = Some(username.to_string());
        self.channel_user_id = Some(channel_user_id.to_string());
        self.bot_user_id = Some(bot_user_id.to_string());
        self.status = BotStatus::Running;
        self.started_at = Some(now);
    }

    /// Stopped, stop time recorded, channel and username cleared.
    pub fn mark_stopped(&mut self, now: DateTime<Utc>) {
        self.channel_user_id = None;
        self.username = None;
        self.status = BotStatus::Stopped;
        self.stopped_at = Some(now);
    }

    pub fn info(&self) -> BotInfo {
        BotInfo {
            username: self.username.clone(),
            status: self.status,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
        }
    }
}

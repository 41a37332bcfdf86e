// File: scorebot-common/src/models/chat.rs

use serde::{Deserialize, Serialize};

/// Badge sets that grant access to the privileged commands.
pub const PRIVILEGED_BADGE_SETS: [&str; 2] = ["broadcaster", "moderator"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub set_id: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub info: String,
}

/// A parsed inbound chat message. Built once per notification frame and
/// consumed by the dispatcher; never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub broadcaster_user_id: String,
    pub broadcaster_login: String,
    pub chatter_id: String,
    pub chatter_login: String,
    pub text: String,
    pub badges: Vec<Badge>,
}

impl ChatEvent {
    pub fn has_badge(&self, set_id: &str) -> bool {
        self.badges.iter().any(|b| b.set_id == set_id)
    }

    /// A chatter is privileged iff they hold a broadcaster or moderator badge.
    pub fn is_privileged(&self) -> bool {
        PRIVILEGED_BADGE_SETS.iter().any(|set| self.has_badge(set))
    }
}

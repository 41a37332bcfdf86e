// File: scorebot-core/src/platforms/twitch_eventsub/events.rs

use serde::{Deserialize, Deserializer};
use tracing::warn;

use scorebot_common::models::{Badge, ChatEvent};
use crate::platforms::twitch::requests::CHANNEL_CHAT_MESSAGE;

/// "channel.chat.message" event
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelChatMessage {
    pub broadcaster_user_id: String,
    #[serde(default)]
    pub broadcaster_user_login: String,
    #[serde(default)]
    pub broadcaster_user_name: String,
    pub chatter_user_id: String,
    pub chatter_user_login: String,
    #[serde(default)]
    pub chatter_user_name: String,
    #[serde(default)]
    pub message_id: String,
    pub message: ChatMessageBody,
    #[serde(default)]
    pub message_type: String,
    #[serde(default, deserialize_with = "lenient_badges")]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageBody {
    pub text: String,
    #[serde(default)]
    pub fragments: Vec<MessageFragment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageFragment {
    #[serde(rename = "type")]
    pub fragment_type: String,
    pub text: String,
    #[serde(default)]
    pub cheermote: Option<serde_json::Value>,
    #[serde(default)]
    pub emote: Option<serde_json::Value>,
    #[serde(default)]
    pub mention: Option<serde_json::Value>,
}

// Anything that is not an array of badge objects counts as "no badges";
// individual malformed entries are skipped.
fn lenient_badges<'de, D>(deserializer: D) -> Result<Vec<Badge>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Badge>(item).ok())
        .collect())
}

impl From<ChannelChatMessage> for ChatEvent {
    fn from(msg: ChannelChatMessage) -> Self {
        ChatEvent {
            broadcaster_user_id: msg.broadcaster_user_id,
            broadcaster_login: msg.broadcaster_user_login,
            chatter_id: msg.chatter_user_id,
            chatter_login: msg.chatter_user_login,
            text: msg.message.text,
            badges: msg.badges,
        }
    }
}

/// Returns a `ChatEvent` for chat-message notifications; every other
/// subscription type, or an event that does not parse, yields `None`.
pub fn parse_chat_notification(subscription_type: &str, event: &serde_json::Value) -> Option<ChatEvent> {
    if subscription_type != CHANNEL_CHAT_MESSAGE {
        return None;
    }
    match serde_json::from_value::<ChannelChatMessage>(event.clone()) {
        Ok(msg) => Some(msg.into()),
        Err(e) => {
            warn!("[EventSub] could not parse {} event: {}", subscription_type, e);
            None
        }
    }
}

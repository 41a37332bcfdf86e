// File: scorebot-core/src/platforms/twitch/requests/mod.rs

pub mod chat;
pub mod eventsub;
pub mod users;

pub use eventsub::{EventSubSubscriptionRequest, CHANNEL_CHAT_MESSAGE};

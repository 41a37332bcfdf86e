// File: scorebot-core/src/platforms/mod.rs

pub mod twitch;
pub mod twitch_eventsub;

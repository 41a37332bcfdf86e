// File: scorebot-core/src/tasks/mod.rs

pub mod scoreboard_push;

pub use scoreboard_push::{build_scoreboard_update, push_scoreboard_update, spawn_scoreboard_push_task};

// src/lib.rs

pub mod auth;
pub mod bot;
pub mod config;
pub mod db;
pub mod eventbus;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use bot::ScoreBot;
pub use config::{BotConfig, RetryPolicy, TwitchEndpoints};
pub use db::Database;
pub use scorebot_common::error::Error;

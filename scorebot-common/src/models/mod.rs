// File: scorebot-common/src/models/mod.rs
pub mod bot;
pub mod chat;
pub mod credential;
pub mod prediction;

pub use bot::{BotInfo, BotRuntimeState, BotStatus};
pub use chat::{Badge, ChatEvent};
pub use credential::{Credential, TokenResponse, TokenValidation};
pub use prediction::{Prediction, Score, ScoreTally};

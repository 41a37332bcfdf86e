// File: scorebot-core/src/services/mod.rs

pub mod action_executor;
pub mod commands;
pub mod message_sender;

pub use action_executor::ActionExecutor;
pub use commands::{Action, CommandDispatcher, DispatchSettings};
pub use message_sender::{HelixMessenger, Messenger};

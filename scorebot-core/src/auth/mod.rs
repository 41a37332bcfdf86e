// File: scorebot-core/src/auth/mod.rs

pub mod callback_server;
pub mod manager;
pub mod token_client;

pub use callback_server::{start_callback_server, CallbackResult};
pub use manager::CredentialManager;
pub use token_client::{TokenEndpoint, TwitchTokenClient};

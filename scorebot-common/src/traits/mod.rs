// File: scorebot-common/src/traits/mod.rs
pub mod broadcast_traits;
pub mod repository_traits;

pub use broadcast_traits::BroadcastSink;
pub use repository_traits::{CredentialStore, PredictionLedger};

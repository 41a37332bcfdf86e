// File: scorebot-core/src/repositories/mod.rs

pub mod file;
pub mod sqlite;

pub use file::FileCredentialStore;
pub use sqlite::SqlitePredictionLedger;
pub use scorebot_common::traits::repository_traits::{CredentialStore, PredictionLedger};

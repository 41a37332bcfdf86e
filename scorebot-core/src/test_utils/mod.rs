// File: scorebot-core/src/test_utils/mod.rs

pub mod fakes;
pub mod helpers;

pub use fakes::{InMemoryPredictionLedger, MemoryCredentialStore, RecordingMessenger, RecordingSink};

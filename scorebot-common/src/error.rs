// ================================================================
// File: scorebot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    /// No credential record has been persisted yet. Recoverable: run the
    /// authorization flow and the startup poll will pick it up.
    #[error("No persisted credential found; authorization required")]
    CredentialMissing,

    #[error("Credential expired and no refresh token is available; re-authorize")]
    CredentialExpiredNoRefresh,

    #[error("Token refresh failed (HTTP {status:?}): {body}")]
    RefreshFailed {
        status: Option<u16>,
        body: String,
    },

    #[error("Upstream request to {endpoint} failed (HTTP {status}): {body}")]
    UpstreamRequestFailed {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed command input: {0}")]
    MalformedCommandInput(String),

    #[error("Event stream transport closed")]
    TransportClosed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Event bus error: {0}")]
    EventBus(String),
}

impl Error {
    /// True for the credential failures the startup poll keeps retrying on.
    pub fn is_no_valid_credential(&self) -> bool {
        matches!(
            self,
            Error::CredentialMissing
                | Error::CredentialExpiredNoRefresh
                | Error::RefreshFailed { .. }
        )
    }
}

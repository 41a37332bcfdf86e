// File: scorebot-common/src/models/credential.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Matches the JSON returned by the identity provider's token endpoint.
///
/// Every field is optional on the wire so an incomplete body can be detected
/// and reported instead of failing as an opaque JSON error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn is_complete(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.expires_in.is_some()
    }
}

/// The one OAuth access/refresh pair the process runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential from a complete token response; `expires_at` is
    /// always `issued_at + expires_in`. Returns `None` for incomplete bodies
    /// and for lifetimes that do not fit in a timestamp.
    pub fn from_token_response(resp: &TokenResponse, issued_at: DateTime<Utc>) -> Option<Self> {
        if !resp.is_complete() {
            return None;
        }
        let lifetime = Duration::try_seconds(resp.expires_in?)?;
        Some(Self {
            access_token: resp.access_token.clone()?,
            refresh_token: resp.refresh_token.clone()?,
            expires_at: issued_at.checked_add_signed(lifetime)?,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// First few characters of the access token, safe for logs.
    pub fn token_preview(&self) -> String {
        let prefix: String = self.access_token.chars().take(5).collect();
        format!("{prefix}...")
    }
}

/// Body of a successful `GET /oauth2/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub client_id: String,
    #[serde(default)]
    pub login: String,
    pub user_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expires_in: i64,
}

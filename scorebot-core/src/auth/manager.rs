// File: scorebot-core/src/auth/manager.rs
//
// Single writer of the bot's OAuth credential.

use std::sync::Arc;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scorebot_common::models::{Credential, TokenResponse, TokenValidation};
use crate::auth::token_client::TokenEndpoint;
use crate::repositories::CredentialStore;
use crate::Error;

/// Owns the in-memory credential and is the only caller of the token
/// endpoint and the only writer of the credential store.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    current: Mutex<Option<Credential>>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            store,
            endpoint,
            current: Mutex::new(None),
        }
    }

    /// Reads the persisted record. An empty or unreadable store is
    /// `CredentialMissing`, which callers treat as recoverable.
    pub async fn load_persisted(&self) -> Result<Credential, Error> {
        match self.store.load().await? {
            Some(cred) => {
                debug!("[Auth] loaded persisted credential {}", cred.token_preview());
                Ok(cred)
            }
            None => Err(Error::CredentialMissing),
        }
    }

    /// Reloads from the store, refreshing once if the stored credential has
    /// expired. The store wins over the in-memory copy so an out-of-band
    /// authorization is picked up on the next call.
    pub async fn get_valid_credential(&self) -> Result<Credential, Error> {
        let mut current = self.current.lock().await;

        let loaded = self.load_persisted().await?;
        if !loaded.is_expired() {
            *current = Some(loaded.clone());
            return Ok(loaded);
        }

        if !loaded.has_refresh_token() {
            warn!("[Auth] credential expired at {} and has no refresh token", loaded.expires_at);
            *current = None;
            return Err(Error::CredentialExpiredNoRefresh);
        }

        info!("[Auth] credential expired at {}, refreshing", loaded.expires_at);
        let refreshed = self.refresh_locked(&loaded.refresh_token).await?;
        *current = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// Forces a refresh with the persisted refresh token.
    pub async fn refresh(&self) -> Result<Credential, Error> {
        let mut current = self.current.lock().await;

        let refresh_token = match self.store.load().await? {
            Some(cred) => cred.refresh_token,
            None => match current.as_ref() {
                Some(cred) => cred.refresh_token.clone(),
                None => return Err(Error::CredentialMissing),
            },
        };
        if refresh_token.is_empty() {
            return Err(Error::CredentialExpiredNoRefresh);
        }

        let refreshed = self.refresh_locked(&refresh_token).await?;
        *current = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// One-time exchange of an authorization code for the first credential.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<Credential, Error> {
        let mut current = self.current.lock().await;

        let issued_at = Utc::now();
        let resp = self.endpoint.exchange_code(code).await?;
        let cred = Self::credential_from(&resp, issued_at)?;

        self.store.save(&cred).await?;
        info!("[Auth] stored new credential {} (expires {})", cred.token_preview(), cred.expires_at);
        *current = Some(cred.clone());
        Ok(cred)
    }

    /// Validates an arbitrary access token against the identity provider.
    pub async fn validate(&self, access_token: &str) -> Result<TokenValidation, Error> {
        self.endpoint.validate(access_token).await
    }

    /// Loads a valid credential and asks the provider who it belongs to.
    pub async fn validate_current(&self) -> Result<TokenValidation, Error> {
        let cred = self.get_valid_credential().await?;
        self.endpoint.validate(&cred.access_token).await
    }

    /// Last credential handed out by this manager, if any.
    pub async fn current(&self) -> Option<Credential> {
        self.current.lock().await.clone()
    }

    // Caller holds `current`.
    async fn refresh_locked(&self, refresh_token: &str) -> Result<Credential, Error> {
        let issued_at = Utc::now();
        let resp = self.endpoint.refresh(refresh_token).await?;
        let cred = Self::credential_from(&resp, issued_at)?;

        self.store.save(&cred).await?;
        info!("[Auth] refreshed credential {} (expires {})", cred.token_preview(), cred.expires_at);
        Ok(cred)
    }

    fn credential_from(resp: &TokenResponse, issued_at: chrono::DateTime<Utc>) -> Result<Credential, Error> {
        Credential::from_token_response(resp, issued_at).ok_or_else(|| Error::RefreshFailed {
            status: None,
            body: "incomplete token data".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::auth::token_client::MockTokenEndpoint;
    use crate::test_utils::MemoryCredentialStore;

    fn credential(access: &str, refresh: &str, expires_in: Duration) -> Credential {
        Credential {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    fn token_response(access: &str, refresh: &str) -> TokenResponse {
        TokenResponse {
            access_token: Some(access.to_string()),
            refresh_token: Some(refresh.to_string()),
            expires_in: Some(14_400),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_store_is_credential_missing() {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store, Arc::new(endpoint));

        assert!(matches!(manager.load_persisted().await, Err(Error::CredentialMissing)));
        let err = manager.get_valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::CredentialMissing));
        assert!(err.is_no_valid_credential());
    }

    #[tokio::test]
    async fn valid_credential_is_returned_without_refresh() -> Result<(), Error> {
        let stored = credential("live", "r1", Duration::hours(1));
        let store = Arc::new(MemoryCredentialStore::with(stored.clone()));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let got = manager.get_valid_credential().await?;
        assert_eq!(got, stored);
        assert_eq!(store.save_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_exactly_once() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::with(credential(
            "stale",
            "r1",
            Duration::seconds(-5),
        )));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .withf(|token| token == "r1")
            .times(1)
            .returning(|_| Ok(token_response("fresh", "r2")));
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let got = manager.get_valid_credential().await?;
        assert_eq!(got.access_token, "fresh");
        assert_eq!(got.refresh_token, "r2");
        assert!(!got.is_expired());

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted, got);
        assert_eq!(manager.current().await, Some(got));
        Ok(())
    }

    #[tokio::test]
    async fn expired_without_refresh_token_fails() {
        let store = Arc::new(MemoryCredentialStore::with(credential(
            "stale",
            "",
            Duration::seconds(-5),
        )));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store, Arc::new(endpoint));

        let err = manager.get_valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::CredentialExpiredNoRefresh));
    }

    #[tokio::test]
    async fn refresh_failure_leaves_store_untouched() {
        let stale = credential("stale", "r1", Duration::seconds(-5));
        let store = Arc::new(MemoryCredentialStore::with(stale.clone()));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(1).returning(|_| {
            Err(Error::RefreshFailed {
                status: Some(400),
                body: "Invalid refresh token".into(),
            })
        });
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let err = manager.get_valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::RefreshFailed { status: Some(400), .. }));
        assert_eq!(store.snapshot(), Some(stale));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn forced_refresh_persists_new_pair() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::with(credential("live", "r1", Duration::hours(1))));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .withf(|token| token == "r1")
            .times(1)
            .returning(|_| Ok(token_response("rotated", "r2")));
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let got = manager.refresh().await?;
        assert_eq!(got.access_token, "rotated");
        assert_eq!(got.refresh_token, "r2");
        assert_eq!(store.snapshot(), Some(got.clone()));
        assert_eq!(store.save_count(), 1);
        assert_eq!(manager.current().await, Some(got));
        Ok(())
    }

    #[tokio::test]
    async fn forced_refresh_falls_back_to_in_memory_token() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_exchange_code()
            .returning(|_| Ok(token_response("first", "r0")));
        endpoint
            .expect_refresh()
            .withf(|token| token == "r0")
            .times(1)
            .returning(|_| Ok(token_response("second", "r1")));
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        manager.exchange_authorization_code("abc").await?;
        store.clear();

        let got = manager.refresh().await?;
        assert_eq!(got.access_token, "second");
        assert_eq!(store.snapshot(), Some(got));
        Ok(())
    }

    #[tokio::test]
    async fn forced_refresh_without_any_credential_is_missing() {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let err = manager.refresh().await.unwrap_err();
        assert!(matches!(err, Error::CredentialMissing));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn forced_refresh_with_empty_refresh_token_fails() {
        let store = Arc::new(MemoryCredentialStore::with(credential("live", "", Duration::hours(1))));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let err = manager.refresh().await.unwrap_err();
        assert!(matches!(err, Error::CredentialExpiredNoRefresh));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn oversized_lifetime_is_refresh_failed() {
        let stale = credential("stale", "r1", Duration::seconds(-5));
        let store = Arc::new(MemoryCredentialStore::with(stale.clone()));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(1).returning(|_| {
            Ok(TokenResponse {
                expires_in: Some(i64::MAX),
                ..token_response("fresh", "r2")
            })
        });
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let err = manager.get_valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::RefreshFailed { status: None, .. }));
        assert_eq!(store.snapshot(), Some(stale));
    }

    #[tokio::test]
    async fn out_of_band_update_is_picked_up() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().times(0);
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        assert!(manager.get_valid_credential().await.is_err());

        let written = credential("from-web", "r9", Duration::hours(2));
        store.save(&written).await?;
        assert_eq!(manager.get_valid_credential().await?, written);
        Ok(())
    }

    #[tokio::test]
    async fn code_exchange_persists_first_credential() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_exchange_code()
            .withf(|code| code == "abc")
            .times(1)
            .returning(|_| Ok(token_response("first", "r0")));
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let before = Utc::now();
        let cred = manager.exchange_authorization_code("abc").await?;
        assert_eq!(cred.access_token, "first");
        assert!(cred.expires_at >= before + Duration::seconds(14_400));
        assert_eq!(store.snapshot(), Some(cred));
        Ok(())
    }

    #[tokio::test]
    async fn incomplete_exchange_is_refresh_failed() {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_exchange_code().returning(|_| {
            Ok(TokenResponse {
                access_token: Some("a".into()),
                ..Default::default()
            })
        });
        let manager = CredentialManager::new(store.clone(), Arc::new(endpoint));

        let err = manager.exchange_authorization_code("abc").await.unwrap_err();
        assert!(matches!(err, Error::RefreshFailed { .. }));
        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::with(credential(
            "stale",
            "r1",
            Duration::seconds(-5),
        )));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(token_response("fresh", "r2")));
        let manager = Arc::new(CredentialManager::new(store, Arc::new(endpoint)));

        let a = tokio::spawn({
            let m = manager.clone();
            async move { m.get_valid_credential().await }
        });
        let b = tokio::spawn({
            let m = manager.clone();
            async move { m.get_valid_credential().await }
        });

        let a = a.await.unwrap()?;
        let b = b.await.unwrap()?;
        assert_eq!(a.access_token, "fresh");
        assert_eq!(b.access_token, "fresh");
        Ok(())
    }

    #[tokio::test]
    async fn validate_current_uses_loaded_token() -> Result<(), Error> {
        let store = Arc::new(MemoryCredentialStore::with(credential("live", "r1", Duration::hours(1))));
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_validate()
            .withf(|token| token == "live")
            .returning(|_| {
                Ok(TokenValidation {
                    client_id: "cid".into(),
                    login: "scorebot".into(),
                    user_id: "42".into(),
                    scopes: vec![],
                    expires_in: 100,
                })
            });
        let manager = CredentialManager::new(store, Arc::new(endpoint));

        assert_eq!(manager.validate_current().await?.user_id, "42");
        Ok(())
    }
}

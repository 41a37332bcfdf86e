// File: scorebot-core/src/auth/token_client.rs
//
// Wire client for the identity provider: code exchange, refresh, validate.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use tracing::{debug, error, info};

use scorebot_common::models::{TokenResponse, TokenValidation};
use crate::config::{BotConfig, TwitchEndpoints, BOT_SCOPES};
use crate::Error;

/// The three identity-provider calls the credential manager depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// `grant_type=authorization_code`
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error>;

    /// `grant_type=refresh_token`
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error>;

    /// `GET /validate` with `Authorization: OAuth <token>`.
    async fn validate(&self, access_token: &str) -> Result<TokenValidation, Error>;
}

/// Twitch code flow with client_secret, no PKCE.
pub struct TwitchTokenClient {
    http: ReqwestClient,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: TwitchEndpoints,
}

impl TwitchTokenClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        endpoints: TwitchEndpoints,
    ) -> Self {
        Self {
            http: ReqwestClient::new(),
            client_id,
            client_secret,
            redirect_uri,
            endpoints,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_uri.clone(),
            config.endpoints.clone(),
        )
    }

    /// URL the operator opens in a browser to grant the bot its scopes.
    pub fn authorize_url(&self, state: &str) -> String {
        let scope_str = BOT_SCOPES.join(" ");
        format!(
            "{base}?response_type=code&client_id={cid}&redirect_uri={redir}&scope={scope}&state={st}",
            base  = self.endpoints.authorize_url(),
            cid   = urlencoding::encode(&self.client_id),
            redir = urlencoding::encode(&self.redirect_uri),
            scope = urlencoding::encode(&scope_str),
            st    = urlencoding::encode(state),
        )
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<TokenResponse, Error> {
        let token_url = self.endpoints.token_url();
        debug!("[Auth] POST {}", token_url);

        let resp = self
            .http
            .post(&token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::RefreshFailed {
                status: None,
                body: format!("transport error: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("[Auth] token endpoint returned HTTP {} => {}", status, body);
            return Err(Error::RefreshFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| Error::RefreshFailed {
            status: Some(status.as_u16()),
            body: format!("unparseable token body ({e}): {body}"),
        })?;

        if !parsed.is_complete() {
            error!("[Auth] incomplete token data received: {}", body);
            return Err(Error::RefreshFailed {
                status: Some(status.as_u16()),
                body: format!("incomplete token data: {body}"),
            });
        }

        Ok(parsed)
    }
}

#[async_trait]
impl TokenEndpoint for TwitchTokenClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let preview: String = code.chars().take(5).collect();
        info!("[Auth] exchanging authorization code {}...", preview);

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        self.post_token_form(&params).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let resp = self.post_token_form(&params).await?;
        info!("[Auth] token refreshed successfully");
        Ok(resp)
    }

    async fn validate(&self, access_token: &str) -> Result<TokenValidation, Error> {
        let url = self.endpoints.validate_url();
        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("OAuth {}", access_token))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() != 200 {
            let body = resp.text().await.unwrap_or_default();
            error!("[Auth] token is not valid. /validate returned HTTP {} => {}", status, body);
            return Err(Error::UpstreamRequestFailed {
                endpoint: url,
                status: status.as_u16(),
                body,
            });
        }

        let validation = resp.json::<TokenValidation>().await?;
        debug!("[Auth] validated token for user_id={}", validation.user_id);
        Ok(validation)
    }
}

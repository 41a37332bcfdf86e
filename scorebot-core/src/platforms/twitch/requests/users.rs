// File: scorebot-core/src/platforms/twitch/requests/users.rs

use serde::Deserialize;
use tracing::debug;

use crate::platforms::twitch::client::TwitchHelixClient;
use crate::Error;

/// Response from "Get Users".
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub data: Vec<UserData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
}

impl TwitchHelixClient {
    /// Resolves a login name to its numeric user id.
    pub async fn get_user_id(&self, token: &str, login: &str) -> Result<String, Error> {
        let url = self.url("users");
        let resp = self
            .authed(self.http_client().get(&url), token)
            .query(&[("login", login)])
            .send()
            .await?;
        let resp = Self::expect_status("users", resp, 200).await?;

        let users: UsersResponse = resp.json().await?;
        let user = users
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("Twitch user '{}'", login)))?;

        debug!("[Helix] resolved login={} => user_id={}", user.login, user.id);
        Ok(user.id)
    }
}

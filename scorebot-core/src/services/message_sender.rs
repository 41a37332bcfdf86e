// File: scorebot-core/src/services/message_sender.rs

use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::auth::CredentialManager;
use crate::platforms::twitch::TwitchHelixClient;

/// Best-effort outbound chat. Failures are logged by the implementation and
/// reported only as `false`; a lost message never ends the session.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_chat_message(&self, text: &str) -> bool;
    async fn send_whisper(&self, text: &str, to_user_id: &str) -> bool;
}

/// Sends as the bot account into one channel through Helix.
pub struct HelixMessenger {
    helix: TwitchHelixClient,
    credentials: Arc<CredentialManager>,
    channel_user_id: String,
    bot_user_id: String,
}

impl HelixMessenger {
    pub fn new(
        helix: TwitchHelixClient,
        credentials: Arc<CredentialManager>,
        channel_user_id: &str,
        bot_user_id: &str,
    ) -> Self {
        Self {
            helix,
            credentials,
            channel_user_id: channel_user_id.to_string(),
            bot_user_id: bot_user_id.to_string(),
        }
    }

    async fn access_token(&self) -> Option<String> {
        match self.credentials.get_valid_credential().await {
            Ok(cred) => Some(cred.access_token),
            Err(e) => {
                warn!("[Helix] no valid credential for outbound message: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Messenger for HelixMessenger {
    async fn send_chat_message(&self, text: &str) -> bool {
        let Some(token) = self.access_token().await else {
            return false;
        };
        match self
            .helix
            .send_chat_message(&token, &self.channel_user_id, &self.bot_user_id, text)
            .await
        {
            Ok(()) => {
                debug!("[Helix] sent chat message: {}", text);
                true
            }
            Err(e) => {
                warn!("[Helix] failed to send chat message: {}", e);
                false
            }
        }
    }

    async fn send_whisper(&self, text: &str, to_user_id: &str) -> bool {
        let Some(token) = self.access_token().await else {
            return false;
        };
        match self
            .helix
            .send_whisper(&token, &self.bot_user_id, to_user_id, text)
            .await
        {
            Ok(()) => {
                debug!("[Helix] sent whisper to {}", to_user_id);
                true
            }
            Err(e) => {
                warn!("[Helix] failed to send whisper: {}", e);
                false
            }
        }
    }
}

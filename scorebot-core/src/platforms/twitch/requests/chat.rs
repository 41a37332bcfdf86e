// File: scorebot-core/src/platforms/twitch/requests/chat.rs

use serde::Serialize;
use tracing::debug;

use crate::platforms::twitch::client::TwitchHelixClient;
use crate::Error;

#[derive(Debug, Serialize)]
struct SendChatMessageBody<'a> {
    broadcaster_id: &'a str,
    sender_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SendWhisperBody<'a> {
    message: &'a str,
}

impl TwitchHelixClient {
    /// `POST /chat/messages`; only HTTP 200 counts as sent.
    pub async fn send_chat_message(
        &self,
        token: &str,
        broadcaster_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        let url = self.url("chat/messages");
        let body = SendChatMessageBody {
            broadcaster_id,
            sender_id,
            message: text,
        };
        let resp = self
            .authed(self.http_client().post(&url), token)
            .json(&body)
            .send()
            .await?;
        Self::expect_status("chat/messages", resp, 200).await?;
        debug!("[Helix] chat message sent to broadcaster_id={}", broadcaster_id);
        Ok(())
    }

    /// `POST /whispers?from_user_id=..&to_user_id=..`; only HTTP 204 counts.
    pub async fn send_whisper(
        &self,
        token: &str,
        from_user_id: &str,
        to_user_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        let url = self.url("whispers");
        let resp = self
            .authed(self.http_client().post(&url), token)
            .query(&[("from_user_id", from_user_id), ("to_user_id", to_user_id)])
            .json(&SendWhisperBody { message: text })
            .send()
            .await?;
        Self::expect_status("whispers", resp, 204).await?;
        debug!("[Helix] whisper sent to user_id={}", to_user_id);
        Ok(())
    }
}

// File: scorebot-core/src/platforms/twitch_eventsub/frames.rs
//
// Text frames from the EventSub websocket, decoded once into a tagged enum.

use serde::Deserialize;

use crate::Error;

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    metadata: Metadata,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct Metadata {
    #[serde(default)]
    message_id: String,
    message_type: String,
}

/// The `payload.session` object of welcome and reconnect frames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub keepalive_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub reconnect_url: Option<String>,
    #[serde(default)]
    pub connected_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionRef {
    #[serde(rename = "type")]
    sub_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventSubFrame {
    SessionWelcome(SessionInfo),
    SessionKeepalive,
    Notification {
        subscription_type: String,
        event: serde_json::Value,
    },
    SessionReconnect {
        url: String,
    },
    Revocation {
        subscription_type: String,
    },
    /// Any message type this client does not act on.
    Other(String),
}

impl EventSubFrame {
    /// Keepalives are only worth a trace line.
    pub fn is_health_check(&self) -> bool {
        matches!(self, EventSubFrame::SessionKeepalive)
    }
}

pub fn decode_frame(text: &str) -> Result<EventSubFrame, Error> {
    let env: Envelope = serde_json::from_str(text)
        .map_err(|e| Error::Platform(format!("bad EventSub frame: {e}")))?;

    let frame = match env.metadata.message_type.as_str() {
        "session_welcome" => {
            let session = session_from(&env.payload, &env.metadata.message_id)?;
            EventSubFrame::SessionWelcome(session)
        }
        "session_keepalive" => EventSubFrame::SessionKeepalive,
        "notification" => {
            let subscription_type = subscription_type_from(&env.payload)?;
            let event = env
                .payload
                .get("event")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            EventSubFrame::Notification { subscription_type, event }
        }
        "session_reconnect" => {
            let session = session_from(&env.payload, &env.metadata.message_id)?;
            let url = session.reconnect_url.ok_or_else(|| {
                Error::Platform("session_reconnect without reconnect_url".into())
            })?;
            EventSubFrame::SessionReconnect { url }
        }
        "revocation" => EventSubFrame::Revocation {
            subscription_type: subscription_type_from(&env.payload)?,
        },
        other => EventSubFrame::Other(other.to_string()),
    };
    Ok(frame)
}

fn session_from(payload: &serde_json::Value, message_id: &str) -> Result<SessionInfo, Error> {
    let session = payload
        .get("session")
        .cloned()
        .ok_or_else(|| Error::Platform(format!("frame {message_id} has no payload.session")))?;
    serde_json::from_value(session)
        .map_err(|e| Error::Platform(format!("bad payload.session in {message_id}: {e}")))
}

fn subscription_type_from(payload: &serde_json::Value) -> Result<String, Error> {
    let sub = payload
        .get("subscription")
        .cloned()
        .ok_or_else(|| Error::Platform("frame has no payload.subscription".into()))?;
    let sub: SubscriptionRef = serde_json::from_value(sub)
        .map_err(|e| Error::Platform(format!("bad payload.subscription: {e}")))?;
    Ok(sub.sub_type)
}

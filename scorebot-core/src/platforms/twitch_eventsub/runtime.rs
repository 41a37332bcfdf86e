// File: scorebot-core/src/platforms/twitch_eventsub/runtime.rs

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::Error;
use super::frames::{decode_frame, EventSubFrame, SessionInfo};
use super::session::{ConnectionState, Session};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WELCOME_TIMEOUT: Duration = Duration::from_secs(10);

/// One EventSub websocket and the session riding on it.
pub struct EventSubConnection {
    ws: Option<WsStream>,
    session: Session,
    url: String,
}

impl EventSubConnection {
    /// Connects to `url`. The session is `Connecting` until the welcome arrives.
    pub async fn open(url: &str) -> Result<Self, Error> {
        let mut session = Session::default();
        session.connecting();

        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| Error::Platform(format!("EventSub connect error: {e}")))?;
        info!("[EventSub] connected → {}", url);

        Ok(Self {
            ws: Some(ws),
            session,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn is_open(&self) -> bool {
        self.ws.is_some()
    }

    /// Reads frames until `session_welcome`, failing after `timeout` or if the
    /// socket closes first.
    pub async fn await_welcome(&mut self, timeout: Duration) -> Result<SessionInfo, Error> {
        let waited = tokio::time::timeout(timeout, async {
            loop {
                match self.next_frame().await? {
                    Some(EventSubFrame::SessionWelcome(info)) => return Ok(info),
                    Some(other) => debug!("[EventSub] ignoring {:?} before welcome", other),
                    None => {
                        return Err(Error::Platform(
                            "Connection closed without welcome message".into(),
                        ));
                    }
                }
            }
        })
        .await;

        match waited {
            Ok(Ok(info)) => {
                self.session.welcomed(&info.id);
                info!("[EventSub] session welcomed (id={})", info.id);
                Ok(info)
            }
            Ok(Err(e)) => {
                self.close().await;
                Err(e)
            }
            Err(_) => {
                self.close().await;
                Err(Error::Platform("Timeout waiting for welcome message".into()))
            }
        }
    }

    pub fn mark_subscribed(&mut self) -> Result<(), Error> {
        if self.session.subscribed() {
            Ok(())
        } else {
            Err(Error::Platform(format!(
                "cannot subscribe a session in state {}",
                self.session.state()
            )))
        }
    }

    /// Next decoded text frame. `Ok(None)` means the socket closed; the
    /// session is reset in that case and on transport errors.
    pub async fn next_frame(&mut self) -> Result<Option<EventSubFrame>, Error> {
        loop {
            let Some(ws) = self.ws.as_mut() else {
                return Ok(None);
            };

            let msg = match ws.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    warn!("[EventSub] ws error: {}", e);
                    self.drop_transport();
                    return Err(Error::TransportClosed);
                }
                None => {
                    info!("[EventSub] websocket stream ended.");
                    self.drop_transport();
                    return Ok(None);
                }
            };

            match msg {
                Message::Close(frame) => {
                    info!("[EventSub] websocket closed by server: {:?}", frame);
                    self.drop_transport();
                    return Ok(None);
                }
                Message::Text(txt) => match decode_frame(&txt) {
                    Ok(frame) => {
                        if frame.is_health_check() {
                            if tracing::enabled!(tracing::Level::TRACE) {
                                trace!("[EventSub] Received TEXT (health check): {}", txt.as_str());
                            }
                        } else {
                            debug!("[EventSub] Received TEXT: {}", txt.as_str());
                        }
                        return Ok(Some(frame));
                    }
                    Err(e) => warn!("[EventSub] skipping undecodable frame: {}", e),
                },
                // ping/pong/binary
                _ => continue,
            }
        }
    }

    /// Closes the socket if open and resets the session. Safe to call twice.
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!("[EventSub] close handshake failed: {}", e);
            }
            let _ = ws.flush().await;
            info!("[EventSub] connection closed.");
        }
        self.session.reset();
    }

    fn drop_transport(&mut self) {
        self.ws = None;
        self.session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn serve_frames(frames: Vec<String>) -> Result<String, Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut ws) = accept_async(stream).await {
                    for f in frames {
                        if ws.send(Message::text(f)).await.is_err() {
                            return;
                        }
                    }
                    let _ = ws.close(None).await;
                }
            }
        });
        Ok(format!("ws://{}", addr))
    }

    const WELCOME: &str = r#"{"metadata":{"message_id":"m1","message_type":"session_welcome"},"payload":{"session":{"id":"sess-1","status":"connected","keepalive_timeout_seconds":10}}}"#;
    const KEEPALIVE: &str = r#"{"metadata":{"message_id":"m2","message_type":"session_keepalive"},"payload":{}}"#;

    #[tokio::test]
    async fn welcome_then_close_walks_the_state_machine() -> Result<(), Error> {
        let url = serve_frames(vec![WELCOME.into(), KEEPALIVE.into()]).await?;

        let mut conn = EventSubConnection::open(&url).await?;
        assert_eq!(conn.state(), ConnectionState::Connecting);

        let info = conn.await_welcome(WELCOME_TIMEOUT).await?;
        assert_eq!(info.id, "sess-1");
        assert_eq!(conn.session().session_id(), Some("sess-1"));
        assert_eq!(conn.state(), ConnectionState::Welcomed);

        conn.mark_subscribed()?;
        assert_eq!(conn.state(), ConnectionState::Subscribed);

        assert_eq!(conn.next_frame().await?, Some(EventSubFrame::SessionKeepalive));
        assert_eq!(conn.next_frame().await?, None);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.session().session_id(), None);
        assert!(!conn.is_open());

        conn.close().await;
        conn.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn close_before_welcome_is_an_error() -> Result<(), Error> {
        let url = serve_frames(vec![KEEPALIVE.into()]).await?;
        let mut conn = EventSubConnection::open(&url).await?;

        assert!(conn.await_welcome(WELCOME_TIMEOUT).await.is_err());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.mark_subscribed().is_err());
        Ok(())
    }
}

// File: scorebot-core/src/platforms/twitch_eventsub/session.rs

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Welcomed,
    Subscribed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Welcomed => "welcomed",
            ConnectionState::Subscribed => "subscribed",
        };
        f.write_str(s)
    }
}

/// Identity of one live websocket connection. A session id only exists
/// between the welcome frame and the next close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    session_id: Option<String>,
    state: ConnectionState,
}

impl Session {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connecting(&mut self) {
        self.session_id = None;
        self.state = ConnectionState::Connecting;
    }

    pub fn welcomed(&mut self, session_id: &str) {
        self.session_id = Some(session_id.to_string());
        self.state = ConnectionState::Welcomed;
    }

    /// Only a welcomed session can become subscribed.
    pub fn subscribed(&mut self) -> bool {
        if self.state != ConnectionState::Welcomed {
            return false;
        }
        self.state = ConnectionState::Subscribed;
        true
    }

    pub fn reset(&mut self) {
        self.session_id = None;
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut s = Session::default();
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert!(!s.subscribed());

        s.connecting();
        assert_eq!(s.state(), ConnectionState::Connecting);
        assert!(!s.subscribed());

        s.welcomed("abc");
        assert_eq!(s.session_id(), Some("abc"));
        assert!(s.subscribed());
        assert_eq!(s.state(), ConnectionState::Subscribed);

        s.reset();
        assert_eq!(s, Session::default());
    }
}

// File: scorebot-core/src/config.rs
//
// Runtime configuration, read from the process environment (after `.env`
// has been loaded by the binary).

use std::path::PathBuf;
use std::time::Duration;

use crate::Error;

pub const DEFAULT_ID_BASE: &str = "https://id.twitch.tv/oauth2";
pub const DEFAULT_HELIX_BASE: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_EVENTSUB_WS_URL: &str = "wss://eventsub.wss.twitch.tv/ws";

pub const DEFAULT_CALLBACK_PORT: u16 = 9876;

pub const BOT_SCOPES: [&str; 5] = [
    "user:bot",
    "user:read:chat",
    "user:write:chat",
    "channel:bot",
    "user:manage:whispers",
];

/// Base URLs for every upstream call. Tests point these at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchEndpoints {
    /// Identity provider root: `/token`, `/validate`, `/authorize` hang off it.
    pub id_base: String,
    pub helix_base: String,
    pub eventsub_ws_url: String,
}

impl Default for TwitchEndpoints {
    fn default() -> Self {
        Self {
            id_base: DEFAULT_ID_BASE.to_string(),
            helix_base: DEFAULT_HELIX_BASE.to_string(),
            eventsub_ws_url: DEFAULT_EVENTSUB_WS_URL.to_string(),
        }
    }
}

impl TwitchEndpoints {
    pub fn token_url(&self) -> String {
        format!("{}/token", self.id_base.trim_end_matches('/'))
    }

    pub fn validate_url(&self) -> String {
        format!("{}/validate", self.id_base.trim_end_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.id_base.trim_end_matches('/'))
    }
}

/// How the startup token poll behaves. `max_attempts: None` polls forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    /// True once `attempts` tries have been made and no more are allowed.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Redirect target served by the local authorization callback server.
pub fn local_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}/callback")
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_file: PathBuf,
    pub database_path: String,
    pub scoreboard_url: String,
    pub show_players_room: String,
    pub scoreboard_room: String,
    pub team_cooldown: Duration,
    pub recurring_interval: Duration,
    pub token_retry: RetryPolicy,
    pub endpoints: TwitchEndpoints,
}

impl BotConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Parse(format!("missing required setting {key}")))
        };
        let number = |key: &str, default: u64| -> Result<u64, Error> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| Error::Parse(format!("{key}='{raw}': {e}"))),
                None => Ok(default),
            }
        };
        // Zero would turn the poll and push loops into busy loops.
        let interval_secs = |key: &str, default: u64| -> Result<Duration, Error> {
            match number(key, default)? {
                0 => Err(Error::Parse(format!("{key} must be at least 1 second"))),
                secs => Ok(Duration::from_secs(secs)),
            }
        };

        let max_attempts = match get("TOKEN_RETRY_MAX_ATTEMPTS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .map_err(|e| Error::Parse(format!("TOKEN_RETRY_MAX_ATTEMPTS='{raw}': {e}")))?,
            ),
            None => None,
        };

        let defaults = TwitchEndpoints::default();

        Ok(Self {
            client_id: required("TWITCH_CLIENT_ID")?,
            client_secret: required("TWITCH_CLIENT_SECRET")?,
            redirect_uri: get("TWITCH_REDIRECT_URI")
                .unwrap_or_else(|| local_redirect_uri(DEFAULT_CALLBACK_PORT)),
            token_file: PathBuf::from(get("TOKEN_FILE").unwrap_or_else(|| "token.json".to_string())),
            database_path: get("SQLITE_DB_PATH").unwrap_or_else(|| "./database.sqlite".to_string()),
            scoreboard_url: get("SCOREBOARD_URL")
                .unwrap_or_else(|| "http://localhost:3000/ganadores".to_string()),
            show_players_room: get("SHOW_PLAYERS_ROOM").unwrap_or_else(|| "dedsafio".to_string()),
            scoreboard_room: get("SCOREBOARD_ROOM").unwrap_or_else(|| "queensleague".to_string()),
            team_cooldown: Duration::from_millis(number("TEAM_COOLDOWN_MS", 60_000)?),
            recurring_interval: interval_secs("RECURRING_TASK_SECS", 60)?,
            token_retry: RetryPolicy {
                interval: interval_secs("TOKEN_RETRY_SECS", 30)?,
                max_attempts,
            },
            endpoints: TwitchEndpoints {
                id_base: get("TWITCH_ID_BASE").unwrap_or(defaults.id_base),
                helix_base: get("TWITCH_HELIX_BASE").unwrap_or(defaults.helix_base),
                eventsub_ws_url: get("TWITCH_EVENTSUB_WS_URL").unwrap_or(defaults.eventsub_ws_url),
            },
        })
    }

    /// Port the callback server has to listen on for `redirect_uri` to reach
    /// it. `None` when the URI does not parse.
    pub fn callback_port(&self) -> Option<u16> {
        reqwest::Url::parse(&self.redirect_uri)
            .ok()?
            .port_or_known_default()
    }

    /// Moves the callback server to `port` and points `redirect_uri` at it.
    pub fn use_callback_port(&mut self, port: u16) {
        self.redirect_uri = local_redirect_uri(port);
    }

    /// Minimal config for tests and tools that only need credentials.
    pub fn with_client(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: local_redirect_uri(DEFAULT_CALLBACK_PORT),
            token_file: PathBuf::from("token.json"),
            database_path: "./database.sqlite".to_string(),
            scoreboard_url: "http://localhost:3000/ganadores".to_string(),
            show_players_room: "dedsafio".to_string(),
            scoreboard_room: "queensleague".to_string(),
            team_cooldown: Duration::from_millis(60_000),
            recurring_interval: Duration::from_secs(60),
            token_retry: RetryPolicy::default(),
            endpoints: TwitchEndpoints::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_client_is_set() {
        let cfg = BotConfig::from_lookup(lookup(&[
            ("TWITCH_CLIENT_ID", "cid"),
            ("TWITCH_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(cfg.client_id, "cid");
        assert_eq!(cfg.team_cooldown, Duration::from_millis(60_000));
        assert_eq!(cfg.token_retry, RetryPolicy::default());
        assert_eq!(cfg.show_players_room, "dedsafio");
        assert_eq!(cfg.endpoints, TwitchEndpoints::default());
        assert_eq!(cfg.endpoints.token_url(), "https://id.twitch.tv/oauth2/token");
    }

    #[test]
    fn missing_client_id_is_an_error() {
        let err = BotConfig::from_lookup(lookup(&[("TWITCH_CLIENT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("TWITCH_CLIENT_ID"));
    }

    #[test]
    fn retry_policy_can_be_bounded() {
        let cfg = BotConfig::from_lookup(lookup(&[
            ("TWITCH_CLIENT_ID", "cid"),
            ("TWITCH_CLIENT_SECRET", "secret"),
            ("TOKEN_RETRY_SECS", "1"),
            ("TOKEN_RETRY_MAX_ATTEMPTS", "3"),
        ]))
        .unwrap();

        assert_eq!(cfg.token_retry, RetryPolicy::bounded(Duration::from_secs(1), 3));
        assert!(!cfg.token_retry.exhausted(2));
        assert!(cfg.token_retry.exhausted(3));
        assert!(!RetryPolicy::default().exhausted(u32::MAX));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            ("TWITCH_CLIENT_ID", "cid"),
            ("TWITCH_CLIENT_SECRET", "secret"),
            ("TEAM_COOLDOWN_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        for key in ["RECURRING_TASK_SECS", "TOKEN_RETRY_SECS"] {
            let err = BotConfig::from_lookup(lookup(&[
                ("TWITCH_CLIENT_ID", "cid"),
                ("TWITCH_CLIENT_SECRET", "secret"),
                (key, "0"),
            ]))
            .unwrap_err();
            assert!(matches!(err, Error::Parse(_)));
            assert!(err.to_string().contains(key));
        }

        let cfg = BotConfig::from_lookup(lookup(&[
            ("TWITCH_CLIENT_ID", "cid"),
            ("TWITCH_CLIENT_SECRET", "secret"),
            ("RECURRING_TASK_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.recurring_interval, Duration::from_secs(1));
    }

    #[test]
    fn callback_port_follows_redirect_uri() {
        let mut cfg = BotConfig::with_client("cid", "secret");
        assert_eq!(cfg.callback_port(), Some(DEFAULT_CALLBACK_PORT));

        cfg.use_callback_port(8123);
        assert_eq!(cfg.redirect_uri, "http://localhost:8123/callback");
        assert_eq!(cfg.callback_port(), Some(8123));

        let cfg = BotConfig::from_lookup(lookup(&[
            ("TWITCH_CLIENT_ID", "cid"),
            ("TWITCH_CLIENT_SECRET", "secret"),
            ("TWITCH_REDIRECT_URI", "http://localhost:7000/callback"),
        ]))
        .unwrap();
        assert_eq!(cfg.callback_port(), Some(7000));

        let mut cfg = BotConfig::with_client("cid", "secret");
        cfg.redirect_uri = "not a url".to_string();
        assert_eq!(cfg.callback_port(), None);
    }
}

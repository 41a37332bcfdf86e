// File: scorebot-core/src/services/commands.rs
//
// Chat command table and dispatcher. Dispatch only decides; the action
// executor performs the I/O.

use std::time::Duration;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use scorebot_common::models::{BotRuntimeState, ChatEvent, Score};
use crate::config::BotConfig;

static PREDICTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2})-([0-9]{1,2})$").expect("prediction regex")
});

// `!team`, case-insensitive, with at most one trailing invisible marker that
// some chat clients append to repeated messages.
static TEAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*!team\s*(?:\x{200B}|\x{200C}|\x{200D}|\x{FEFF}| \x{E0000})?$")
        .expect("team regex")
});

pub const SHOW_PLAYERS_EVENT: &str = "showPlayers";

/// One side effect decided by the dispatcher, run in order by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    UpsertPrediction {
        user_id: String,
        username: String,
        home: i64,
        away: i64,
    },
    ClearPredictions,
    ClearWinners,
    /// Snapshot every prediction matching the score into the winner ledger.
    RecordWinners { home: i64, away: i64 },
    /// Whisper the accumulated winner ledger to `to_user_id`.
    WhisperWinners { to_user_id: String },
    EmitToRoom { room: String, event: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Anyone,
    /// Broadcaster or moderator badge required.
    Privileged,
}

#[derive(Clone, Copy)]
pub enum Trigger {
    Exact(&'static str),
    Prefix(&'static str),
    Pattern(&'static Lazy<Regex>),
}

impl Trigger {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Exact(lit) => text == *lit,
            Trigger::Prefix(prefix) => text.starts_with(prefix),
            Trigger::Pattern(re) => re.is_match(text),
        }
    }
}

pub struct CommandContext<'a> {
    pub event: &'a ChatEvent,
    pub now: DateTime<Utc>,
    pub settings: &'a DispatchSettings,
    /// Rendered `!help` text.
    pub help: &'a str,
}

pub type CommandHandler = fn(&CommandContext<'_>, &mut BotRuntimeState) -> Vec<Action>;

pub struct CommandSpec {
    pub name: &'static str,
    /// Shown by `!help`; `None` keeps the command out of the listing.
    pub usage: Option<&'static str>,
    pub trigger: Trigger,
    pub privilege: Privilege,
    pub handler: CommandHandler,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub scoreboard_url: String,
    pub show_players_room: String,
    pub team_cooldown: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            scoreboard_url: config.scoreboard_url.clone(),
            show_players_room: config.show_players_room.clone(),
            team_cooldown: config.team_cooldown,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&BotConfig::with_client("", ""))
    }
}

pub struct CommandDispatcher {
    settings: DispatchSettings,
    table: Vec<CommandSpec>,
    help: String,
}

impl CommandDispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        let table = builtin_commands();
        let help = render_help(&table);
        Self { settings, table, help }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.table
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    /// Runs every table entry whose trigger matches `event.text`, in table
    /// order, and returns the concatenated actions.
    pub fn dispatch(
        &self,
        event: &ChatEvent,
        state: &mut BotRuntimeState,
        now: DateTime<Utc>,
    ) -> Vec<Action> {
        let privileged = event.is_privileged();
        let ctx = CommandContext {
            event,
            now,
            settings: &self.settings,
            help: &self.help,
        };

        let mut actions = Vec::new();
        for spec in &self.table {
            if !spec.trigger.matches(&event.text) {
                continue;
            }
            if spec.privilege == Privilege::Privileged && !privileged {
                debug!(
                    "[Commands] <{}> lacks privilege for {}",
                    event.chatter_login, spec.name
                );
                continue;
            }
            if !matches!(spec.trigger, Trigger::Pattern(_)) {
                info!(
                    "[Commands] privileged={} #{} <{}> {}",
                    privileged, event.broadcaster_login, event.chatter_login, event.text
                );
            }
            actions.extend((spec.handler)(&ctx, state));
        }
        actions
    }
}

/// The built-in command grammar.
pub fn builtin_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "prediction",
            usage: None,
            trigger: Trigger::Pattern(&PREDICTION_RE),
            privilege: Privilege::Anyone,
            handler: handle_prediction,
        },
        CommandSpec {
            name: "!ping",
            usage: None,
            trigger: Trigger::Exact("!ping"),
            privilege: Privilege::Anyone,
            handler: |_, _| vec![Action::Reply("pong".to_string())],
        },
        CommandSpec {
            name: "!help",
            usage: None,
            trigger: Trigger::Exact("!help"),
            privilege: Privilege::Anyone,
            handler: |ctx, _| vec![Action::Reply(ctx.help.to_string())],
        },
        CommandSpec {
            name: "!start",
            usage: Some("!start - start saving predictions"),
            trigger: Trigger::Exact("!start"),
            privilege: Privilege::Privileged,
            handler: |_, state| {
                state.tracking_enabled = true;
                vec![Action::Reply("Started saving predictions".to_string())]
            },
        },
        CommandSpec {
            name: "!stop",
            usage: Some("!stop - stop saving predictions"),
            trigger: Trigger::Exact("!stop"),
            privilege: Privilege::Privileged,
            handler: |_, state| {
                state.tracking_enabled = false;
                vec![Action::Reply("Stopped saving predictions".to_string())]
            },
        },
        CommandSpec {
            name: "!clear",
            usage: Some("!clear - clear all predictions"),
            trigger: Trigger::Exact("!clear"),
            privilege: Privilege::Privileged,
            handler: |_, _| {
                vec![
                    Action::Reply("Clearing predictions".to_string()),
                    Action::ClearPredictions,
                ]
            },
        },
        CommandSpec {
            name: "!clearWinners",
            usage: Some("!clearWinners - clear the winners list"),
            trigger: Trigger::Exact("!clearWinners"),
            privilege: Privilege::Privileged,
            handler: |_, _| {
                vec![
                    Action::Reply("Clearing winners".to_string()),
                    Action::ClearWinners,
                ]
            },
        },
        CommandSpec {
            name: "!scoreboard",
            usage: Some("!scoreboard - show the scoreboard link"),
            trigger: Trigger::Exact("!scoreboard"),
            privilege: Privilege::Anyone,
            handler: |ctx, _| {
                vec![Action::Reply(format!(
                    "The scoreboard is at: {}",
                    ctx.settings.scoreboard_url
                ))]
            },
        },
        CommandSpec {
            name: "!winners",
            usage: Some("!winners [homeScore-awayScore] - get the winners"),
            trigger: Trigger::Prefix("!winners"),
            privilege: Privilege::Privileged,
            handler: handle_winners,
        },
        CommandSpec {
            name: "!team",
            usage: None,
            trigger: Trigger::Pattern(&TEAM_RE),
            privilege: Privilege::Anyone,
            handler: handle_team,
        },
    ]
}

fn render_help(table: &[CommandSpec]) -> String {
    let lines: Vec<&str> = table.iter().filter_map(|c| c.usage).collect();
    format!("Available commands: {}", lines.join(" | "))
}

fn handle_prediction(ctx: &CommandContext<'_>, state: &mut BotRuntimeState) -> Vec<Action> {
    if !state.tracking_enabled {
        return Vec::new();
    }
    match ctx.event.text.parse::<Score>() {
        Ok(score) => vec![Action::UpsertPrediction {
            user_id: ctx.event.chatter_id.clone(),
            username: ctx.event.chatter_login.clone(),
            home: score.home,
            away: score.away,
        }],
        Err(e) => {
            debug!("[Commands] discarding prediction '{}': {}", ctx.event.text, e);
            Vec::new()
        }
    }
}

fn handle_winners(ctx: &CommandContext<'_>, _state: &mut BotRuntimeState) -> Vec<Action> {
    let raw = ctx.event.text.trim_start_matches("!winners");
    let score = match raw.parse::<Score>() {
        Ok(s) => s,
        Err(e) => {
            warn!("[Commands] ignoring !winners from <{}>: {}", ctx.event.chatter_login, e);
            return Vec::new();
        }
    };

    vec![
        Action::Reply("Fetching winners".to_string()),
        Action::RecordWinners {
            home: score.home,
            away: score.away,
        },
        Action::WhisperWinners {
            to_user_id: ctx.event.chatter_id.clone(),
        },
        Action::Reply(format!("Winners are in: {}", ctx.settings.scoreboard_url)),
    ]
}

fn handle_team(ctx: &CommandContext<'_>, state: &mut BotRuntimeState) -> Vec<Action> {
    info!("[Commands] team: <{}>: {}", ctx.event.chatter_login, ctx.event.text);

    let cooldown_ms = i64::try_from(ctx.settings.team_cooldown.as_millis()).unwrap_or(i64::MAX);
    if let Some(last) = state.last_team_command_at {
        let elapsed_ms = (ctx.now - last).num_milliseconds();
        if elapsed_ms < cooldown_ms {
            let remaining = (cooldown_ms - elapsed_ms + 999) / 1000;
            info!("[Commands] !team blocked. {} seconds remaining", remaining);
            return Vec::new();
        }
    }

    info!("[Commands] showing players");
    state.last_team_command_at = Some(ctx.now);
    vec![Action::EmitToRoom {
        room: ctx.settings.show_players_room.clone(),
        event: SHOW_PLAYERS_EVENT.to_string(),
    }]
}

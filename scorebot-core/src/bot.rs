// File: scorebot-core/src/bot.rs
//
// Runtime object for one bot instance: startup handshake, the EventSub read
// loop, and shutdown.

use std::sync::Arc;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use scorebot_common::models::{BotInfo, BotRuntimeState, BotStatus, Credential, TokenValidation};
use scorebot_common::traits::BroadcastSink;
use crate::auth::CredentialManager;
use crate::config::BotConfig;
use crate::platforms::twitch::requests::EventSubSubscriptionRequest;
use crate::platforms::twitch::TwitchHelixClient;
use crate::platforms::twitch_eventsub::runtime::WELCOME_TIMEOUT;
use crate::platforms::twitch_eventsub::{parse_chat_notification, EventSubConnection, EventSubFrame};
use crate::repositories::PredictionLedger;
use crate::services::{ActionExecutor, CommandDispatcher, DispatchSettings, HelixMessenger};
use crate::tasks::spawn_scoreboard_push_task;
use crate::Error;

const STREAM_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct RunHandle {
    shutdown_tx: watch::Sender<bool>,
    stream_task: JoinHandle<()>,
    recurring_task: JoinHandle<()>,
}

pub struct ScoreBot {
    config: BotConfig,
    credentials: Arc<CredentialManager>,
    helix: TwitchHelixClient,
    ledger: Arc<dyn PredictionLedger>,
    dispatcher: Arc<CommandDispatcher>,
    state: Arc<Mutex<BotRuntimeState>>,
    run: tokio::sync::Mutex<Option<RunHandle>>,
    // Held for the whole of `initialize`; `stop` never takes it.
    starting: tokio::sync::Mutex<()>,
    // Bumped by every `stop` so an in-flight startup gives up.
    stop_generation: watch::Sender<u64>,
}

impl ScoreBot {
    pub fn new(
        config: BotConfig,
        credentials: Arc<CredentialManager>,
        ledger: Arc<dyn PredictionLedger>,
    ) -> Self {
        let helix = TwitchHelixClient::from_endpoints(&config.client_id, &config.endpoints);
        let dispatcher = Arc::new(CommandDispatcher::new(DispatchSettings::from_config(&config)));
        Self {
            config,
            credentials,
            helix,
            ledger,
            dispatcher,
            state: Arc::new(Mutex::new(BotRuntimeState::default())),
            run: tokio::sync::Mutex::new(None),
            starting: tokio::sync::Mutex::new(()),
            stop_generation: watch::Sender::new(0),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn get_status(&self) -> BotStatus {
        self.state.lock().status
    }

    pub fn get_info(&self) -> BotInfo {
        self.state.lock().info()
    }

    /// Copy of the whole runtime state.
    pub fn runtime_state(&self) -> BotRuntimeState {
        self.state.lock().clone()
    }

    /// Blocks until a credential loads and validates, retrying per the
    /// configured policy. A bounded policy gives up with the last error; a
    /// concurrent [`stop`](Self::stop) ends the wait early.
    pub async fn wait_for_valid_token(&self) -> Result<(Credential, TokenValidation), Error> {
        let mut stop_rx = self.stop_generation.subscribe();
        self.poll_for_token(&mut stop_rx).await
    }

    async fn poll_for_token(
        &self,
        stop_rx: &mut watch::Receiver<u64>,
    ) -> Result<(Credential, TokenValidation), Error> {
        let policy = self.config.token_retry;
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match self.try_valid_token().await {
                Ok(pair) => return Ok(pair),
                Err(e) => {
                    if policy.exhausted(attempts) {
                        error!("[Bot] no valid token after {} attempt(s): {}", attempts, e);
                        return Err(e);
                    }
                    warn!(
                        "[Bot] Waiting for valid token ({}). Retrying in {}s...",
                        e,
                        policy.interval.as_secs_f32()
                    );
                    tokio::select! {
                        _ = sleep(policy.interval) => {}
                        _ = stop_rx.changed() => {
                            info!("[Bot] stop() requested; giving up on the token wait");
                            return Err(startup_cancelled());
                        }
                    }
                }
            }
        }
    }

    /// Loads the current credential and asks the identity provider about it.
    pub async fn validate_token(&self) -> Result<TokenValidation, Error> {
        self.credentials.validate_current().await
    }

    async fn try_valid_token(&self) -> Result<(Credential, TokenValidation), Error> {
        let cred = self.credentials.get_valid_credential().await?;
        let validation = self.credentials.validate(&cred.access_token).await?;
        info!("[Bot] Validated token for bot user_id={}", validation.user_id);
        Ok((cred, validation))
    }

    /// Starts the bot in `username`'s channel. Returns once the EventSub
    /// session is welcomed and the chat subscription is registered; any
    /// failure on the way aborts the start.
    pub async fn initialize(&self, username: &str, sink: Arc<dyn BroadcastSink>) -> Result<(), Error> {
        let _starting = self
            .starting
            .try_lock()
            .map_err(|_| Error::Platform("bot is already starting".into()))?;
        let mut stop_rx = self.stop_generation.subscribe();

        {
            let mut run = self.run.lock().await;
            if self.get_status() == BotStatus::Running {
                return Err(Error::Platform("bot is already running".into()));
            }
            if let Some(stale) = run.take() {
                stale.recurring_task.abort();
                stale.stream_task.abort();
            }
        }

        let (cred, validation) = self.poll_for_token(&mut stop_rx).await?;
        let bot_user_id = validation.user_id;

        let channel_user_id = self.helix.get_user_id(&cred.access_token, username).await?;
        info!("[Bot] channel {} => user_id={}", username, channel_user_id);

        let mut conn = EventSubConnection::open(&self.config.endpoints.eventsub_ws_url).await?;
        let session = conn.await_welcome(WELCOME_TIMEOUT).await?;

        let request = EventSubSubscriptionRequest::channel_chat_message(
            &channel_user_id,
            &bot_user_id,
            &session.id,
        );
        if let Err(e) = self
            .helix
            .create_eventsub_subscription(&cred.access_token, &request)
            .await
        {
            error!("[Bot] chat subscription failed: {}", e);
            conn.close().await;
            return Err(e);
        }
        conn.mark_subscribed()?;

        let mut run = self.run.lock().await;
        if stop_rx.has_changed().unwrap_or(true) {
            info!("[Bot] stop() arrived during startup; closing the new session");
            conn.close().await;
            return Err(startup_cancelled());
        }

        self.state
            .lock()
            .mark_running(username, &channel_user_id, &bot_user_id, Utc::now());

        let messenger = Arc::new(HelixMessenger::new(
            self.helix.clone(),
            self.credentials.clone(),
            &channel_user_id,
            &bot_user_id,
        ));
        let executor = ActionExecutor::new(self.ledger.clone(), messenger, sink.clone());

        let recurring_task = spawn_scoreboard_push_task(
            self.ledger.clone(),
            sink,
            self.config.scoreboard_room.clone(),
            self.config.recurring_interval,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stream_task = tokio::spawn(run_stream(
            conn,
            self.dispatcher.clone(),
            executor,
            self.state.clone(),
            shutdown_rx,
            recurring_task.abort_handle(),
        ));

        *run = Some(RunHandle {
            shutdown_tx,
            stream_task,
            recurring_task,
        });

        info!("[Bot] Bot initialized and connected to {} chat", username);
        Ok(())
    }

    /// Closes the stream if open, stops the recurring task and resets the
    /// runtime to `Stopped`. Calling it again changes nothing.
    pub async fn stop(&self) {
        self.stop_generation.send_modify(|generation| *generation = generation.wrapping_add(1));
        let handle = self.run.lock().await.take();

        if let Some(mut h) = handle {
            let _ = h.shutdown_tx.send(true);
            h.recurring_task.abort();
            if tokio::time::timeout(STREAM_SHUTDOWN_GRACE, &mut h.stream_task).await.is_err() {
                warn!("[Bot] stream task did not finish in time; aborting");
                h.stream_task.abort();
            }
        }

        let mut state = self.state.lock();
        if state.status == BotStatus::Running {
            state.mark_stopped(Utc::now());
            info!("[Bot] Bot stopped");
        } else {
            state.channel_user_id = None;
            state.username = None;
            debug!("[Bot] stop() while already stopped");
        }
    }
}

fn startup_cancelled() -> Error {
    Error::Platform("startup cancelled by stop()".into())
}

async fn run_stream(
    mut conn: EventSubConnection,
    dispatcher: Arc<CommandDispatcher>,
    executor: ActionExecutor,
    state: Arc<Mutex<BotRuntimeState>>,
    mut shutdown_rx: watch::Receiver<bool>,
    recurring: AbortHandle,
) {
    let mut stopped_by_request = false;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                stopped_by_request = true;
                conn.close().await;
                break;
            }
            frame = conn.next_frame() => match frame {
                Ok(Some(EventSubFrame::Notification { subscription_type, event })) => {
                    let Some(chat) = parse_chat_notification(&subscription_type, &event) else {
                        debug!("[EventSub] ignoring {} notification", subscription_type);
                        continue;
                    };
                    let actions = {
                        let mut st = state.lock();
                        dispatcher.dispatch(&chat, &mut st, Utc::now())
                    };
                    executor.execute(actions).await;
                }
                Ok(Some(EventSubFrame::SessionReconnect { url })) => {
                    warn!("[EventSub] server asked to reconnect to {}; closing session", url);
                    conn.close().await;
                    break;
                }
                Ok(Some(EventSubFrame::Revocation { subscription_type })) => {
                    warn!("[EventSub] subscription {} revoked; check scopes", subscription_type);
                }
                Ok(Some(EventSubFrame::SessionKeepalive)) => {}
                Ok(Some(EventSubFrame::SessionWelcome(info))) => {
                    debug!("[EventSub] unexpected second welcome (id={})", info.id);
                }
                Ok(Some(EventSubFrame::Other(message_type))) => {
                    debug!("[EventSub] unhandled message_type={}", message_type);
                }
                Ok(None) => {
                    info!("[EventSub] websocket closed.");
                    break;
                }
                Err(e) => {
                    error!("[EventSub] stream error: {}", e);
                    break;
                }
            }
        }
    }

    if !stopped_by_request {
        recurring.abort();
        state.lock().mark_stopped(Utc::now());
        info!("[Bot] Bot stopped after the event stream ended");
    }
}

//! scorebot-server/src/server.rs
//!
//! Wiring for the two binary modes: running the bot in a channel, and the
//! one-time authorization-code flow.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use scorebot_common::models::BotStatus;
use scorebot_core::auth::{start_callback_server, CredentialManager, TwitchTokenClient};
use scorebot_core::eventbus::RoomBroadcaster;
use scorebot_core::repositories::{FileCredentialStore, SqlitePredictionLedger};
use scorebot_core::{BotConfig, Database, Error, ScoreBot};

use crate::Args;

const AUTH_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

fn credential_manager(config: &BotConfig) -> Arc<CredentialManager> {
    let store = Arc::new(FileCredentialStore::new(config.token_file.clone()));
    let endpoint = Arc::new(TwitchTokenClient::from_config(config));
    Arc::new(CredentialManager::new(store, endpoint))
}

/// Logs every room event until the broadcaster shuts down. Stands in for the
/// viewer-facing socket bridge.
async fn spawn_room_logger(rooms: &RoomBroadcaster) -> tokio::task::JoinHandle<()> {
    let mut rx = rooms.subscribe(None).await;
    let mut shutdown_rx = rooms.shutdown_rx.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(evt) = maybe else { break };
                    let payload = evt
                        .payload
                        .as_ref()
                        .map(|p| p.to_string())
                        .unwrap_or_default();
                    info!("[Rooms] {} <- {} {}", evt.room, evt.event, payload);
                }
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

pub async fn run_bot(args: &Args, config: BotConfig) -> Result<(), Error> {
    let channel = args
        .channel
        .clone()
        .ok_or_else(|| Error::Parse("--channel is required in run mode".into()))?;

    info!("Using SQLite database at: {}", config.database_path);
    let db = Database::new(&config.database_path).await?;
    db.migrate().await?;
    let ledger = Arc::new(SqlitePredictionLedger::new(db.pool().clone()));

    let credentials = credential_manager(&config);

    let rooms = RoomBroadcaster::new();
    let room_logger = spawn_room_logger(&rooms).await;

    let bot = ScoreBot::new(config, credentials, ledger);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // The startup token wait can last until someone authorizes the bot.
    tokio::select! {
        res = bot.initialize(&channel, Arc::new(rooms.clone())) => res?,
        _ = &mut ctrl_c => {
            info!("Ctrl-C detected during startup; stopping bot...");
            bot.stop().await;
            rooms.shutdown();
            let _ = room_logger.await;
            return Ok(());
        }
    }

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl-C: {:?}", e);
                }
                info!("Ctrl-C detected; stopping bot...");
                break;
            }
            _ = sleep(STATUS_POLL_INTERVAL) => {
                if bot.get_status() == BotStatus::Stopped {
                    warn!("Event stream ended; bot is stopped. Exiting.");
                    break;
                }
            }
        }
    }

    bot.stop().await;
    rooms.shutdown();
    let _ = room_logger.await;
    Ok(())
}

pub async fn run_auth(config: BotConfig) -> Result<(), Error> {
    let port = config.callback_port().ok_or_else(|| {
        Error::Parse(format!("redirect URI '{}' has no usable port", config.redirect_uri))
    })?;
    let client = TwitchTokenClient::from_config(&config);
    let state = Uuid::new_v4().to_string();

    let (code_rx, shutdown_tx, addr) = start_callback_server(port, Some(state.clone())).await?;
    info!("[Auth] waiting for the redirect on http://{}/callback", addr);

    println!("Open this URL in a browser logged in as the bot account:\n\n{}\n", client.authorize_url(&state));

    let received = timeout(AUTH_CALLBACK_TIMEOUT, code_rx).await;
    let _ = shutdown_tx.send(());
    let callback = received?
        .map_err(|_| Error::Auth("callback server closed before a code arrived".into()))?;

    let manager = credential_manager(&config);
    let credential = manager.exchange_authorization_code(&callback.code).await?;
    let validation = manager.validate(&credential.access_token).await?;

    info!(
        "[Auth] authorized as {} (user_id={}), token {} saved to {}",
        validation.login,
        validation.user_id,
        credential.token_preview(),
        config.token_file.display()
    );
    Ok(())
}

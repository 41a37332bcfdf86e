//! scorebot-core/src/eventbus/mod.rs
//!
//! In-process room broadcaster: every subscriber gets each room event through
//! its own bounded MPSC queue, so a slow viewer bridge applies backpressure
//! instead of losing events.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use scorebot_common::traits::BroadcastSink;
use crate::Error;

/// One `emit_to_room` call, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomEvent {
    pub room: String,
    pub event: String,
    pub payload: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RoomBroadcaster {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<RoomEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 10000;

impl Default for RoomBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<RoomEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        self.subscribers.lock().await.push(tx);
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Delivers to every live subscriber, waiting for queue space. Closed
    /// subscribers are dropped from the list.
    pub async fn publish(&self, event: RoomEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };

        let mut any_closed = false;
        for s in &senders {
            if s.send(event.clone()).await.is_err() {
                any_closed = true;
            }
        }

        if any_closed {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            debug!("[Rooms] pruned closed subscribers, {} left", subs.len());
        }
    }
}

#[async_trait]
impl BroadcastSink for RoomBroadcaster {
    async fn emit_to_room(
        &self,
        room: &str,
        event: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<(), Error> {
        if self.is_shutdown() {
            return Err(Error::EventBus(format!(
                "room broadcaster is shut down; dropped {event} for {room}"
            )));
        }
        debug!("[Rooms] {} <- {}", room, event);
        self.publish(RoomEvent {
            room: room.to_string(),
            event: event.to_string(),
            payload,
            timestamp: Utc::now(),
        })
        .await;
        Ok(())
    }
}

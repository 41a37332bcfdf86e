use async_trait::async_trait;
use crate::error::Error;

/// Push channel towards connected viewers, addressed by room.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn emit_to_room(
        &self,
        room: &str,
        event: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<(), Error>;
}

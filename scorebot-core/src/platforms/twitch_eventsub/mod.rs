// File: scorebot-core/src/platforms/twitch_eventsub/mod.rs

pub mod events;
pub mod frames;
pub mod runtime;
pub mod session;

pub use events::{parse_chat_notification, ChannelChatMessage};
pub use frames::{decode_frame, EventSubFrame, SessionInfo};
pub use runtime::EventSubConnection;
pub use session::{ConnectionState, Session};

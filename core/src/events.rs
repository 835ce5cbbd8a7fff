/// Shared types for the sync core's UI-facing surface
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Summary of one conversation thread (for the conversation list screen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub room_id: String,
    /// The other participant's user id
    pub peer_id: String,
    /// Preview text of the last message
    pub last_preview: String,
    /// RFC3339 timestamp of the last message
    pub last_timestamp: String,
}

/// Real-time events streamed to consumers of the sync core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message arrived from the feed or was created locally
    NewMessage { message: Message },
    /// A provisional message was acknowledged by the backend
    MessageConfirmed { temp_id: String, message: Message },
    /// A provisional message failed to send; the user can retry it
    MessageFailed { message_id: String },
    /// Both users now like each other
    MatchFound { user_id: String },
    /// The backend rejected our credentials even after a refresh
    AuthRequired,
}

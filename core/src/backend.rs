/// Service contracts for the remote backend. The HTTP implementation
/// lives in `http.rs`; tests inject in-memory fakes.
use crate::error::Result;
use crate::message::{ImageRef, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Payload of a message about to be sent. Images are uploaded by an
/// external service before they get here; only their URLs travel on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            images: Vec::new(),
        }
    }

    /// A message must carry text or at least one image
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, |c| c.trim().is_empty()) && self.images.is_empty()
    }
}

/// Both like sets, as the backend reports them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeSets {
    /// Profiles the local user has liked
    pub outgoing: HashSet<String>,
    /// Profiles that have liked the local user
    pub incoming: HashSet<String>,
}

/// Backend response to a like
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub is_match: bool,
}

#[async_trait]
pub trait MessageBackend: Send + Sync {
    /// Full snapshot of a room's messages
    async fn fetch(&self, room_id: &str) -> Result<Vec<Message>>;

    /// Submit a message; returns the confirmed record
    async fn send(&self, room_id: &str, outgoing: &OutgoingMessage) -> Result<Message>;

    /// Record that the room was viewed
    async fn mark_read(&self, room_id: &str) -> Result<()>;
}

#[async_trait]
pub trait RelationshipBackend: Send + Sync {
    async fn fetch_sets(&self) -> Result<LikeSets>;

    async fn like(&self, target_id: &str) -> Result<LikeOutcome>;

    async fn dislike(&self, target_id: &str) -> Result<()>;
}

/// Optional push delivery path. Absence degrades to polling only.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Live message stream for a room. The stream ends when the receiver
    /// is dropped or the connection is lost; the poll fallback covers
    /// whatever the stream misses.
    async fn subscribe(&self, room_id: &str) -> Result<mpsc::Receiver<Message>>;
}

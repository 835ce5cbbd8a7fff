/// Optimistic send path: a message appears in the store the moment the
/// user hits send, and is reconciled with the backend's confirmed record
/// or marked failed. The outcome returned to the caller always reflects
/// the backend's answer, not the optimistic state.
use crate::backend::{MessageBackend, OutgoingMessage};
use crate::error::{ChatError, Result};
use crate::events::ChatEvent;
use crate::message::{DeliveryState, Message};
use crate::message_store::MessageStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Outbox {
    backend: Arc<dyn MessageBackend>,
    store: Arc<RwLock<MessageStore>>,
    events: broadcast::Sender<ChatEvent>,
    room_id: String,
    local_user: String,
    peer_user: String,
}

impl Outbox {
    pub fn new(
        backend: Arc<dyn MessageBackend>,
        store: Arc<RwLock<MessageStore>>,
        events: broadcast::Sender<ChatEvent>,
        room_id: String,
        local_user: &str,
        peer_user: &str,
    ) -> Self {
        Self {
            backend,
            store,
            events,
            room_id,
            local_user: local_user.to_string(),
            peer_user: peer_user.to_string(),
        }
    }

    /// Send a message. Sends for the same room may be issued
    /// back-to-back; each carries its own temporary id, so in-flight
    /// sends never contaminate each other. No automatic retry: retrying
    /// a send on the caller's behalf risks duplicate messages.
    pub async fn send(&self, outgoing: OutgoingMessage) -> Result<Message> {
        if outgoing.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let temp_id = format!("local-{}", Uuid::new_v4());
        let provisional = Message {
            id: temp_id.clone(),
            room_id: self.room_id.clone(),
            sender_id: self.local_user.clone(),
            receiver_id: self.peer_user.clone(),
            content: outgoing.content.clone(),
            images: outgoing.images.clone(),
            created_at: Utc::now(),
            delivery: DeliveryState::Pending,
        };

        self.store.write().await.insert_provisional(provisional.clone());
        let _ = self.events.send(ChatEvent::NewMessage {
            message: provisional,
        });

        match self.backend.send(&self.room_id, &outgoing).await {
            Ok(confirmed) => {
                debug!("message {} confirmed as {}", temp_id, confirmed.id);
                self.store
                    .write()
                    .await
                    .resolve_provisional(&temp_id, confirmed.clone());
                let _ = self.events.send(ChatEvent::MessageConfirmed {
                    temp_id,
                    message: confirmed.clone(),
                });
                Ok(confirmed)
            }
            Err(e) => {
                warn!("send for room {} failed: {}", self.room_id, e);
                self.store.write().await.mark_failed(&temp_id);
                let _ = self.events.send(ChatEvent::MessageFailed {
                    message_id: temp_id,
                });
                Err(e)
            }
        }
    }

    /// Re-send a failed message. The failed entry is removed and its
    /// payload goes out again as a brand-new provisional with a fresh
    /// temporary id.
    pub async fn retry(&self, failed_id: &str) -> Result<Message> {
        let failed = self
            .store
            .write()
            .await
            .take_failed(failed_id)
            .ok_or_else(|| ChatError::NotFound(format!("no failed message {}", failed_id)))?;

        self.send(OutgoingMessage {
            content: failed.content,
            images: failed.images,
        })
        .await
    }
}

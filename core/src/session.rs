/// Per-room assembly: one owned session per open conversation view.
/// The session is constructed on view entry and torn down on exit, so
/// feed loops and timers never outlive the room they belong to and
/// nothing leaks across rooms.
use crate::backend::{MessageBackend, OutgoingMessage, PushChannel};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::events::{ChatEvent, ConversationSummary};
use crate::message::{room_id_for, Message};
use crate::message_store::MessageStore;
use crate::outbox::Outbox;
use crate::read_state::ReadStateTracker;
use crate::transport::{TransportAdapter, TransportUpdate};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ChatSession {
    room_id: String,
    peer_user: String,
    store: Arc<RwLock<MessageStore>>,
    events: broadcast::Sender<ChatEvent>,
    outbox: Outbox,
    read_tracker: ReadStateTracker,
    merge_task: JoinHandle<()>,
}

impl ChatSession {
    /// Open the conversation between `local_user` and `peer_user`: fetch
    /// the opening snapshot, start both delivery paths, and arm the
    /// mark-read timer.
    ///
    /// A transient failure on the opening snapshot is tolerated (the
    /// poll loop recovers); an auth failure is not.
    pub async fn open(
        config: &Config,
        backend: Arc<dyn MessageBackend>,
        push: Option<Arc<dyn PushChannel>>,
        local_user: &str,
        peer_user: &str,
    ) -> Result<Self> {
        let room_id = room_id_for(local_user, peer_user);
        info!("opening chat session for room {}", room_id);

        let store = Arc::new(RwLock::new(MessageStore::new(room_id.clone())));
        let (events, _) = broadcast::channel(64);
        let transport = TransportAdapter::new(config, backend.clone(), push);

        match transport.fetch_snapshot(&room_id).await {
            Ok(snapshot) => {
                store.write().await.merge(snapshot);
            }
            Err(e @ ChatError::Auth(_)) => return Err(e),
            Err(e) => warn!(
                "opening snapshot for room {} failed, polling will recover: {}",
                room_id, e
            ),
        }

        let feed = transport.subscribe(&room_id);
        let merge_task = {
            let store = store.clone();
            let events = events.clone();
            let room = room_id.clone();
            tokio::spawn(async move {
                let mut feed = feed;
                while let Some(update) = feed.recv().await {
                    match update {
                        TransportUpdate::Messages(batch) => {
                            if batch.is_empty() {
                                continue;
                            }
                            let fresh = store.write().await.merge(batch);
                            for id in fresh {
                                if let Some(msg) = store.read().await.get(&id).cloned() {
                                    let _ = events.send(ChatEvent::NewMessage { message: msg });
                                }
                            }
                        }
                        TransportUpdate::AuthRequired => {
                            let _ = events.send(ChatEvent::AuthRequired);
                        }
                    }
                }
                debug!("merge loop for room {} stopped", room);
            })
        };

        let outbox = Outbox::new(
            backend.clone(),
            store.clone(),
            events.clone(),
            room_id.clone(),
            local_user,
            peer_user,
        );

        let mut read_tracker = ReadStateTracker::new(backend, config.mark_read_delay);
        read_tracker.schedule(&room_id);

        Ok(Self {
            room_id,
            peer_user: peer_user.to_string(),
            store,
            events,
            outbox,
            read_tracker,
            merge_task,
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Current ordered view of the conversation
    pub async fn messages(&self) -> Vec<Message> {
        self.store.read().await.messages().to_vec()
    }

    pub async fn summary(&self) -> Option<ConversationSummary> {
        self.store.read().await.summary(&self.peer_user)
    }

    pub async fn send_message(&self, outgoing: OutgoingMessage) -> Result<Message> {
        self.outbox.send(outgoing).await
    }

    pub async fn retry_message(&self, failed_id: &str) -> Result<Message> {
        self.outbox.retry(failed_id).await
    }

    /// Re-arm the mark-read timer, e.g. when the view regains focus
    pub fn mark_viewed(&mut self) {
        let room_id = self.room_id.clone();
        self.read_tracker.schedule(&room_id);
    }

    /// Tear down every room-scoped task. Dropping the session does the
    /// same; this just makes view exit explicit.
    pub fn close(mut self) {
        self.read_tracker.cancel();
        self.merge_task.abort();
        info!("chat session for room {} closed", self.room_id);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.merge_task.abort();
    }
}

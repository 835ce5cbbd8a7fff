/// Dual-path message delivery for one room: a push stream when the
/// backend offers one, plus an interval poll that always runs as the
/// safety net. Both paths feed the same channel; the store's dedup
/// absorbs the overlap, which is intentional redundancy.
use crate::backend::{MessageBackend, PushChannel};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// One item on a room feed
#[derive(Debug)]
pub enum TransportUpdate {
    /// A batch of raw message records (poll snapshot or push event)
    Messages(Vec<Message>),
    /// The backend rejected our credentials even after a refresh;
    /// the caller owns what happens next
    AuthRequired,
}

/// Handle to an active room subscription. Dropping it (or calling
/// `close`) stops both delivery paths.
pub struct RoomFeed {
    rx: mpsc::Receiver<TransportUpdate>,
    tasks: Vec<JoinHandle<()>>,
}

impl RoomFeed {
    pub async fn recv(&mut self) -> Option<TransportUpdate> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.rx.close();
    }
}

impl Drop for RoomFeed {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub struct TransportAdapter {
    backend: Arc<dyn MessageBackend>,
    push: Option<Arc<dyn PushChannel>>,
    poll_interval: Duration,
}

impl TransportAdapter {
    pub fn new(
        config: &Config,
        backend: Arc<dyn MessageBackend>,
        push: Option<Arc<dyn PushChannel>>,
    ) -> Self {
        let push = if config.push_enabled { push } else { None };
        Self {
            backend,
            push,
            poll_interval: config.poll_interval,
        }
    }

    /// Full fetch, used on screen open and on each poll tick
    pub async fn fetch_snapshot(&self, room_id: &str) -> Result<Vec<Message>> {
        self.backend.fetch(room_id).await
    }

    /// Start both delivery paths for a room. Loops end when the feed is
    /// closed or dropped; a send on a closed channel is the signal that
    /// the room is no longer being viewed.
    pub fn subscribe(&self, room_id: &str) -> RoomFeed {
        let (tx, rx) = mpsc::channel(32);
        let mut tasks = Vec::new();

        tasks.push(self.spawn_poll_loop(room_id, tx.clone()));
        if let Some(push) = self.push.clone() {
            tasks.push(spawn_push_loop(push, room_id, tx));
        }

        RoomFeed { rx, tasks }
    }

    fn spawn_poll_loop(&self, room_id: &str, tx: mpsc::Sender<TransportUpdate>) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let room = room_id.to_string();
        let every = self.poll_interval;
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the session already
            // fetched its opening snapshot, so swallow it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match backend.fetch(&room).await {
                    Ok(batch) => {
                        if tx.send(TransportUpdate::Messages(batch)).await.is_err() {
                            break;
                        }
                    }
                    Err(ChatError::Auth(reason)) => {
                        warn!("poll for room {} hit an auth failure: {}", room, reason);
                        if tx.send(TransportUpdate::AuthRequired).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // Transient: known messages stay put, next tick retries
                        warn!("poll for room {} failed: {}", room, e);
                    }
                }
            }
            debug!("poll loop for room {} stopped", room);
        })
    }
}

fn spawn_push_loop(
    push: Arc<dyn PushChannel>,
    room_id: &str,
    tx: mpsc::Sender<TransportUpdate>,
) -> JoinHandle<()> {
    let room = room_id.to_string();
    tokio::spawn(async move {
        match push.subscribe(&room).await {
            Ok(mut events) => {
                while let Some(msg) = events.recv().await {
                    if tx.send(TransportUpdate::Messages(vec![msg])).await.is_err() {
                        break;
                    }
                }
                debug!("push stream for room {} ended, polling covers the gap", room);
            }
            Err(e) => {
                // Degrade to polling only
                warn!("push subscribe for room {} failed: {}", room, e);
            }
        }
    })
}

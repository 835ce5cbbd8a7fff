/// Delayed mark-read. The delay gives the user a moment to see unread
/// messages before the room is reported as read; closing the view first
/// cancels the timer.
use crate::backend::MessageBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

pub struct ReadStateTracker {
    backend: Arc<dyn MessageBackend>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ReadStateTracker {
    pub fn new(backend: Arc<dyn MessageBackend>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            pending: None,
        }
    }

    /// Arm the one-shot timer. Re-arming cancels the previous timer.
    pub fn schedule(&mut self, room_id: &str) {
        self.cancel();
        let backend = self.backend.clone();
        let delay = self.delay;
        let room = room_id.to_string();
        self.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            // Best-effort: a missed mark-read is not retried
            match backend.mark_read(&room).await {
                Ok(()) => debug!("room {} marked read", room),
                Err(e) => warn!("mark-read for room {} failed: {}", room, e),
            }
        }));
    }

    /// Disarm the timer before it fires
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for ReadStateTracker {
    fn drop(&mut self) {
        self.cancel();
    }
}

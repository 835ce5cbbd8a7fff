/// Like/match reconciliation. The backend is the authority for whether
/// an action created a match, so every toggle is followed by a full
/// refresh of both sets. Match detection is edge-triggered: only a
/// transition into matched fires the signal.
use crate::backend::{LikeSets, RelationshipBackend};
use crate::error::{ChatError, Result};
use crate::events::ChatEvent;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

pub struct RelationshipReconciler {
    backend: Arc<dyn RelationshipBackend>,
    sets: RwLock<LikeSets>,
    events: broadcast::Sender<ChatEvent>,
}

impl RelationshipReconciler {
    pub fn new(backend: Arc<dyn RelationshipBackend>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            backend,
            sets: RwLock::new(LikeSets::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Matched iff both directions like each other, computed on the
    /// current sets; never cached across a mutation.
    pub async fn is_match(&self, target_id: &str) -> bool {
        let sets = self.sets.read().await;
        sets.outgoing.contains(target_id) && sets.incoming.contains(target_id)
    }

    pub async fn like_sets(&self) -> LikeSets {
        self.sets.read().await.clone()
    }

    /// Full replace of both sets from the backend; safe to run
    /// concurrently with an in-flight toggle, last refresh wins. Every
    /// target that transitioned into matched fires `MatchFound` once.
    pub async fn refresh(&self) -> Result<()> {
        let fresh = self.backend.fetch_sets().await?;
        let newly_matched = {
            let mut sets = self.sets.write().await;
            let before = matched(&sets);
            *sets = fresh;
            let after = matched(&sets);
            after.difference(&before).cloned().collect::<Vec<_>>()
        };
        for user_id in newly_matched {
            debug!("match transition for {}", user_id);
            let _ = self.events.send(ChatEvent::MatchFound { user_id });
        }
        Ok(())
    }

    /// Flip the local like state for `target_id`, tell the backend, then
    /// reconcile. Returns whether the target is now liked locally.
    ///
    /// A failed backend call does not roll the flip back; the
    /// unconditional refresh that follows is what brings local state
    /// back in line with the backend, on this call or a later one.
    /// Auth failures are the exception and always propagate.
    pub async fn toggle_like(&self, target_id: &str) -> Result<bool> {
        let now_liked = {
            let mut sets = self.sets.write().await;
            if sets.outgoing.remove(target_id) {
                false
            } else {
                sets.outgoing.insert(target_id.to_string());
                true
            }
        };

        let call = if now_liked {
            self.backend.like(target_id).await.map(|outcome| {
                if outcome.is_match {
                    debug!("backend reports an instant match with {}", target_id);
                }
            })
        } else {
            self.backend.dislike(target_id).await
        };

        let refresh = self.refresh().await;

        match call {
            Err(e @ ChatError::Auth(_)) => return Err(e),
            Err(e) => warn!("toggle for {} failed, local flip stands: {}", target_id, e),
            Ok(()) => {}
        }
        match refresh {
            Err(e @ ChatError::Auth(_)) => return Err(e),
            Err(e) => warn!("refresh after toggle failed: {}", e),
            Ok(()) => {}
        }

        Ok(now_liked)
    }
}

fn matched(sets: &LikeSets) -> HashSet<String> {
    sets.outgoing.intersection(&sets.incoming).cloned().collect()
}

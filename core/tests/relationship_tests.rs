/// Relationship reconciler tests
/// Match derivation, transition signals, and the documented
/// optimistic-without-rollback toggle policy
use async_trait::async_trait;
use emberlink_core::backend::{LikeOutcome, LikeSets, RelationshipBackend};
use emberlink_core::error::{ChatError, Result};
use emberlink_core::{ChatEvent, RelationshipReconciler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct MockRelationship {
    sets: Mutex<LikeSets>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    auth_fail: AtomicBool,
}

impl MockRelationship {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sets: Mutex::new(LikeSets::default()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            auth_fail: AtomicBool::new(false),
        })
    }

    fn seed_incoming(&self, user: &str) {
        self.sets.lock().unwrap().incoming.insert(user.to_string());
    }

    fn replace(&self, sets: LikeSets) {
        *self.sets.lock().unwrap() = sets;
    }
}

#[async_trait]
impl RelationshipBackend for MockRelationship {
    async fn fetch_sets(&self) -> Result<LikeSets> {
        if self.auth_fail.load(Ordering::SeqCst) {
            return Err(ChatError::Auth("token expired".to_string()));
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChatError::Network("connection reset".to_string()));
        }
        Ok(self.sets.lock().unwrap().clone())
    }

    async fn like(&self, target_id: &str) -> Result<LikeOutcome> {
        if self.auth_fail.load(Ordering::SeqCst) {
            return Err(ChatError::Auth("token expired".to_string()));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChatError::Network("connection reset".to_string()));
        }
        let mut sets = self.sets.lock().unwrap();
        sets.outgoing.insert(target_id.to_string());
        Ok(LikeOutcome {
            is_match: sets.incoming.contains(target_id),
        })
    }

    async fn dislike(&self, target_id: &str) -> Result<()> {
        if self.auth_fail.load(Ordering::SeqCst) {
            return Err(ChatError::Auth("token expired".to_string()));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChatError::Network("connection reset".to_string()));
        }
        self.sets.lock().unwrap().outgoing.remove(target_id);
        Ok(())
    }
}

#[tokio::test]
async fn match_requires_both_directions() {
    let backend = MockRelationship::new();
    let reconciler = RelationshipReconciler::new(backend.clone());
    reconciler.refresh().await.unwrap();
    assert!(!reconciler.is_match("bob").await);

    let liked = reconciler.toggle_like("bob").await.unwrap();
    assert!(liked);
    assert!(
        !reconciler.is_match("bob").await,
        "one direction alone is not a match"
    );

    backend.seed_incoming("bob");
    reconciler.refresh().await.unwrap();
    assert!(reconciler.is_match("bob").await);
}

#[tokio::test]
async fn dislike_kills_the_match_despite_incoming_like() {
    let backend = MockRelationship::new();
    backend.seed_incoming("bob");
    let reconciler = RelationshipReconciler::new(backend.clone());

    reconciler.toggle_like("bob").await.unwrap();
    assert!(reconciler.is_match("bob").await);

    let liked = reconciler.toggle_like("bob").await.unwrap();
    assert!(!liked);
    assert!(!reconciler.is_match("bob").await);

    let sets = reconciler.like_sets().await;
    assert!(sets.incoming.contains("bob"));
    assert!(!sets.outgoing.contains("bob"));
}

#[tokio::test]
async fn match_signal_fires_exactly_once() {
    let backend = MockRelationship::new();
    backend.seed_incoming("bob");
    let reconciler = RelationshipReconciler::new(backend.clone());
    let mut events = reconciler.subscribe();

    // Liking bob makes the refresh reveal the mutual like
    reconciler.toggle_like("bob").await.unwrap();

    match events.try_recv().unwrap() {
        ChatEvent::MatchFound { user_id } => assert_eq!(user_id, "bob"),
        other => panic!("expected MatchFound, got {:?}", other),
    }

    // Further refreshes still report matched but must not re-fire
    reconciler.refresh().await.unwrap();
    reconciler.refresh().await.unwrap();
    assert!(
        events.try_recv().is_err(),
        "the match signal fires on the transition only"
    );
}

#[tokio::test]
async fn toggle_failure_leaves_the_optimistic_flip() {
    let backend = MockRelationship::new();
    backend.fail_writes.store(true, Ordering::SeqCst);
    backend.fail_reads.store(true, Ordering::SeqCst);
    let reconciler = RelationshipReconciler::new(backend.clone());

    // Backend unreachable: the toggle is non-fatal and the flip stays
    let liked = reconciler.toggle_like("bob").await.unwrap();
    assert!(liked);
    assert!(
        reconciler.like_sets().await.outgoing.contains("bob"),
        "no rollback on toggle failure"
    );

    // Once the backend is reachable again, reconciliation corrects the
    // drift: the backend never recorded the like
    backend.fail_reads.store(false, Ordering::SeqCst);
    reconciler.refresh().await.unwrap();
    assert!(!reconciler.like_sets().await.outgoing.contains("bob"));
}

#[tokio::test]
async fn refresh_replaces_both_sets_entirely() {
    let backend = MockRelationship::new();
    let reconciler = RelationshipReconciler::new(backend.clone());

    let mut first = LikeSets::default();
    first.outgoing.insert("bob".to_string());
    first.incoming.insert("carol".to_string());
    backend.replace(first.clone());
    reconciler.refresh().await.unwrap();
    assert_eq!(reconciler.like_sets().await, first);

    let mut second = LikeSets::default();
    second.outgoing.insert("dave".to_string());
    backend.replace(second.clone());
    reconciler.refresh().await.unwrap();
    assert_eq!(reconciler.like_sets().await, second, "last refresh wins");
}

#[tokio::test]
async fn auth_failure_always_propagates() {
    let backend = MockRelationship::new();
    backend.auth_fail.store(true, Ordering::SeqCst);
    let reconciler = RelationshipReconciler::new(backend.clone());

    assert!(matches!(
        reconciler.refresh().await,
        Err(ChatError::Auth(_))
    ));
    assert!(matches!(
        reconciler.toggle_like("bob").await,
        Err(ChatError::Auth(_))
    ));
}

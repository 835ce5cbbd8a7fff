/// In-memory message list for one room: ordered by timestamp,
/// deduplicated by id, merging optimistic local writes with confirmed
/// server records. Owned by the active conversation view, not shared
/// across rooms.
use crate::events::ConversationSummary;
use crate::message::{DeliveryState, Message};

pub struct MessageStore {
    room_id: String,
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Current view of the conversation, ascending by `created_at`
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Merge a batch of records from the transport. A known id is
    /// replaced in place (confirmed data wins over whatever we had);
    /// unknown ids are inserted. Tolerates out-of-order arrival: the
    /// list is re-sorted whenever anything changed.
    ///
    /// Returns the ids that were new to this store.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Message>) -> Vec<String> {
        let mut fresh = Vec::new();
        let mut changed = false;
        for msg in incoming {
            changed = true;
            match self.messages.iter_mut().find(|m| m.id == msg.id) {
                Some(existing) => {
                    *existing = msg;
                }
                None => {
                    fresh.push(msg.id.clone());
                    self.messages.push(msg);
                }
            }
        }
        if changed {
            self.resort();
        }
        fresh
    }

    /// Add a locally created entry. Used only by the send path; the
    /// entry must be Pending.
    pub fn insert_provisional(&mut self, message: Message) {
        debug_assert_eq!(message.delivery, DeliveryState::Pending);
        self.messages.push(message);
        self.resort();
    }

    /// Swap the entry keyed by `temp_id` for the confirmed record in a
    /// single step: consumers never observe both or neither. The push
    /// path may already have delivered the confirmed record under its
    /// server id, so any entry with that id is collapsed too.
    ///
    /// Returns whether a provisional entry was actually present.
    pub fn resolve_provisional(&mut self, temp_id: &str, confirmed: Message) -> bool {
        let had_provisional = match self.messages.iter().position(|m| m.id == temp_id) {
            Some(pos) => {
                self.messages.remove(pos);
                true
            }
            None => false,
        };
        self.messages.retain(|m| m.id != confirmed.id);
        self.messages.push(confirmed);
        self.resort();
        had_provisional
    }

    /// Mark a provisional entry as failed so the UI can offer a retry.
    pub fn mark_failed(&mut self, temp_id: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == temp_id) {
            Some(m) if m.delivery == DeliveryState::Pending => {
                m.delivery = DeliveryState::Failed;
                true
            }
            _ => false,
        }
    }

    /// Remove a failed entry and hand it back so a retry can re-send its
    /// payload as a brand-new provisional. Failed entries are never
    /// resurrected in place.
    pub fn take_failed(&mut self, id: &str) -> Option<Message> {
        let pos = self
            .messages
            .iter()
            .position(|m| m.id == id && m.delivery == DeliveryState::Failed)?;
        Some(self.messages.remove(pos))
    }

    /// Row for the conversation list screen
    pub fn summary(&self, peer_id: &str) -> Option<ConversationSummary> {
        let last = self.messages.last()?;
        let preview = match &last.content {
            Some(text) => text.clone(),
            None if !last.images.is_empty() => "[image]".to_string(),
            None => String::new(),
        };
        Some(ConversationSummary {
            room_id: self.room_id.clone(),
            peer_id: peer_id.to_string(),
            last_preview: preview,
            last_timestamp: last.created_at.to_rfc3339(),
        })
    }

    fn resort(&mut self) {
        // Tie-break on id so equal timestamps order deterministically
        self.messages
            .sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, secs: u32) -> Message {
        Message {
            id: id.to_string(),
            room_id: "alice:bob".to_string(),
            sender_id: "bob".to_string(),
            receiver_id: "alice".to_string(),
            content: Some(format!("msg {}", id)),
            images: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, secs).unwrap(),
            delivery: DeliveryState::Confirmed,
        }
    }

    fn pending(id: &str, secs: u32) -> Message {
        Message {
            delivery: DeliveryState::Pending,
            ..msg(id, secs)
        }
    }

    #[test]
    fn merge_dedups_by_id() {
        let mut store = MessageStore::new("alice:bob");
        store.merge(vec![msg("m1", 0), msg("m2", 1)]);
        // Same id again, updated content
        let mut updated = msg("m1", 0);
        updated.content = Some("edited".to_string());
        let fresh = store.merge(vec![updated]);

        assert!(fresh.is_empty(), "known id must not count as fresh");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("m1").unwrap().content.as_deref(), Some("edited"));
    }

    #[test]
    fn merge_tolerates_out_of_order_arrival() {
        let mut store = MessageStore::new("alice:bob");
        store.merge(vec![msg("m3", 30)]);
        store.merge(vec![msg("m1", 10), msg("m2", 20)]);

        let ids: Vec<&str> = store.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn merge_same_batch_twice_is_idempotent() {
        let mut store = MessageStore::new("alice:bob");
        let batch = vec![msg("m1", 0), msg("m2", 1)];
        store.merge(batch.clone());
        store.merge(batch);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn provisional_resolution_is_atomic() {
        let mut store = MessageStore::new("alice:bob");
        store.insert_provisional(pending("local-1", 5));
        assert!(store.get("local-1").unwrap().is_pending());

        let had = store.resolve_provisional("local-1", msg("m1", 5));
        assert!(had);
        assert_eq!(store.len(), 1, "pending and confirmed must collapse into one entry");
        assert!(store.get("local-1").is_none());
        assert_eq!(store.get("m1").unwrap().delivery, DeliveryState::Confirmed);
    }

    #[test]
    fn resolve_collapses_push_delivered_duplicate() {
        // The push path races the send ack: the confirmed record can land
        // via merge before the provisional is resolved.
        let mut store = MessageStore::new("alice:bob");
        store.insert_provisional(pending("local-1", 5));
        store.merge(vec![msg("m1", 5)]);
        assert_eq!(store.len(), 2);

        store.resolve_provisional("local-1", msg("m1", 5));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("m1").unwrap().delivery, DeliveryState::Confirmed);
    }

    #[test]
    fn mark_failed_touches_only_pending_entries() {
        let mut store = MessageStore::new("alice:bob");
        store.merge(vec![msg("m1", 0)]);
        store.insert_provisional(pending("local-1", 1));

        assert!(!store.mark_failed("m1"), "confirmed entries never fail");
        assert!(store.mark_failed("local-1"));
        assert!(store.get("local-1").unwrap().is_failed());
    }

    #[test]
    fn take_failed_removes_the_entry() {
        let mut store = MessageStore::new("alice:bob");
        store.insert_provisional(pending("local-1", 1));
        store.mark_failed("local-1");

        let taken = store.take_failed("local-1").unwrap();
        assert_eq!(taken.id, "local-1");
        assert!(store.is_empty());
        assert!(store.take_failed("local-1").is_none());
    }

    #[test]
    fn summary_reflects_last_message() {
        let mut store = MessageStore::new("alice:bob");
        assert!(store.summary("bob").is_none());

        store.merge(vec![msg("m1", 0), msg("m2", 1)]);
        let summary = store.summary("bob").unwrap();
        assert_eq!(summary.room_id, "alice:bob");
        assert_eq!(summary.last_preview, "msg m2");
    }
}

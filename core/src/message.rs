/// Chat message model and room identity
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery state of a message as seen by this client.
/// The wire never carries it; records from the backend are Confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Created locally, not yet acknowledged by the backend
    Pending,
    /// Accepted by the backend
    #[default]
    Confirmed,
    /// Rejected by the backend or lost to a network error
    Failed,
}

/// Reference to an already-uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One chat message. Confirmed messages carry a server-issued id;
/// provisional ones carry a client-issued temporary id until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub delivery: DeliveryState,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        self.delivery == DeliveryState::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.delivery == DeliveryState::Failed
    }
}

/// Deterministic room id for an unordered participant pair. Both
/// participants compute the same id independently.
pub fn room_id_for(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_ignores_participant_order() {
        assert_eq!(room_id_for("alice", "bob"), room_id_for("bob", "alice"));
        assert_eq!(room_id_for("alice", "bob"), "alice:bob");
    }

    #[test]
    fn room_id_sorts_lexicographically() {
        assert_eq!(room_id_for("u42", "u7"), "u42:u7");
        assert_eq!(room_id_for("u7", "u42"), "u42:u7");
    }

    #[test]
    fn wire_records_deserialize_as_confirmed() {
        let json = r#"{
            "id": "m1",
            "room_id": "alice:bob",
            "sender_id": "bob",
            "receiver_id": "alice",
            "content": "hey",
            "created_at": "2026-08-01T12:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.delivery, DeliveryState::Confirmed);
        assert!(msg.images.is_empty());
    }
}

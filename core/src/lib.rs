/// Emberlink sync core
///
/// The chat and mutual-interest synchronization engine of the Emberlink
/// client: merging a dual-channel message feed against optimistic local
/// writes, and deriving the matched state from two independently updated
/// like sets.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod message;
pub mod message_store;
pub mod outbox;
pub mod read_state;
pub mod relationship;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{ChatError, Result};
pub use events::{ChatEvent, ConversationSummary};
pub use message::{room_id_for, DeliveryState, ImageRef, Message};
pub use message_store::MessageStore;
pub use relationship::RelationshipReconciler;
pub use session::ChatSession;

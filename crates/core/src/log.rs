//! MessageLog trait — the append-only record of conversation turns.
//!
//! A log stores messages per conversation in creation order. There are no
//! delete or mutate operations; history only ever grows.
//!
//! Implementations: in-memory (ephemeral sessions, tests), SQLite (durable).

use crate::error::StorageError;
use crate::message::{ConversationId, Message};
use async_trait::async_trait;

/// The core MessageLog trait.
///
/// `load` for an unknown conversation returns an empty sequence — the log
/// for an id springs into existence on first append.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Append one message to a conversation's history.
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> std::result::Result<(), StorageError>;

    /// Load the full history for a conversation, in creation order.
    /// A pure read: calling it twice without an intervening append yields
    /// identical sequences.
    async fn load(
        &self,
        conversation_id: &ConversationId,
    ) -> std::result::Result<Vec<Message>, StorageError>;
}

//! In-memory message log — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use banter_core::error::StorageError;
use banter_core::log::MessageLog;
use banter_core::message::{ConversationId, Message};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory log keyed by conversation id. History lives for the
/// process lifetime; the entry for an id is created on first append.
pub struct InMemoryLog {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<Message>>>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageLog for InMemoryLog {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), StorageError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn load(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, StorageError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_core::message::Role;

    #[tokio::test]
    async fn append_and_load_in_order() {
        let log = InMemoryLog::new();
        let id = ConversationId::from("c1");

        log.append(&id, Message::user("hello")).await.unwrap();
        log.append(&id, Message::assistant("hi there")).await.unwrap();

        let history = log.load(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "hi there");
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let log = InMemoryLog::new();
        let history = log.load(&ConversationId::from("never-seen")).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn load_is_a_pure_read() {
        let log = InMemoryLog::new();
        let id = ConversationId::from("c1");
        log.append(&id, Message::user("once")).await.unwrap();

        let first = log.load(&id).await.unwrap();
        let second = log.load(&id).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn conversations_are_independent() {
        let log = InMemoryLog::new();
        log.append(&ConversationId::from("a"), Message::user("in a"))
            .await
            .unwrap();
        log.append(&ConversationId::from("b"), Message::user("in b"))
            .await
            .unwrap();

        let a = log.load(&ConversationId::from("a")).await.unwrap();
        let b = log.load(&ConversationId::from("b")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].content, "in a");
        assert_eq!(b[0].content, "in b");
    }

    #[tokio::test]
    async fn concurrent_appends_across_conversations() {
        let log = Arc::new(InMemoryLog::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let id = ConversationId::from(&format!("c{i}"));
                for turn in 0..5 {
                    log.append(&id, Message::user(format!("msg {turn}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            let history = log
                .load(&ConversationId::from(&format!("c{i}")))
                .await
                .unwrap();
            assert_eq!(history.len(), 5);
            assert_eq!(history[4].content, "msg 4");
        }
    }
}

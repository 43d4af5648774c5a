//! SQLite message log — one row per message, ordered by insertion.
//!
//! A single `messages` table carries every conversation; the
//! autoincrement `seq` column is the sole ordering key. Rows are only
//! ever inserted, never updated or deleted.

use async_trait::async_trait;
use banter_core::error::StorageError;
use banter_core::log::MessageLog;
use banter_core::message::{ConversationId, Message, Role};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite message log.
pub struct SqliteLog {
    pool: SqlitePool,
}

impl SqliteLog {
    /// Create a new SQLite log from a file path.
    ///
    /// The database and table are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StorageError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let log = Self { pool };
        log.run_migrations().await?;
        info!("SQLite message log initialized at {path}");
        Ok(log)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let log = Self { pool };
        log.run_migrations().await?;
        Ok(log)
    }

    /// Run schema migrations — creates the messages table and its index.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                message_id      TEXT NOT NULL,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages(conversation_id, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("conversation index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Message` from a SQLite row.
    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StorageError> {
        let id: String = row
            .try_get("message_id")
            .map_err(|e| StorageError::QueryFailed(format!("message_id column: {e}")))?;
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StorageError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StorageError::QueryFailed(format!("content column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StorageError::QueryFailed(format!("created_at column: {e}")))?;

        let role = Role::from_str(&role_str)
            .map_err(|e| StorageError::MalformedRecord(format!("message {id}: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Message {
            id,
            role,
            content,
            timestamp,
        })
    }
}

#[async_trait]
impl MessageLog for SqliteLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO messages (conversation_id, message_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&conversation_id.0)
        .bind(&message.id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Unavailable(format!("INSERT failed: {e}")))?;

        debug!(conversation = %conversation_id, role = message.role.as_str(), "Message appended");
        Ok(())
    }

    async fn load(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(
            "SELECT message_id, role, content, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY seq ASC",
        )
        .bind(&conversation_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("SELECT failed: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_log() -> SqliteLog {
        SqliteLog::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn append_and_load_in_order() {
        let log = test_log().await;
        let id = ConversationId::from("c1");

        log.append(&id, Message::user("hello")).await.unwrap();
        log.append(&id, Message::assistant("hi there")).await.unwrap();
        log.append(&id, Message::user("bye")).await.unwrap();
        log.append(&id, Message::assistant("later")).await.unwrap();

        let history = log.load(&id).await.unwrap();
        assert_eq!(history.len(), 4);
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "hi there", "bye", "later"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let log = test_log().await;
        let history = log.load(&ConversationId::from("ghost")).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn load_is_a_pure_read() {
        let log = test_log().await;
        let id = ConversationId::from("c1");
        log.append(&id, Message::user("once")).await.unwrap();

        let first = log.load(&id).await.unwrap();
        let second = log.load(&id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].content, second[0].content);
    }

    #[tokio::test]
    async fn conversations_are_partitioned() {
        let log = test_log().await;
        log.append(&ConversationId::from("a"), Message::user("in a"))
            .await
            .unwrap();
        log.append(&ConversationId::from("b"), Message::user("in b"))
            .await
            .unwrap();

        let a = log.load(&ConversationId::from("a")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "in a");
    }

    #[tokio::test]
    async fn roles_survive_the_round_trip() {
        let log = test_log().await;
        let id = ConversationId::from("c1");
        log.append(&id, Message::system("steering")).await.unwrap();
        log.append(&id, Message::user("q")).await.unwrap();
        log.append(&id, Message::assistant("a")).await.unwrap();

        let history = log.load(&id).await.unwrap();
        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn malformed_role_surfaces_as_error() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let log = SqliteLog::from_pool(pool.clone()).await.unwrap();
        let id = ConversationId::from("c1");

        sqlx::query(
            "INSERT INTO messages (conversation_id, message_id, role, content, created_at)
             VALUES ('c1', 'm1', 'narrator', 'once upon a time', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = log.load(&id).await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedRecord(_)));
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let path_str = format!("sqlite://{}", path.display());
        let id = ConversationId::from("c1");

        {
            let log = SqliteLog::new(&path_str).await.unwrap();
            log.append(&id, Message::user("persisted")).await.unwrap();
            log.append(&id, Message::assistant("indeed")).await.unwrap();
        }

        let reopened = SqliteLog::new(&path_str).await.unwrap();
        let history = reopened.load(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "persisted");
        assert_eq!(history[1].content, "indeed");
    }
}

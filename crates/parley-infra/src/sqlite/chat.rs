//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `parley-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, writer transactions
//! around every check-then-mutate sequence.

use parley_core::chat::repository::{ChatCreation, ChatRepository, MessageInsert};
use parley_types::chat::{Chat, ChatId};
use parley_types::error::RepositoryError;
use parley_types::message::{Message, MessageId};
use parley_types::user::UserId;

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Chat.
struct ChatRow {
    id: String,
    is_group: i64,
    created_at: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            is_group: row.try_get("is_group")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Chat {
            id: ChatId::from_uuid(id),
            is_group: self.is_group != 0,
            created_at,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    chat_id: String,
    sender_id: String,
    content: String,
    created_at: String,
    is_read: i64,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            sender_id: row.try_get("sender_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            is_read: row.try_get("is_read")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let chat_id = Uuid::parse_str(&self.chat_id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat_id: {e}")))?;
        let sender_id = Uuid::parse_str(&self.sender_id)
            .map_err(|e| RepositoryError::Query(format!("invalid sender_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Message {
            id: MessageId::from_uuid(id),
            chat_id: ChatId::from_uuid(chat_id),
            sender_id: UserId::from_uuid(sender_id),
            content: self.content,
            created_at,
            is_read: self.is_read != 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn find_by_participant_key(
        &self,
        participant_key: &str,
    ) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT id, is_group, created_at FROM chats WHERE participant_key = ?")
            .bind(participant_key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn create_chat(
        &self,
        is_group: bool,
        participant_key: &str,
        participants: &[UserId],
    ) -> Result<ChatCreation, RepositoryError> {
        let chat = Chat {
            id: ChatId::new(),
            is_group,
            created_at: Utc::now(),
        };

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let insert = sqlx::query(
            "INSERT INTO chats (id, is_group, participant_key, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(chat.id.to_string())
        .bind(chat.is_group as i64)
        .bind(participant_key)
        .bind(format_datetime(&chat.created_at))
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            // Lost the creation race: the fingerprint already exists. Roll
            // back and hand the caller the winner's chat.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                drop(tx);
                return match self.find_by_participant_key(participant_key).await? {
                    Some(existing) => Ok(ChatCreation::AlreadyExists(existing)),
                    None => Err(RepositoryError::Conflict(
                        "chat fingerprint vanished after unique violation".to_string(),
                    )),
                };
            }
            Err(e) => return Err(RepositoryError::Query(e.to_string())),
        }

        for user_id in participants {
            sqlx::query("INSERT INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
                .bind(chat.id.to_string())
                .bind(user_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatCreation::Created(chat))
    }

    async fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT id, is_group, created_at FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn participants(&self, chat_id: &ChatId) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id FROM chat_participants WHERE chat_id = ? ORDER BY user_id",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("user_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let id = Uuid::parse_str(&raw)
                .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
            ids.push(UserId::from_uuid(id));
        }

        Ok(ids)
    }

    async fn is_participant(
        &self,
        chat_id: &ChatId,
        user_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM chat_participants WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn insert_message(
        &self,
        chat_id: &ChatId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<MessageInsert, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Membership check and insert share the transaction so a concurrent
        // mutation on the same chat cannot interleave between them.
        let member = sqlx::query(
            "SELECT 1 AS present FROM chat_participants WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id.to_string())
        .bind(sender_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if member.is_none() {
            // Dropping the transaction rolls it back; nothing was written.
            return Ok(MessageInsert::NotParticipant);
        }

        let message = Message {
            id: MessageId::new(),
            chat_id: *chat_id,
            sender_id: *sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
        };

        sqlx::query(
            r#"INSERT INTO messages (id, chat_id, sender_id, content, created_at, is_read)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(message.is_read as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(MessageInsert::Inserted(message))
    }

    async fn recent_messages(
        &self,
        chat_id: &ChatId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, chat_id, sender_id, content, created_at, is_read
               FROM messages WHERE chat_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(chat_id.to_string())
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn message_count(&self, chat_id: &ChatId) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM messages WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }
}

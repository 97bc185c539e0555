//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `confab-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the reader
//! pool and every mutation on the single-connection writer.

use chrono::{DateTime, Utc};
use confab_core::repository::message::MessageRepository;
use confab_types::error::RepositoryError;
use confab_types::message::{Message, MessageId};
use confab_types::user::UserId;
use sqlx::Row;

use super::directory::{format_datetime, parse_datetime, parse_user_id};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct MessageRow {
    id: String,
    sender_id: String,
    receiver_id: String,
    content: String,
    created_at: String,
    is_read: bool,
    read_at: Option<String>,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            is_read: row.try_get("is_read")?,
            read_at: row.try_get("read_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = self
            .id
            .parse::<uuid::Uuid>()
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let read_at = self
            .read_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(Message {
            id: MessageId::from_uuid(id),
            sender_id: parse_user_id(&self.sender_id)?,
            receiver_id: parse_user_id(&self.receiver_id)?,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            is_read: self.is_read,
            read_at,
        })
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Message>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let r = MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(r.into_message()?);
    }
    Ok(messages)
}

// ---------------------------------------------------------------------------
// MessageRepository impl
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages
               (id, sender_id, receiver_id, content, created_at, is_read, read_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(message.is_read)
        .bind(message.read_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let message = MessageRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_message()?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn conversation(
        &self,
        a: UserId,
        b: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE (sender_id = ? AND receiver_id = ?)
                  OR (sender_id = ? AND receiver_id = ?)
               ORDER BY created_at DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_messages(&rows)
    }

    async fn count_conversation(&self, a: UserId, b: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM messages
               WHERE (sender_id = ? AND receiver_id = ?)
                  OR (sender_id = ? AND receiver_id = ?)"#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        id: MessageId,
        read_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE messages SET is_read = 1, read_at = ? WHERE id = ?")
            .bind(format_datetime(&read_at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_conversation_read(
        &self,
        sender: UserId,
        receiver: UserId,
        read_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        // One statement, atomic at the store level.
        let result = sqlx::query(
            r#"UPDATE messages SET is_read = 1, read_at = ?
               WHERE sender_id = ? AND receiver_id = ? AND is_read = 0"#,
        )
        .bind(format_datetime(&read_at))
        .bind(sender.to_string())
        .bind(receiver.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn unread_count(&self, receiver: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0")
                .bind(receiver.to_string())
                .fetch_one(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }

    async fn clear_conversation(&self, a: UserId, b: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"DELETE FROM messages
               WHERE (sender_id = ? AND receiver_id = ?)
                  OR (sender_id = ? AND receiver_id = ?)"#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

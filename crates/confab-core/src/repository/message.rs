//! MessageRepository trait definition.
//!
//! The append-mostly durable message log: messages are created by the
//! dispatcher, mutated only to flip the read flag, and deleted only through
//! an explicit conversation clear. Uses native async fn in traits (RPITIT,
//! Rust 2024 edition).

use chrono::{DateTime, Utc};
use confab_types::error::RepositoryError;
use confab_types::message::{Message, MessageId};
use confab_types::user::UserId;

/// Repository trait for the durable message log.
pub trait MessageRepository: Send + Sync {
    /// Append a new message. The dispatcher never broadcasts before this
    /// returns Ok.
    fn save(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a single message by id.
    fn get(
        &self,
        id: MessageId,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Messages exchanged between two users in either direction, newest
    /// first (callers reverse for display).
    fn conversation(
        &self,
        a: UserId,
        b: UserId,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Total number of messages exchanged between two users.
    fn count_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Flip the read flag on one message.
    fn mark_read(
        &self,
        id: MessageId,
        read_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Flip the read flag on every unread message from `sender` to
    /// `receiver` in one atomic batch. Returns the number of rows changed.
    fn mark_conversation_read(
        &self,
        sender: UserId,
        receiver: UserId,
        read_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Number of unread messages addressed to `receiver`, across all senders.
    fn unread_count(
        &self,
        receiver: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete every message exchanged between two users, in either
    /// direction. Returns the number of rows deleted.
    fn clear_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}

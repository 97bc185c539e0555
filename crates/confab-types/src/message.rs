//! Persisted message types and the conversation-history response shapes.
//!
//! `Message` is the durable record; `MessageView` is the identity-enriched
//! form delivered over the wire (camelCase fields, embedded user summaries).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::{UserId, UserSummary};

/// Unique identifier for a message, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new MessageId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A durably logged direct message.
///
/// Content is immutable once created; the only permitted mutation is
/// flipping the read flag, and the only permitted deletion is an explicit
/// conversation-history clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Maximum message length in characters, after trimming.
    pub const MAX_CONTENT_CHARS: usize = 1000;

    /// Enrich this record with the sender/receiver identities for delivery.
    pub fn into_view(self, sender: UserSummary, receiver: UserSummary) -> MessageView {
        MessageView {
            id: self.id,
            sender,
            receiver,
            content: self.content,
            created_at: self.created_at,
            is_read: self.is_read,
            read_at: self.read_at,
        }
    }
}

/// A message as delivered to clients: the persisted record plus the
/// resolved sender and receiver identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Pagination metadata for conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_messages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// Compute pagination metadata for a page of `limit` items out of `total`.
    pub fn compute(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(limit as u64) as u32;
        Self {
            current_page: page,
            total_pages,
            total_messages: total,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// The other participant's profile as returned alongside history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPeer {
    pub id: UserId,
    pub username: String,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
}

/// One page of conversation history, oldest message first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub messages: Vec<MessageView>,
    pub pagination: PageInfo,
    pub other_user: ConversationPeer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_view() -> MessageView {
        let msg = Message {
            id: MessageId::new(),
            sender_id: UserId::new(),
            receiver_id: UserId::new(),
            content: "hi".to_string(),
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        };
        let sender = UserSummary {
            id: msg.sender_id,
            username: "ada".to_string(),
        };
        let receiver = UserSummary {
            id: msg.receiver_id,
            username: "bob".to_string(),
        };
        msg.into_view(sender, receiver)
    }

    #[test]
    fn test_message_view_wire_format() {
        let json = serde_json::to_string(&sample_view()).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"isRead\":false"));
        assert!(json.contains("\"sender\":{\"id\""));
    }

    #[test]
    fn test_into_view_preserves_ids() {
        let view = sample_view();
        assert_eq!(view.sender.username, "ada");
        assert_eq!(view.receiver.username, "bob");
        assert_eq!(view.content, "hi");
    }

    #[test]
    fn test_page_info_compute() {
        let info = PageInfo::compute(2, 50, 120);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(info.has_prev_page);

        let first = PageInfo::compute(1, 50, 40);
        assert_eq!(first.total_pages, 1);
        assert!(!first.has_next_page);
        assert!(!first.has_prev_page);
    }

    #[test]
    fn test_page_info_empty_conversation() {
        let info = PageInfo::compute(1, 50, 0);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_prev_page);
    }
}

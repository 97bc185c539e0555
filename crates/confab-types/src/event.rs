//! WebSocket wire protocol: events consumed from and produced for clients.
//!
//! Both enums are tagged with a camelCase `type` field and camelCase payload
//! fields, e.g. `{"type":"sendMessage","receiverId":"...","content":"hi"}`.
//! Unknown or malformed inbound frames are answered with a single
//! `ServerEvent::Error` to the originating connection.

use serde::{Deserialize, Serialize};

use crate::message::MessageView;
use crate::user::{OnlineUser, UserId};

/// Inbound events a connected client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe to the conversation room shared with another user.
    JoinChat { other_user_id: UserId },
    /// Unsubscribe from the conversation room shared with another user.
    LeaveChat { other_user_id: UserId },
    /// Send a direct message through the dispatch pipeline.
    SendMessage { receiver_id: UserId, content: String },
    /// Ephemeral typing indicator, relayed to the room and never persisted.
    Typing { receiver_id: UserId, is_typing: bool },
    /// Mark every unread message from `sender_id` to this user as read.
    MarkAsRead { sender_id: UserId },
    /// Request the current online-users snapshot.
    GetOnlineUsers,
}

/// Outbound events the server pushes to connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Another user came online.
    UserOnline { user_id: UserId, username: String },
    /// Another user went offline.
    UserOffline { user_id: UserId, username: String },
    /// Reply to `getOnlineUsers`; excludes the requester.
    OnlineUsers { users: Vec<OnlineUser> },
    /// A message delivered to a subscribed conversation room.
    NewMessage { message: MessageView },
    /// Out-of-band notification for a receiver not viewing the conversation.
    ///
    /// The category field is `kind` on the wire: the envelope already uses
    /// `type` for the event tag.
    NewNotification {
        kind: NotificationKind,
        from: String,
        message: String,
    },
    /// Typing indicator relayed from a room member.
    UserTyping {
        user_id: UserId,
        username: String,
        is_typing: bool,
    },
    /// The other participant read this user's messages.
    MessagesRead {
        read_by: UserId,
        read_by_username: String,
    },
    /// Structured error reply, sent only to the originating connection.
    Error { message: String },
}

/// Notification categories; only messages today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
}

//! Message dispatch: the validate -> persist -> broadcast pipeline.
//!
//! Ordering is mandatory: a message is broadcast only after the durable
//! write succeeds, so a subscriber can never observe a message that is not
//! in the log. A store failure is returned to the sender alone; nothing is
//! delivered.

use chrono::Utc;
use tracing::{debug, error};

use std::sync::Arc;

use confab_types::error::ChatError;
use confab_types::event::{NotificationKind, ServerEvent};
use confab_types::message::{Message, MessageId, MessageView};
use confab_types::user::{UserId, UserSummary};

use crate::registry::ConnectionRegistry;
use crate::repository::{DirectoryRepository, MessageRepository};
use crate::room::{RoomKey, RoomRouter};

/// Validates, persists and fans out direct messages.
///
/// Generic over the repository traits so the core never depends on
/// confab-infra. Shared by the WebSocket loop and the REST send handler.
pub struct MessageDispatcher<M, D> {
    messages: Arc<M>,
    directory: Arc<D>,
    registry: Arc<ConnectionRegistry<D>>,
    rooms: Arc<RoomRouter>,
}

impl<M, D> MessageDispatcher<M, D>
where
    M: MessageRepository,
    D: DirectoryRepository + 'static,
{
    /// Characters of content included in an out-of-band notification.
    pub const NOTIFICATION_PREVIEW_CHARS: usize = 50;

    pub fn new(
        messages: Arc<M>,
        directory: Arc<D>,
        registry: Arc<ConnectionRegistry<D>>,
        rooms: Arc<RoomRouter>,
    ) -> Self {
        Self {
            messages,
            directory,
            registry,
            rooms,
        }
    }

    /// Send a direct message from `sender` to `receiver_id`.
    ///
    /// Validation order, each with its own rejection: unknown recipient,
    /// self-message, empty/oversized content. On success the persisted,
    /// identity-enriched message goes to every connection subscribed to
    /// the pair's room (the sender's own included -- multi-tab echo), and
    /// a truncated notification goes to the receiver's connection when it
    /// is online but not viewing the conversation.
    pub async fn send(
        &self,
        sender: &UserSummary,
        receiver_id: UserId,
        raw_content: &str,
    ) -> Result<MessageView, ChatError> {
        let receiver = self
            .directory
            .find_user(receiver_id)
            .await?
            .ok_or(ChatError::UnknownRecipient)?;

        if receiver_id == sender.id {
            return Err(ChatError::SelfMessage);
        }

        let content = raw_content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }
        if content.chars().count() > Message::MAX_CONTENT_CHARS {
            return Err(ChatError::ContentTooLong {
                limit: Message::MAX_CONTENT_CHARS,
            });
        }

        let message = Message {
            id: MessageId::new(),
            sender_id: sender.id,
            receiver_id,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        };

        // Persist before any delivery; a failed write aborts the dispatch.
        if let Err(err) = self.messages.save(&message).await {
            error!(sender = %sender.id, receiver = %receiver_id,
                "message persist failed: {err}");
            return Err(ChatError::Persistence(err));
        }

        let view = message.into_view(sender.clone(), receiver.summary());
        let room = RoomKey::for_pair(sender.id, receiver_id);

        let mut receiver_in_room = false;
        for member in self.rooms.members(&room) {
            let Some(connection) = self.registry.lookup_connection(member) else {
                continue;
            };
            if connection.user_id() == receiver_id {
                receiver_in_room = true;
            }
            connection.send(ServerEvent::NewMessage {
                message: view.clone(),
            });
        }

        if !receiver_in_room {
            if let Some(connection) = self.registry.lookup(receiver_id) {
                connection.send(ServerEvent::NewNotification {
                    kind: NotificationKind::Message,
                    from: sender.username.clone(),
                    message: preview(content, Self::NOTIFICATION_PREVIEW_CHARS),
                });
            }
        }

        debug!(message_id = %view.id, room = %room, "message dispatched");
        Ok(view)
    }
}

/// Truncate notification content, marking the cut with an ellipsis.
fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        content.to_string()
    }
}

//! Ephemeral signal relay: typing indicators and read receipts.
//!
//! Typing indicators are never persisted and carry no validation beyond id
//! format; an unknown receiver simply relays into an empty room. Read
//! receipts do touch the store (one atomic batch UPDATE) and then notify
//! the counterpart's live connection, if any.

use chrono::Utc;
use tracing::debug;

use std::sync::Arc;

use confab_types::error::ChatError;
use confab_types::event::ServerEvent;
use confab_types::user::UserId;

use crate::connection::ConnectionHandle;
use crate::registry::ConnectionRegistry;
use crate::repository::{DirectoryRepository, MessageRepository};
use crate::room::{RoomKey, RoomRouter};

/// Relays typing and read-receipt events within a conversation room.
pub struct Relay<M, D> {
    messages: Arc<M>,
    registry: Arc<ConnectionRegistry<D>>,
    rooms: Arc<RoomRouter>,
}

impl<M, D> Relay<M, D>
where
    M: MessageRepository,
    D: DirectoryRepository + 'static,
{
    pub fn new(
        messages: Arc<M>,
        registry: Arc<ConnectionRegistry<D>>,
        rooms: Arc<RoomRouter>,
    ) -> Self {
        Self {
            messages,
            registry,
            rooms,
        }
    }

    /// Relay a typing indicator to the room shared with `receiver_id`,
    /// excluding the sender's own connection. Fire-and-forget.
    pub fn typing(&self, sender: &ConnectionHandle, receiver_id: UserId, is_typing: bool) {
        let room = RoomKey::for_pair(sender.user_id(), receiver_id);
        for member in self.rooms.members(&room) {
            if member == sender.id() {
                continue;
            }
            if let Some(connection) = self.registry.lookup_connection(member) {
                connection.send(ServerEvent::UserTyping {
                    user_id: sender.user_id(),
                    username: sender.username().to_string(),
                    is_typing,
                });
            }
        }
    }

    /// Mark every unread message from `other_user_id` to the reader as
    /// read, then tell the counterpart their messages were read.
    ///
    /// The store update is a single batch statement; the receipt is only
    /// relayed after it succeeds, and only when the counterpart is online.
    pub async fn mark_read(
        &self,
        reader: &ConnectionHandle,
        other_user_id: UserId,
    ) -> Result<u64, ChatError> {
        let changed = self
            .messages
            .mark_conversation_read(other_user_id, reader.user_id(), Utc::now())
            .await?;

        if let Some(connection) = self.registry.lookup(other_user_id) {
            connection.send(ServerEvent::MessagesRead {
                read_by: reader.user_id(),
                read_by_username: reader.username().to_string(),
            });
        }

        debug!(reader = %reader.user_id(), other = %other_user_id, changed,
            "conversation marked read");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryDirectory, MemoryMessages};
    use confab_types::message::{Message, MessageId};
    use confab_types::user::UserProfile;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        relay: Relay<MemoryMessages, MemoryDirectory>,
        messages: Arc<MemoryMessages>,
        registry: Arc<ConnectionRegistry<MemoryDirectory>>,
        rooms: Arc<RoomRouter>,
        ada: UserProfile,
        bob: UserProfile,
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            username: name.to_string(),
            is_online: false,
            last_active: Utc::now(),
        }
    }

    fn fixture() -> Fixture {
        let ada = profile("ada");
        let bob = profile("bob");
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(ada.clone());
        directory.insert(bob.clone());

        let messages = Arc::new(MemoryMessages::new());
        let registry = Arc::new(ConnectionRegistry::new(directory));
        let rooms = Arc::new(RoomRouter::new());
        let relay = Relay::new(
            Arc::clone(&messages),
            Arc::clone(&registry),
            Arc::clone(&rooms),
        );

        Fixture {
            relay,
            messages,
            registry,
            rooms,
            ada,
            bob,
        }
    }

    fn connect(fx: &Fixture, user: &UserProfile) -> (ConnectionHandle, UnboundedReceiver<ServerEvent>) {
        let (handle, rx) = ConnectionHandle::new(user.summary());
        fx.registry.register(handle.clone());
        (handle, rx)
    }

    fn stored_message(from: &UserProfile, to: &UserProfile) -> Message {
        Message {
            id: MessageId::new(),
            sender_id: from.id,
            receiver_id: to.id,
            content: "hello".to_string(),
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        }
    }

    #[tokio::test]
    async fn typing_reaches_room_members_except_sender() {
        let fx = fixture();
        let (conn_a, mut rx_a) = connect(&fx, &fx.ada);
        let (conn_b, mut rx_b) = connect(&fx, &fx.bob);

        let room = RoomKey::for_pair(fx.ada.id, fx.bob.id);
        fx.rooms.join(conn_a.id(), room.clone());
        fx.rooms.join(conn_b.id(), room);

        fx.relay.typing(&conn_a, fx.bob.id, true);

        match rx_b.try_recv().unwrap() {
            ServerEvent::UserTyping {
                username,
                is_typing,
                ..
            } => {
                assert_eq!(username, "ada");
                assert!(is_typing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx_a.try_recv().is_err(), "sender must not see own typing");
    }

    #[tokio::test]
    async fn typing_to_unknown_receiver_is_silently_ignored() {
        let fx = fixture();
        let (conn_a, mut rx_a) = connect(&fx, &fx.ada);

        fx.relay.typing(&conn_a, UserId::new(), true);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn mark_read_flips_only_messages_from_the_other_user() {
        let fx = fixture();
        let (conn_b, _rx_b) = connect(&fx, &fx.bob);

        fx.messages.save(&stored_message(&fx.ada, &fx.bob)).await.unwrap();
        fx.messages.save(&stored_message(&fx.ada, &fx.bob)).await.unwrap();
        fx.messages.save(&stored_message(&fx.bob, &fx.ada)).await.unwrap();

        let changed = fx.relay.mark_read(&conn_b, fx.ada.id).await.unwrap();
        assert_eq!(changed, 2);

        for message in fx.messages.all() {
            if message.receiver_id == fx.bob.id {
                assert!(message.is_read);
                assert!(message.read_at.is_some());
            } else {
                // Bob's own outgoing message is untouched.
                assert!(!message.is_read);
            }
        }
    }

    #[tokio::test]
    async fn mark_read_notifies_the_online_counterpart() {
        let fx = fixture();
        let (_conn_a, mut rx_a) = connect(&fx, &fx.ada);
        let (conn_b, _rx_b) = connect(&fx, &fx.bob);

        fx.messages.save(&stored_message(&fx.ada, &fx.bob)).await.unwrap();
        fx.relay.mark_read(&conn_b, fx.ada.id).await.unwrap();

        match rx_a.try_recv().unwrap() {
            ServerEvent::MessagesRead {
                read_by,
                read_by_username,
            } => {
                assert_eq!(read_by, fx.bob.id);
                assert_eq!(read_by_username, "bob");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mark_read_with_offline_counterpart_still_updates_store() {
        let fx = fixture();
        let (conn_b, _rx_b) = connect(&fx, &fx.bob);

        fx.messages.save(&stored_message(&fx.ada, &fx.bob)).await.unwrap();
        let changed = fx.relay.mark_read(&conn_b, fx.ada.id).await.unwrap();
        assert_eq!(changed, 1);
        assert!(fx.messages.all()[0].is_read);
    }

    #[tokio::test]
    async fn mark_read_store_failure_relays_nothing() {
        let fx = fixture();
        let (_conn_a, mut rx_a) = connect(&fx, &fx.ada);
        let (conn_b, _rx_b) = connect(&fx, &fx.bob);

        fx.messages.save(&stored_message(&fx.ada, &fx.bob)).await.unwrap();
        fx.messages.fail_writes();

        let err = fx.relay.mark_read(&conn_b, fx.ada.id).await.unwrap_err();
        assert!(matches!(err, ChatError::Persistence(_)));
        assert!(rx_a.try_recv().is_err());
    }
}

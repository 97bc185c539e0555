//! Conversation service: the synchronous request/response boundary.
//!
//! Everything the HTTP layer asks of the message log that is not live
//! dispatch: paginated history, read-state updates, unread counts, and the
//! bulk conversation clear. All authorization decisions (who may read whose
//! flags) are made here, not in the handlers.

use chrono::Utc;
use tracing::info;

use std::sync::Arc;

use confab_types::error::ChatError;
use confab_types::message::{ConversationPage, ConversationPeer, MessageId, PageInfo};
use confab_types::user::{UserId, UserSummary};

use crate::repository::{DirectoryRepository, MessageRepository};

/// Default and maximum history page sizes, matching the wire contract.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Read-side operations over the durable message log.
pub struct ConversationService<M, D> {
    messages: Arc<M>,
    directory: Arc<D>,
}

impl<M, D> ConversationService<M, D>
where
    M: MessageRepository,
    D: DirectoryRepository,
{
    pub fn new(messages: Arc<M>, directory: Arc<D>) -> Self {
        Self {
            messages,
            directory,
        }
    }

    /// One page of the conversation between `me` and `other_id`.
    ///
    /// Fetched newest-first from the store, reversed to oldest-first for
    /// display. `page` is 1-based; `limit` is clamped to [1, 100].
    pub async fn history(
        &self,
        me: &UserSummary,
        other_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<ConversationPage, ChatError> {
        let other = self
            .directory
            .find_user(other_id)
            .await?
            .ok_or(ChatError::UnknownRecipient)?;

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let mut records = self
            .messages
            .conversation(me.id, other_id, limit, offset)
            .await?;
        records.reverse();

        let total = self.messages.count_conversation(me.id, other_id).await?;

        let other_summary = other.summary();
        let messages = records
            .into_iter()
            .map(|record| {
                let (sender, receiver) = if record.sender_id == me.id {
                    (me.clone(), other_summary.clone())
                } else {
                    (other_summary.clone(), me.clone())
                };
                record.into_view(sender, receiver)
            })
            .collect();

        Ok(ConversationPage {
            messages,
            pagination: PageInfo::compute(page, limit, total),
            other_user: ConversationPeer {
                id: other.id,
                username: other.username,
                is_online: other.is_online,
                last_active: other.last_active,
            },
        })
    }

    /// Mark a single message read. Only its receiver may do so.
    pub async fn mark_message_read(
        &self,
        me: UserId,
        message_id: MessageId,
    ) -> Result<(), ChatError> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(ChatError::MessageNotFound)?;

        if message.receiver_id != me {
            return Err(ChatError::NotAuthorized);
        }

        if !message.is_read {
            self.messages.mark_read(message_id, Utc::now()).await?;
        }
        Ok(())
    }

    /// Mark every unread message from `other_id` to `me` as read.
    /// Returns the number of messages changed.
    pub async fn mark_conversation_read(
        &self,
        me: UserId,
        other_id: UserId,
    ) -> Result<u64, ChatError> {
        Ok(self
            .messages
            .mark_conversation_read(other_id, me, Utc::now())
            .await?)
    }

    /// Unread messages addressed to `me`, across all senders.
    pub async fn unread_count(&self, me: UserId) -> Result<u64, ChatError> {
        Ok(self.messages.unread_count(me).await?)
    }

    /// Delete the full history between `me` and `other_id`, both
    /// directions. Returns the number of messages deleted.
    pub async fn clear_history(&self, me: UserId, other_id: UserId) -> Result<u64, ChatError> {
        let deleted = self.messages.clear_conversation(me, other_id).await?;
        info!(user = %me, other = %other_id, deleted, "conversation history cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryDirectory, MemoryMessages};
    use confab_types::message::Message;
    use confab_types::user::UserProfile;

    struct Fixture {
        service: ConversationService<MemoryMessages, MemoryDirectory>,
        messages: Arc<MemoryMessages>,
        ada: UserProfile,
        bob: UserProfile,
        eve: UserProfile,
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
        let eve = profile("eve");
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(ada.clone());
        directory.insert(bob.clone());
        directory.insert(eve.clone());

        let messages = Arc::new(MemoryMessages::new());
        let service = ConversationService::new(Arc::clone(&messages), directory);

        Fixture {
            service,
            messages,
            ada,
            bob,
            eve,
        }
    }

    fn message(from: &UserProfile, to: &UserProfile, content: &str) -> Message {
        Message {
            id: MessageId::new(),
            sender_id: from.id,
            receiver_id: to.id,
            content: content.to_string(),
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        }
    }

    #[tokio::test]
    async fn history_returns_oldest_first_with_pagination() {
        let fx = fixture();
        for i in 0..5 {
            fx.messages
                .save(&message(&fx.ada, &fx.bob, &format!("m{i}")))
                .await
                .unwrap();
        }

        let page = fx
            .service
            .history(&fx.ada.summary(), fx.bob.id, 1, 3)
            .await
            .unwrap();

        // Newest 3 of 5, oldest of those first.
        assert_eq!(page.messages.len(), 3);
        assert_eq!(page.messages[0].content, "m2");
        assert_eq!(page.messages[2].content, "m4");
        assert_eq!(page.pagination.total_messages, 5);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_next_page);
        assert!(!page.pagination.has_prev_page);
        assert_eq!(page.other_user.username, "bob");
    }

    #[tokio::test]
    async fn history_enriches_both_directions() {
        let fx = fixture();
        fx.messages.save(&message(&fx.ada, &fx.bob, "hi")).await.unwrap();
        fx.messages.save(&message(&fx.bob, &fx.ada, "hey")).await.unwrap();

        let page = fx
            .service
            .history(&fx.ada.summary(), fx.bob.id, 1, 50)
            .await
            .unwrap();

        assert_eq!(page.messages[0].sender.username, "ada");
        assert_eq!(page.messages[0].receiver.username, "bob");
        assert_eq!(page.messages[1].sender.username, "bob");
        assert_eq!(page.messages[1].receiver.username, "ada");
    }

    #[tokio::test]
    async fn history_with_unknown_peer_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .history(&fx.ada.summary(), UserId::new(), 1, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::UnknownRecipient));
    }

    #[tokio::test]
    async fn history_excludes_third_parties() {
        let fx = fixture();
        fx.messages.save(&message(&fx.ada, &fx.bob, "to bob")).await.unwrap();
        fx.messages.save(&message(&fx.ada, &fx.eve, "to eve")).await.unwrap();

        let page = fx
            .service
            .history(&fx.ada.summary(), fx.bob.id, 1, 50)
            .await
            .unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "to bob");
    }

    #[tokio::test]
    async fn only_the_receiver_may_mark_a_message_read() {
        let fx = fixture();
        let msg = message(&fx.ada, &fx.bob, "hi");
        fx.messages.save(&msg).await.unwrap();

        // The sender cannot flip their own message.
        let err = fx
            .service
            .mark_message_read(fx.ada.id, msg.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAuthorized));

        // A third party cannot either.
        let err = fx
            .service
            .mark_message_read(fx.eve.id, msg.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAuthorized));

        fx.service.mark_message_read(fx.bob.id, msg.id).await.unwrap();
        assert!(fx.messages.all()[0].is_read);
    }

    #[tokio::test]
    async fn marking_an_already_read_message_is_a_noop() {
        let fx = fixture();
        let msg = message(&fx.ada, &fx.bob, "hi");
        fx.messages.save(&msg).await.unwrap();

        fx.service.mark_message_read(fx.bob.id, msg.id).await.unwrap();
        let first_read_at = fx.messages.all()[0].read_at;

        fx.service.mark_message_read(fx.bob.id, msg.id).await.unwrap();
        assert_eq!(fx.messages.all()[0].read_at, first_read_at);
    }

    #[tokio::test]
    async fn unknown_message_id_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .mark_message_read(fx.bob.id, MessageId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound));
    }

    #[tokio::test]
    async fn unread_count_only_counts_my_unread() {
        let fx = fixture();
        fx.messages.save(&message(&fx.ada, &fx.bob, "1")).await.unwrap();
        fx.messages.save(&message(&fx.eve, &fx.bob, "2")).await.unwrap();
        fx.messages.save(&message(&fx.bob, &fx.ada, "3")).await.unwrap();

        assert_eq!(fx.service.unread_count(fx.bob.id).await.unwrap(), 2);

        fx.service.mark_conversation_read(fx.bob.id, fx.ada.id).await.unwrap();
        assert_eq!(fx.service.unread_count(fx.bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_deletes_exactly_the_pair() {
        let fx = fixture();
        fx.messages.save(&message(&fx.ada, &fx.bob, "a->b")).await.unwrap();
        fx.messages.save(&message(&fx.bob, &fx.ada, "b->a")).await.unwrap();
        fx.messages.save(&message(&fx.ada, &fx.eve, "a->c")).await.unwrap();
        fx.messages.save(&message(&fx.eve, &fx.bob, "c->b")).await.unwrap();

        let deleted = fx.service.clear_history(fx.ada.id, fx.bob.id).await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = fx.messages.all();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|m| {
            m.sender_id == fx.eve.id || m.receiver_id == fx.eve.id
        }));
    }
}
